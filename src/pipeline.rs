use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::catalog::CatalogClient;
use crate::codec::{CodecError, Decoder, MriDecoder, PngTranscoder, Transcoder};
use crate::config::{CatalogConfig, PipelineConfig};
use crate::fetch::{FetchError, PageFetcher};
use crate::formats::{ChapterRef, SeriesInfo};
use crate::layout::{self, OutputLayout};
use crate::pacing::{NoPacing, Pacer, RandomPacer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterStatus {
    Complete,
    CompleteWithFailures,
}

#[derive(Debug, Clone)]
pub struct PageFailure {
    pub index: usize,
    pub uri: String,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct ChapterReport {
    pub chapter: ChapterRef,
    pub dir: PathBuf,
    pub total_pages: usize,
    pub written: Vec<usize>,
    pub skipped: Vec<usize>,
    pub failed: Vec<PageFailure>,
}

impl ChapterReport {
    fn new(chapter: ChapterRef, dir: PathBuf, total_pages: usize) -> Self {
        Self {
            chapter,
            dir,
            total_pages,
            written: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn status(&self) -> ChapterStatus {
        if self.failed.is_empty() {
            ChapterStatus::Complete
        } else {
            ChapterStatus::CompleteWithFailures
        }
    }

    /// Pages that ended up with an artifact on disk, written now or earlier.
    pub fn processed(&self) -> usize {
        self.written.len() + self.skipped.len()
    }

    pub fn failed_indices(&self) -> Vec<usize> {
        self.failed.iter().map(|failure| failure.index).collect()
    }
}

#[derive(Debug, Clone)]
pub enum ChapterOutcome {
    Processed(ChapterReport),
    PageListFailed {
        chapter: ChapterRef,
        dir: PathBuf,
        error: String,
    },
}

impl ChapterOutcome {
    pub fn chapter(&self) -> &ChapterRef {
        match self {
            ChapterOutcome::Processed(report) => &report.chapter,
            ChapterOutcome::PageListFailed { chapter, .. } => chapter,
        }
    }

    pub fn is_failure(&self) -> bool {
        match self {
            ChapterOutcome::Processed(report) => {
                report.status() == ChapterStatus::CompleteWithFailures
            }
            ChapterOutcome::PageListFailed { .. } => true,
        }
    }

    pub fn summary_line(&self) -> String {
        let marker = if self.is_failure() { " [fail]" } else { "" };
        match self {
            ChapterOutcome::Processed(report) => format!(
                "{} downloaded ({}/{} pages){marker}",
                report.chapter.name,
                report.processed(),
                report.total_pages
            ),
            ChapterOutcome::PageListFailed { chapter, .. } => {
                format!("{} page list unavailable{marker}", chapter.name)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SeriesReport {
    pub series_id: String,
    pub series_name: String,
    pub series_dir: PathBuf,
    pub snapshot_written: bool,
    pub chapters: Vec<ChapterOutcome>,
    pub cancelled: bool,
}

impl SeriesReport {
    pub fn has_failures(&self) -> bool {
        self.chapters.iter().any(ChapterOutcome::is_failure)
    }
}

enum PageOutcome {
    Skipped,
    Written,
    Failed(PageFailure),
    Cancelled,
}

/// A chapter picked for processing together with its directory segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedChapter {
    pub chapter: ChapterRef,
    pub dir_segment: String,
}

/// Chapters of `info` to process, in series order.
///
/// An empty selection means every chapter. Blank ids (`-c ""`) are ignored.
pub fn select_chapters(info: &SeriesInfo, selection: &[String]) -> Vec<SelectedChapter> {
    let segments = layout::chapter_segments(&info.chapters);
    let wanted: HashSet<&str> = selection
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .collect();

    let known: HashSet<&str> = info.chapters.iter().map(|c| c.id.as_str()).collect();
    for id in &wanted {
        if !known.contains(id) {
            tracing::warn!(chapter_id = %id, series_id = %info.id, "selected chapter not in series");
        }
    }

    info.chapters
        .iter()
        .zip(segments)
        .filter(|(chapter, _)| wanted.is_empty() || wanted.contains(chapter.id.as_str()))
        .map(|(chapter, dir_segment)| SelectedChapter {
            chapter: chapter.clone(),
            dir_segment,
        })
        .collect()
}

pub struct Pipeline {
    catalog: CatalogClient,
    fetcher: PageFetcher,
    layout: OutputLayout,
    decoder: Arc<dyn Decoder>,
    transcoder: Arc<dyn Transcoder>,
    pacer: Arc<dyn Pacer>,
}

impl Pipeline {
    pub fn new(catalog: CatalogClient, fetcher: PageFetcher, layout: OutputLayout) -> Self {
        Self {
            catalog,
            fetcher,
            layout,
            decoder: Arc::new(MriDecoder),
            transcoder: Arc::new(PngTranscoder),
            pacer: Arc::new(NoPacing),
        }
    }

    pub fn from_config(
        client: reqwest::Client,
        catalog_config: &CatalogConfig,
        config: &PipelineConfig,
    ) -> Self {
        let catalog = CatalogClient::new(client.clone(), catalog_config);
        let fetcher = PageFetcher::new(client, config.max_attempts);
        let layout = OutputLayout::new(&config.out_dir);
        Self::new(catalog, fetcher, layout)
            .with_pacer(Arc::new(RandomPacer::new(config.pace_choices.clone())))
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn Decoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_transcoder(mut self, transcoder: Arc<dyn Transcoder>) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Downloads the selected chapters of one series.
    ///
    /// Fails only when the series itself cannot be resolved or the filesystem
    /// refuses a write; page and page-list failures land in the report.
    pub async fn run(
        &self,
        series_id: &str,
        selection: &[String],
        cancel: &CancellationToken,
    ) -> anyhow::Result<SeriesReport> {
        let info = tokio::select! {
            biased;
            () = cancel.cancelled() => anyhow::bail!("cancelled before series info was fetched"),
            info = self.catalog.fetch_series_info(series_id) => {
                info.with_context(|| format!("fetch series info: {series_id}"))?
            }
        };
        tracing::info!(series_id, series = %info.name, chapters = info.chapters.len(), "resolved series");

        let series_dir = self
            .layout
            .series_dir(&info.name)
            .await
            .context("create series dir")?;
        let snapshot_written = self
            .layout
            .persist_series_snapshot(&series_dir, &info)
            .await
            .context("persist series snapshot")?;

        let selected = select_chapters(&info, selection);
        tracing::info!(selected = selected.len(), dir = %series_dir.display(), "chapters selected");

        let mut report = SeriesReport {
            series_id: info.id.clone(),
            series_name: info.name.clone(),
            series_dir: series_dir.clone(),
            snapshot_written,
            chapters: Vec::with_capacity(selected.len()),
            cancelled: false,
        };

        for selected_chapter in selected {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let (outcome, cancelled) = self
                .process_chapter(&series_dir, &selected_chapter, cancel)
                .await
                .with_context(|| format!("process chapter: {}", selected_chapter.chapter.id))?;
            report.chapters.extend(outcome);
            if cancelled {
                report.cancelled = true;
                break;
            }
        }

        if report.cancelled {
            tracing::warn!(series_id, "run cancelled");
        }
        Ok(report)
    }

    /// Returns no outcome when cancelled before the page list arrived.
    async fn process_chapter(
        &self,
        series_dir: &Path,
        selected: &SelectedChapter,
        cancel: &CancellationToken,
    ) -> anyhow::Result<(Option<ChapterOutcome>, bool)> {
        let chapter = &selected.chapter;
        let chapter_dir = self
            .layout
            .chapter_dir(series_dir, &selected.dir_segment)
            .await
            .context("create chapter dir")?;

        let page_list = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            pages = self.catalog.fetch_page_list(&chapter.id) => Some(pages),
        };
        let page_list = match page_list {
            None => {
                tracing::info!(chapter_id = %chapter.id, "cancelled before page list");
                return Ok((None, true));
            }
            Some(Ok(page_list)) => page_list,
            Some(Err(err)) => {
                tracing::error!(chapter_id = %chapter.id, error = %err, "fetch page list failed");
                return Ok((
                    Some(ChapterOutcome::PageListFailed {
                        chapter: chapter.clone(),
                        dir: chapter_dir,
                        error: err.to_string(),
                    }),
                    false,
                ));
            }
        };

        tracing::info!(
            chapter_id = %chapter.id,
            chapter = %chapter.name,
            pages = page_list.len(),
            "processing chapter"
        );

        let mut report = ChapterReport::new(chapter.clone(), chapter_dir.clone(), page_list.len());
        let mut cancelled = false;

        for (index, uri) in page_list.pages.iter().enumerate() {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.process_page(&chapter_dir, index, uri, cancel).await? {
                PageOutcome::Skipped => report.skipped.push(index),
                PageOutcome::Written => {
                    report.written.push(index);
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = self.pacer.pace(index) => {}
                    }
                }
                PageOutcome::Failed(failure) => report.failed.push(failure),
                PageOutcome::Cancelled => {
                    cancelled = true;
                    break;
                }
            }
        }

        tracing::info!(
            chapter_id = %chapter.id,
            written = report.written.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "chapter finished"
        );
        Ok((Some(ChapterOutcome::Processed(report)), cancelled))
    }

    async fn process_page(
        &self,
        chapter_dir: &Path,
        index: usize,
        uri: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<PageOutcome> {
        let final_path = self
            .layout
            .page_artifact_path(chapter_dir, index, self.transcoder.extension());
        let file_name = display_name(&final_path);

        if layout::is_downloaded(&final_path).await {
            tracing::info!("skipping {file_name}");
            return Ok(PageOutcome::Skipped);
        }

        let failure = |error: String| -> anyhow::Result<PageOutcome> {
            tracing::warn!(page = index, %uri, %error, "page failed");
            Ok(PageOutcome::Failed(PageFailure {
                index,
                uri: uri.to_owned(),
                error,
            }))
        };

        let blob = match self.fetcher.fetch(uri, cancel).await {
            Ok(blob) => blob,
            Err(FetchError::Cancelled) => return Ok(PageOutcome::Cancelled),
            Err(err) => return failure(err.to_string()),
        };

        let decoded = match self.decoder.decode(&blob) {
            Ok(decoded) => decoded,
            Err(err) => return failure(err.to_string()),
        };

        let intermediate_path = self.layout.intermediate_path(
            chapter_dir,
            index,
            self.decoder.extension(),
            self.transcoder.extension(),
        );

        let converted = self
            .transcode_via_intermediate(&intermediate_path, &final_path, &decoded)
            .await;
        if let Err(err) = fs::remove_file(&intermediate_path).await
            && err.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %intermediate_path.display(), error = %err, "remove intermediate failed");
        }

        match converted? {
            Ok(()) => {
                tracing::info!("{file_name} written");
                Ok(PageOutcome::Written)
            }
            Err(err) => failure(err.to_string()),
        }
    }

    /// Persists the decoded image, converts it from disk, and writes the final artifact.
    ///
    /// The outer error is a filesystem failure; the inner one a rejected image.
    async fn transcode_via_intermediate(
        &self,
        intermediate_path: &Path,
        final_path: &Path,
        decoded: &[u8],
    ) -> anyhow::Result<Result<(), CodecError>> {
        fs::write(intermediate_path, decoded)
            .await
            .with_context(|| format!("write intermediate: {}", intermediate_path.display()))?;
        let encoded = fs::read(intermediate_path)
            .await
            .with_context(|| format!("read intermediate: {}", intermediate_path.display()))?;

        let converted = match self.transcoder.convert(&encoded) {
            Ok(converted) => converted,
            Err(err) => return Ok(Err(err)),
        };
        layout::write_atomic(final_path, &converted).await?;
        Ok(Ok(()))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
