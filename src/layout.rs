use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;

use crate::formats::{ChapterRef, SeriesInfo};
use crate::slug::slugify;

pub const SNAPSHOT_FILE_NAME: &str = "info.json";

/// Deterministic on-disk placement for series, chapters and pages.
///
/// ```text
/// <root>/<series-slug>/info.json
/// <root>/<series-slug>/<chapter-slug>/000.<ext>
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub async fn series_dir(&self, series_name: &str) -> anyhow::Result<PathBuf> {
        let dir = self.root.join(slugify(series_name));
        ensure_dir(&dir).await?;
        Ok(dir)
    }

    /// Writes the raw series payload unless a snapshot is already present.
    ///
    /// Returns `true` when the file was written by this call.
    pub async fn persist_series_snapshot(
        &self,
        series_dir: &Path,
        info: &SeriesInfo,
    ) -> anyhow::Result<bool> {
        let path = series_dir.join(SNAPSHOT_FILE_NAME);
        if fs::try_exists(&path)
            .await
            .with_context(|| format!("stat snapshot: {}", path.display()))?
        {
            warn_on_foreign_snapshot(&path, info).await;
            return Ok(false);
        }

        let data = serde_json::to_vec(&info.payload).context("serialize series snapshot")?;
        write_atomic(&path, &data).await?;
        Ok(true)
    }

    /// Creates the chapter directory for a segment from [`chapter_segments`].
    ///
    /// The segment is used as is; sanitizing it again could merge two
    /// disambiguated chapters into one directory.
    pub async fn chapter_dir(&self, series_dir: &Path, segment: &str) -> anyhow::Result<PathBuf> {
        let dir = series_dir.join(segment);
        ensure_dir(&dir).await?;
        Ok(dir)
    }

    pub fn page_artifact_path(&self, chapter_dir: &Path, index: usize, extension: &str) -> PathBuf {
        chapter_dir.join(format!("{}.{extension}", page_stem(index)))
    }

    /// Transient file for the decoded image; never the same path as the final artifact.
    pub fn intermediate_path(
        &self,
        chapter_dir: &Path,
        index: usize,
        extension: &str,
        final_extension: &str,
    ) -> PathBuf {
        if extension == final_extension {
            return chapter_dir.join(format!("{}.intermediate.{extension}", page_stem(index)));
        }
        chapter_dir.join(format!("{}.{extension}", page_stem(index)))
    }
}

/// Zero padded page stem (`000`, `001`, ...).
pub fn page_stem(index: usize) -> String {
    format!("{index:03}")
}

/// Directory segment for every chapter of a series, in series order.
///
/// Names that sanitize to the same slug as an earlier chapter get the
/// chapter id appended, so the result only depends on the full chapter list.
pub fn chapter_segments(chapters: &[ChapterRef]) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut segments = Vec::with_capacity(chapters.len());

    for (position, chapter) in chapters.iter().enumerate() {
        let base = slugify(&chapter.name);
        let mut segment = base.clone();
        if taken.contains(&segment) {
            segment = format!("{base}-{}", slugify(&chapter.id));
            tracing::warn!(
                chapter_id = %chapter.id,
                chapter = %chapter.name,
                dir = %segment,
                "chapter name collides with an earlier chapter; using disambiguated dir"
            );
        }
        if taken.contains(&segment) {
            segment = format!("{base}-{position}");
        }
        taken.insert(segment.clone());
        segments.push(segment);
    }

    segments
}

pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

pub async fn is_non_empty(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Whether a page artifact counts as downloaded: present with nonzero size.
pub async fn is_downloaded(path: &Path) -> bool {
    exists(path).await && is_non_empty(path).await
}

async fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create dir: {}", dir.display()))
}

/// Writes `data` next to `path` under a unique name, then renames it into place.
pub async fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp_path, data)
        .await
        .with_context(|| format!("write tmp: {}", tmp_path.display()))?;
    if let Err(err) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(err).with_context(|| format!("rename tmp to final: {}", path.display()));
    }
    Ok(())
}

async fn warn_on_foreign_snapshot(path: &Path, info: &SeriesInfo) {
    let Ok(bytes) = fs::read(path).await else {
        return;
    };
    let Ok(existing) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return;
    };
    let existing_id = existing.get("oid").and_then(|v| v.as_str());
    if existing_id.is_some_and(|id| id != info.id) {
        tracing::warn!(
            snapshot = %path.display(),
            existing = existing_id.unwrap_or_default(),
            series_id = %info.id,
            "series dir already holds a snapshot of a different series"
        );
    }
}
