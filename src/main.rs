use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;
use tokio_util::sync::CancellationToken;

use mangarock_dl::config::{CatalogConfig, PipelineConfig};
use mangarock_dl::pipeline::Pipeline;

#[tokio::main]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `false` when the run was cancelled before finishing.
async fn try_main() -> anyhow::Result<bool> {
    let cli = mangarock_dl::cli::Cli::parse();
    mangarock_dl::logging::init(cli.verbose).context("init logging")?;
    tracing::debug!(?cli, "parsed cli");

    let catalog_config = CatalogConfig::from_cli(&cli).context("catalog config")?;
    let pipeline_config = PipelineConfig::from_cli(&cli).context("pipeline config")?;
    let client = mangarock_dl::config::build_http_client(&catalog_config)?;
    let pipeline = Pipeline::from_config(client, &catalog_config, &pipeline_config);

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; stopping after the current step");
            ctrl_c_cancel.cancel();
        }
    });

    let report = pipeline
        .run(&cli.series, &cli.chapters, &cancel)
        .await
        .context("download series")?;

    for chapter in &report.chapters {
        println!("{}", chapter.summary_line());
    }

    if report.cancelled {
        eprintln!("cancelled");
        return Ok(false);
    }
    Ok(true)
}
