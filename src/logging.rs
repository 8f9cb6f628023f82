use anyhow::Context as _;

/// Filter used when `RUST_LOG` is unset; HTTP internals stay quiet.
pub fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "debug,hyper_util=info,rustls=info"
    } else {
        "info,hyper_util=warn,rustls=warn"
    }
}

/// Installs the stderr subscriber. `RUST_LOG` wins over `--verbose`.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let filter = match tracing_subscriber::EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => tracing_subscriber::EnvFilter::try_new(default_directives(verbose))
            .context("build log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}
