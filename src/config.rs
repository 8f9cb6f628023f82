use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use url::Url;

use crate::cli::Cli;

pub const DEFAULT_API_BASE: &str = "https://api.mangarockhd.com";
pub const DEFAULT_API_VERSION: u32 = 401;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: Url,
    pub api_version: u32,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE).expect("default api base is a valid url"),
            api_version: DEFAULT_API_VERSION,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root under which series directories are created.
    pub out_dir: PathBuf,
    /// Total download attempts per page, including the first one.
    pub max_attempts: u32,
    /// Pause lengths the pacer picks from after each written page.
    pub pace_choices: Vec<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("."),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            pace_choices: default_pace_choices(),
        }
    }
}

pub fn default_pace_choices() -> Vec<Duration> {
    (1..=5).map(|n| Duration::from_millis(n * 100)).collect()
}

fn default_user_agent() -> String {
    format!("mangarock-dl/{}", env!("CARGO_PKG_VERSION"))
}

impl CatalogConfig {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        let base_url = Url::parse(&cli.api_base).context("parse --api-base")?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            anyhow::bail!("--api-base must be http/https: {base_url}");
        }
        if cli.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }

        Ok(Self {
            base_url,
            api_version: cli.api_version,
            timeout: Duration::from_secs(cli.timeout_secs),
            user_agent: default_user_agent(),
        })
    }
}

impl PipelineConfig {
    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        if cli.attempts == 0 {
            anyhow::bail!("--attempts must be at least 1");
        }

        // A lone zero disables pacing entirely.
        let pace_choices = cli
            .delay_choices_ms
            .iter()
            .copied()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .collect();

        Ok(Self {
            out_dir: PathBuf::from(&cli.out),
            max_attempts: cli.attempts,
            pace_choices,
        })
    }
}

pub fn build_http_client(config: &CatalogConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .context("build http client")
}
