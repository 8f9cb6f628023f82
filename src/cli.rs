use clap::Parser;

use crate::config::{DEFAULT_API_BASE, DEFAULT_API_VERSION, DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Series identifier (e.g. `mrs-serie-100177863`).
    pub series: String,

    /// Comma separated chapter identifiers to restrict processing to.
    #[arg(short, long, value_delimiter = ',')]
    pub chapters: Vec<String>,

    /// Output root; the series directory is created inside it.
    #[arg(long, default_value = ".")]
    pub out: String,

    /// Base URL of the content API.
    #[arg(long, default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Query protocol version embedded in every catalog request.
    #[arg(long, default_value_t = DEFAULT_API_VERSION)]
    pub api_version: u32,

    /// Download attempts per page before it is marked failed.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub attempts: u32,

    /// Timeout for each HTTP request.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Pause lengths picked at random after each written page (`0` disables).
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "100,200,300,400,500"
    )]
    pub delay_choices_ms: Vec<u64>,

    /// Debug logging (ignored when `RUST_LOG` is set).
    #[arg(short, long)]
    pub verbose: bool,
}
