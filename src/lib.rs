#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod fetch;
pub mod formats;
pub mod layout;
pub mod logging;
pub mod pacing;
pub mod pipeline;
pub mod retry;
pub mod slug;
