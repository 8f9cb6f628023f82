use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom as _;

/// Pause inserted after each written page to stay polite with the CDN.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self, after_page: usize);
}

/// Sleeps for a duration picked uniformly from a fixed set.
#[derive(Debug, Clone)]
pub struct RandomPacer {
    choices: Vec<Duration>,
}

impl RandomPacer {
    pub fn new(choices: Vec<Duration>) -> Self {
        Self { choices }
    }

    pub fn pick(&self) -> Option<Duration> {
        self.choices.choose(&mut rand::thread_rng()).copied()
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pace(&self, after_page: usize) {
        let Some(delay) = self.pick() else {
            return;
        };
        tracing::trace!(after_page, delay_ms = delay.as_millis() as u64, "pace");
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pace(&self, _after_page: usize) {}
}
