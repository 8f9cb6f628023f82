use tokio_util::sync::CancellationToken;
use url::Url;

use crate::retry::{RetryError, with_retries};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid page uri {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("empty download after {attempts} attempt(s)")]
    Empty { attempts: u32 },

    #[error("download failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("download cancelled")]
    Cancelled,
}

/// Downloads page blobs, retrying empty bodies and transport failures.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
    max_attempts: u32,
}

impl PageFetcher {
    pub fn new(client: reqwest::Client, max_attempts: u32) -> Self {
        Self {
            client,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn fetch(
        &self,
        page_uri: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(page_uri).map_err(|source| FetchError::InvalidUri {
            uri: page_uri.to_owned(),
            source,
        })?;

        let result = with_retries(
            self.max_attempts,
            cancel,
            |bytes: &Vec<u8>| !bytes.is_empty(),
            |attempt| {
                tracing::debug!(%url, attempt, "GET page");
                self.get_once(url.clone())
            },
        )
        .await;

        result.map_err(|err| match err {
            RetryError::Rejected { attempts } => FetchError::Empty { attempts },
            RetryError::Failed { attempts, source } => FetchError::Transport { attempts, source },
            RetryError::Cancelled => FetchError::Cancelled,
        })
    }

    async fn get_once(&self, url: Url) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
