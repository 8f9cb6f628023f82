use reqwest::header::ACCEPT;
use url::Url;

use crate::config::CatalogConfig;
use crate::formats::{Envelope, PageList, SeriesInfo};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("build catalog url: {0}")]
    Url(#[from] url::ParseError),

    #[error("GET {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url}: unexpected response shape: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only client for the two catalog queries.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
    api_version: u32,
}

impl CatalogClient {
    pub fn new(client: reqwest::Client, config: &CatalogConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_version: config.api_version,
        }
    }

    pub fn series_info_url(&self, series_id: &str) -> Result<Url, CatalogError> {
        let mut url = self.endpoint("info")?;
        url.query_pairs_mut()
            .append_pair("oid", series_id)
            .append_pair("last", "0");
        Ok(url)
    }

    pub fn page_list_url(&self, chapter_id: &str) -> Result<Url, CatalogError> {
        let mut url = self.endpoint("pages")?;
        url.query_pairs_mut().append_pair("oid", chapter_id);
        Ok(url)
    }

    fn endpoint(&self, name: &str) -> Result<Url, CatalogError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = Url::parse(&format!("{base}/query/web{}/{name}", self.api_version))?;
        Ok(url)
    }

    pub async fn fetch_series_info(&self, series_id: &str) -> Result<SeriesInfo, CatalogError> {
        let url = self.series_info_url(series_id)?;
        tracing::debug!(%url, "fetch series info");

        let envelope: Envelope<serde_json::Value> = self.get_json(&url).await?;
        let mut info: SeriesInfo =
            serde_json::from_value(envelope.data.clone()).map_err(|source| {
                CatalogError::Decode {
                    url: url.to_string(),
                    source,
                }
            })?;
        info.payload = envelope.data;
        Ok(info)
    }

    pub async fn fetch_page_list(&self, chapter_id: &str) -> Result<PageList, CatalogError> {
        let url = self.page_list_url(chapter_id)?;
        tracing::debug!(%url, "fetch page list");

        let envelope: Envelope<Vec<String>> = self.get_json(&url).await?;
        Ok(PageList {
            pages: envelope.data,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &Url) -> Result<T, CatalogError> {
        let http_err = |source| CatalogError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(http_err)?;
        let bytes = response.bytes().await.map_err(http_err)?;

        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
