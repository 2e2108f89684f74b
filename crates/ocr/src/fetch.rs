use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Receipt image not found: {0}")]
    NotFound(String),
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },
}

/// Retrieves receipt image bytes by URL.
pub trait ReceiptFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Serves images from an in-memory map keyed by URL.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.images.insert(url.to_string(), bytes.into());
        self
    }
}

impl ReceiptFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}

/// Downloads receipt photos over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ReceiptFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let http_err = |e: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().await.map_err(http_err)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        let bytes = response
            .error_for_status()
            .map_err(http_err)?
            .bytes()
            .await
            .map_err(http_err)?;
        Ok(bytes.to_vec())
    }
}
