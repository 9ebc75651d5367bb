//! HTTP fetcher for the JSON payload

pub mod client;
pub mod response;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::debug;

pub use client::FetcherConfig;
pub use response::FetchError;

/// Trait for fetching the payload - allows for different implementations
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issue one request and resolve with the complete response body
    async fn fetch(&self, host: &str, path: &str) -> Result<Bytes, FetchError>;
}

/// Fetcher issuing a single HTTPS GET through reqwest
///
/// The body is accumulated in full before the call resolves. Transport
/// timeouts are whatever the underlying client enforces; nothing is retried.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    config: FetcherConfig,
}

impl HttpFetcher {
    /// Create a new HTTP fetcher
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, host: &str, path: &str) -> Result<Bytes, FetchError> {
        let url = format!("https://{}{}", host, path);
        debug!("Requesting {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT, self.config.accept.as_str());
        if let Some(user_agent) = &self.config.user_agent {
            request = request.header(USER_AGENT, user_agent.as_str());
        }

        let mut response = request.send().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        debug!("{} responded with {}", url, response.status());

        // Fragments are appended in arrival order until the body ends
        let mut body = BytesMut::new();
        while let Some(fragment) = response
            .chunk()
            .await
            .map_err(|source| FetchError::Body {
                url: url.clone(),
                source,
            })?
        {
            body.extend_from_slice(&fragment);
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.freeze())
    }
}
