//! Position fetcher for the upstream HTTP API

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::{
    config::FetcherConfig,
    errors::{IssRecorderError, Result},
    models::RawPosition,
};

/// Something that produces the current position once per call
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn fetch(&self) -> Result<RawPosition>;
}

/// HTTP client for the position endpoint
pub struct PositionFetcher {
    client: Client,
    url: String,
}

impl PositionFetcher {
    /// Create a new fetcher with its own HTTP client
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(IssRecorderError::NetworkError)?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a single GET and decode the body
    ///
    /// The body is read to the end on every path, so the connection goes
    /// back to the client's pool instead of being torn down. There are no
    /// retries here.
    pub async fn fetch(&self) -> Result<RawPosition> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(IssRecorderError::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            // Drain only; the status is what gets reported
            if let Err(e) = response.bytes().await {
                debug!("Failed to drain error response body: {}", e);
            }
            warn!(status = status.as_u16(), url = %self.url, "Bad response status");
            return Err(IssRecorderError::BadStatusError(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(IssRecorderError::NetworkError)?;

        let raw: RawPosition = serde_json::from_slice(&body)?;
        debug!(
            longitude = %raw.position.longitude,
            latitude = %raw.position.latitude,
            observed_at = ?raw.observed_at(),
            "Fetched position"
        );
        Ok(raw)
    }
}

#[async_trait]
impl PositionSource for PositionFetcher {
    async fn fetch(&self) -> Result<RawPosition> {
        PositionFetcher::fetch(self).await
    }
}
