//! PDF download with retries

use crate::errors::ResearchError;
use backoff::{future::retry, ExponentialBackoff};
use std::time::Duration;
use tracing::{debug, warn};

/// Downloads paper PDFs
pub struct PaperFetcher {
    client: reqwest::Client,
    max_retries: u32,
}

impl PaperFetcher {
    pub fn new(timeout: Duration, max_retries: u32) -> Result<Self, ResearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lineage-research/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ResearchError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, max_retries })
    }

    /// Download `url`, retrying timeouts, connection failures and 5xx
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResearchError> {
        let max_retries = self.max_retries;
        let mut attempt = 0u32;

        let policy = ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };

        let bytes = retry(policy, || {
            attempt += 1;
            let current = attempt;
            async move {
                match self.fetch_once(url).await {
                    Ok(bytes) => Ok(bytes),
                    Err((transient, e)) if transient && current <= max_retries => {
                        warn!(url, attempt = current, error = %e, "Download failed, retrying");
                        Err(backoff::Error::transient(e))
                    }
                    Err((_, e)) => Err(backoff::Error::permanent(e)),
                }
            }
        })
        .await?;

        debug!(url, bytes = bytes.len(), "Paper downloaded");
        Ok(bytes)
    }

    async fn fetch_once(&self, url: &str) -> Result<Vec<u8>, (bool, ResearchError)> {
        let download_error = |message: String| ResearchError::Download {
            url: url.to_string(),
            message,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            let transient = e.is_timeout() || e.is_connect();
            (transient, download_error(e.to_string()))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err((status.is_server_error(), download_error(format!("HTTP {}", status))));
        }

        let bytes = response.bytes().await.map_err(|e| (e.is_timeout(), download_error(e.to_string())))?;
        Ok(bytes.to_vec())
    }
}
