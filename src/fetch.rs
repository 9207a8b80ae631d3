//! Paced HTTP fetching shared by the network-facing collectors.
//!
//! Every outbound request goes through one [`Fetcher`], which enforces a
//! minimum delay between requests so scraped sites see a polite, steady
//! cadence regardless of which collector is asking.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::FetchConfig;
use crate::error::IngestError;

pub struct Fetcher {
    client: reqwest::Client,
    delay: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

/// A successful response body with its advertised content type.
pub struct Fetched {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| IngestError::Config(format!("http client: {e}")))?;
        Ok(Fetcher {
            client,
            delay: Duration::from_millis(config.request_delay_ms),
            last_request: tokio::sync::Mutex::new(None),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Fetched, IngestError> {
        self.request(url, None).await
    }

    pub async fn get_with_bearer(&self, url: &str, token: &str) -> Result<Fetched, IngestError> {
        self.request(url, Some(token)).await
    }

    async fn request(&self, url: &str, bearer: Option<&str>) -> Result<Fetched, IngestError> {
        self.pace().await;
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request
            .send()
            .await
            .map_err(|e| IngestError::Fetch(format!("{url}: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::Fetch(format!("{url}: HTTP {status}")));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| IngestError::Fetch(format!("{url}: {e}")))?
            .to_vec();
        Ok(Fetched { content_type, body })
    }

    /// Sleep out the remainder of the per-request delay. The lock is held
    /// across the sleep so interleaved callers cannot drop below the floor.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}
