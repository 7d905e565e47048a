//! Outbound health probe.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::models::HealthReport;

#[derive(Error, Debug)]
pub enum HealthClientError {
    #[error("Health endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Health endpoint answered {0}")]
    Status(u16),

    #[error("Health report could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Calls `{base_url}/healthCheck` and decodes the report. Every call logs the
/// URL, the elapsed time and the response body.
#[derive(Debug, Clone)]
pub struct HealthClient {
    http: reqwest::Client,
    url: String,
}

impl HealthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, HealthClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: format!("{}/healthCheck", base_url.trim_end_matches('/')),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch_report(&self) -> Result<HealthReport, HealthClientError> {
        let started = Instant::now();
        info!(url = %self.url, "Sending health probe");

        let response = match self.http.get(&self.url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    url = %self.url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Health probe failed"
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        let body = response.text().await?;
        info!(
            url = %self.url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            body = %body,
            "Health probe answered"
        );

        if !status.is_success() {
            return Err(HealthClientError::Status(status.as_u16()));
        }
        Ok(serde_json::from_str(&body)?)
    }
}
