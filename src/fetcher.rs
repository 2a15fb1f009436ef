use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;

use crate::error::{PipelineError, Result};
use crate::snapshot::RateSnapshot;

/// Where a run gets its snapshot from.
///
/// `Ok(None)` means the source could not be reached and the run should stop
/// quietly; `Err` is reserved for faults that must halt the process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_snapshot(&self) -> Result<Option<RateSnapshot>>;
}

pub struct HttpFetcher {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> HttpFetcher {
        HttpFetcher::with_client(Client::new(), url, timeout)
    }

    pub fn with_client(client: Client, url: impl Into<String>, timeout: Duration) -> HttpFetcher {
        HttpFetcher {
            client,
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpFetcher {
    async fn fetch_snapshot(&self) -> Result<Option<RateSnapshot>> {
        fetch_snapshot(&self.client, &self.url, self.timeout).await
    }
}

/// Issues a single GET against `url` and decodes the body.
pub async fn fetch_snapshot(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Option<RateSnapshot>> {
    if url.trim().is_empty() {
        return Err(PipelineError::Configuration(
            "endpoint not configured (API_URL is empty)".to_string(),
        ));
    }

    let text = match load_json(client, url, timeout).await {
        Ok(text) => text,
        Err(e) => {
            error!("Error fetching rates from {}: {}", url, e);
            return Ok(None);
        }
    };

    let snapshot = RateSnapshot::from_json(&text)?;
    info!(
        "Successfully fetched data for date: {}",
        snapshot.reference_date.as_deref().unwrap_or("<none>")
    );

    Ok(Some(snapshot))
}

async fn load_json(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let resp = client.get(url).timeout(timeout).send().await?;
    let resp = resp.error_for_status()?;
    let text = resp.text().await?;

    Ok(text)
}
