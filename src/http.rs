//! Polite HTTP access: shared client, courtesy delay, bounded retries.
//!
//! The pipeline is strictly sequential, so the client keeps its politeness
//! state in `&mut self` rather than behind a lock.

use std::time::Instant;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;

use crate::config;

pub struct PoliteClient {
    client: reqwest::Client,
    last_request: Option<Instant>,
}

impl PoliteClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config::USER_AGENT)
            .timeout(config::http_timeout())
            .build()
            .context("failed to build HTTP client")?;
        Ok(PoliteClient {
            client,
            last_request: None,
        })
    }

    /// GET returning the response body as text.
    pub async fn get_text(&mut self, url: &str) -> Result<String> {
        let resp = self.get_with_retry(url).await?;
        resp.text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }

    /// GET returning the raw response bytes.
    pub async fn get_bytes(&mut self, url: &str) -> Result<Vec<u8>> {
        let resp = self.get_with_retry(url).await?;
        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;
        Ok(bytes.to_vec())
    }

    /// GET deserializing a JSON response body.
    pub async fn get_json<T: DeserializeOwned>(&mut self, url: &str) -> Result<T> {
        let resp = self.get_with_retry(url).await?;
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding JSON from {url}"))
    }

    /// Issues the request after the courtesy pause, retrying transient
    /// failures (timeout, connect error, 5xx) with exponential backoff.
    /// Non-transient failures and non-2xx statuses abort immediately.
    async fn get_with_retry(&mut self, url: &str) -> Result<reqwest::Response> {
        self.pause().await;

        let mut delay = config::RETRY_BASE_DELAY;
        for attempt in 1..=config::RETRY_ATTEMPTS {
            let last = attempt == config::RETRY_ATTEMPTS;
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp);
                    }
                    if !status.is_server_error() || last {
                        bail!("GET {url} failed with status {status}");
                    }
                    tracing::warn!(%url, %status, attempt, "server error, backing off");
                }
                Err(err) if (err.is_timeout() || err.is_connect()) && !last => {
                    tracing::warn!(%url, error = %err, attempt, "request failed, backing off");
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("GET {url}"));
                }
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
        bail!("GET {url}: retries exhausted")
    }

    async fn pause(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < config::COURTESY_DELAY {
                tokio::time::sleep(config::COURTESY_DELAY - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}
