// src/session.rs
use crate::types::{Config, SubhoundError};
use log::debug;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Shared HTTP client used by every outbound call.
#[derive(Clone)]
pub struct Session {
    pub client: Client,
    max_retries: u32,
}

impl Session {
    pub fn new(config: &Config) -> Result<Self, SubhoundError> {
        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10);

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| SubhoundError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .map_err(|e| SubhoundError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Session {
            client,
            max_retries: config.retries,
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response, SubhoundError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| SubhoundError::NetworkError(e.to_string()))
    }

    /// Issues a GET, retrying transport failures, 429 and 5xx responses with
    /// exponential backoff. The last response is returned as-is once retries
    /// are exhausted.
    pub async fn get_with_retry(&self, url: &str) -> Result<Response, SubhoundError> {
        let mut retries = 0;
        loop {
            match self.get(url).await {
                Ok(response) if retries < self.max_retries && is_retryable(response.status()) => {
                    debug!("{} returned {}, retrying", url, response.status());
                }
                Ok(response) => return Ok(response),
                Err(e) if retries >= self.max_retries => return Err(e),
                Err(e) => {
                    debug!("Request to {} failed: {}, retrying", url, e);
                }
            }
            retries += 1;
            tokio::time::sleep(backoff(retries)).await;
        }
    }

    pub async fn get_json<T>(&self, url: &str) -> Result<T, SubhoundError>
    where
        T: serde::de::DeserializeOwned,
    {
        let response = self.get_with_retry(url).await?;

        if !response.status().is_success() {
            return Err(SubhoundError::HttpStatus(response.status()));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SubhoundError::ParseError(e.to_string()))
    }
}

/// 100 ms doubled per attempt, saturating for large retry counts.
fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(2u64.saturating_pow(attempt).saturating_mul(100))
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
