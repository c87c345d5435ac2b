//! Shared HTTP transport for Docker Registry API v2 traffic
//!
//! Every outbound request goes through [`RegistryTransport::get`], which applies:
//! - a per-attempt timeout (body included)
//! - bounded retries with exponential backoff for transport failures and 5xx answers
//! - a process-wide cap on simultaneous in-flight requests
//!
//! 4xx answers are surfaced to the caller on the first attempt.

use crate::config::TransportConfig;
use crate::error::handlers::NetworkErrorHandler;
use crate::error::{PullerError, Result};
use crate::logging::Logger;
use crate::registry::stats::{InFlightGuard, StatsSnapshot, TransportStats};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// What the transport does with the outcome of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Return,
}

/// Retry on network and 5xx class errors, surface everything else
pub struct RetryPolicy;

impl RetryPolicy {
    pub fn classify_status(status: StatusCode) -> RetryDecision {
        if status.is_server_error() {
            RetryDecision::Retry
        } else {
            RetryDecision::Return
        }
    }

    pub fn classify_error(error: &reqwest::Error) -> RetryDecision {
        // A request that cannot be built fails the same way every time.
        if error.is_builder() {
            RetryDecision::Return
        } else {
            RetryDecision::Retry
        }
    }
}

/// Retrying, concurrency-limited HTTP client shared by all registry components
pub struct RegistryTransport {
    client: Client,
    config: TransportConfig,
    limiter: Arc<Semaphore>,
    stats: Arc<TransportStats>,
    output: Logger,
}

impl RegistryTransport {
    pub fn new(config: TransportConfig, output: Logger) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("docker-image-puller/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PullerError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(config.max_concurrent)),
            stats: TransportStats::new(),
            config,
            output,
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Delay before retry number `attempt + 1`: `base * 2^attempt`, capped at `backoff_max`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        backoff_delay(self.config.backoff_base, self.config.backoff_max, attempt)
    }

    /// Issue a GET, retrying transient failures.
    ///
    /// When retries run out on a 5xx the last response is returned so the caller
    /// can report its status; when they run out on a transport error that error is
    /// returned. The returned response holds a concurrency slot until it is
    /// drained, decoded or dropped.
    pub async fn get(&self, url: &str, headers: HeaderMap) -> Result<RegistryResponse> {
        self.stats.record_request();
        let total_attempts = self.config.max_retries.saturating_add(1);
        let mut attempt: u32 = 0;

        loop {
            let permit = Arc::clone(&self.limiter)
                .acquire_owned()
                .await
                .map_err(|_| PullerError::Network("HTTP transport has been shut down".to_string()))?;
            let in_flight = self.stats.enter();
            self.stats.record_attempt();

            let last_attempt = attempt + 1 >= total_attempts;
            let outcome = self.client.get(url).headers(headers.clone()).send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if last_attempt || RetryPolicy::classify_status(status) == RetryDecision::Return {
                        return Ok(RegistryResponse {
                            inner: response,
                            stats: Arc::clone(&self.stats),
                            _in_flight: in_flight,
                            _permit: permit,
                        });
                    }
                    self.output.detail(&format!(
                        "GET {} returned {} (attempt {}/{})",
                        url,
                        status,
                        attempt + 1,
                        total_attempts
                    ));
                }
                Err(error) => {
                    if last_attempt || RetryPolicy::classify_error(&error) == RetryDecision::Return {
                        return Err(NetworkErrorHandler::handle_network_error(
                            &error,
                            &format!("GET {}", url),
                        ));
                    }
                    self.output.detail(&format!(
                        "GET {} failed (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        total_attempts,
                        error
                    ));
                }
            }

            drop(in_flight);
            drop(permit);

            let delay = self.backoff_delay(attempt);
            self.stats.record_retry();
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    base.checked_mul(factor).map_or(max, |delay| delay.min(max))
}

/// Response returned by [`RegistryTransport::get`].
///
/// The body must be consumed with [`drain`](Self::drain), [`json`](Self::json) or
/// [`text`](Self::text), or the response dropped, to release its concurrency slot.
#[derive(Debug)]
pub struct RegistryResponse {
    inner: reqwest::Response,
    stats: Arc<TransportStats>,
    _in_flight: InFlightGuard,
    _permit: OwnedSemaphorePermit,
}

impl RegistryResponse {
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Raw `Content-Length` header as advertised by the server
    pub fn content_length_header(&self) -> Option<&str> {
        self.inner
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
    }

    /// Read and discard the body, returning the number of bytes consumed
    pub async fn drain(self) -> Result<u64> {
        let mut stream = self.inner.bytes_stream();
        let mut total = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| NetworkErrorHandler::handle_network_error(&e, "body read"))?;
            total += chunk.len() as u64;
        }
        self.stats.record_bytes(total);
        Ok(total)
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self
            .inner
            .bytes()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "body read"))?;
        self.stats.record_bytes(bytes.len() as u64);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decode the body as JSON; unknown fields are ignored by the target type
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self
            .inner
            .bytes()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "body read"))?;
        self.stats.record_bytes(bytes.len() as u64);
        Ok(serde_json::from_slice(&bytes)?)
    }
}
