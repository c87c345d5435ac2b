//! Configuration for registry endpoints and the shared HTTP transport

use crate::error::{PullerError, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io";
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io";
pub const DEFAULT_SERVICE: &str = "registry.docker.io";

/// Upper bound accepted for `max_retries`
pub const MAX_RETRIES_LIMIT: u32 = 100;

/// Settings of the process-wide HTTP transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Deadline of a single attempt, body included
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Simultaneous in-flight requests across the process
    pub max_concurrent: usize,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 5,
            max_concurrent: 10,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }
}

impl TransportConfig {
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(PullerError::Config(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(PullerError::Config(format!(
                "max_retries must not exceed {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }
        if self.max_concurrent == 0 {
            return Err(PullerError::Config(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }
        if self.backoff_max < self.backoff_base {
            return Err(PullerError::Config(
                "backoff_max must not be smaller than backoff_base".to_string(),
            ));
        }
        Ok(())
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullerConfig {
    /// Base URL of the Distribution API, without the `/v2` suffix
    pub registry_url: String,
    /// Base URL of the token issuer, without the `/token` suffix
    pub auth_url: String,
    /// `service` parameter sent to the token issuer
    pub service: String,
    pub transport: TransportConfig,
}

impl Default for PullerConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            service: DEFAULT_SERVICE.to_string(),
            transport: TransportConfig::default(),
        }
    }
}

impl PullerConfig {
    /// Create config from environment variables and defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup; unparsable numbers keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup("DOCKER_PULLER_REGISTRY_URL") {
            config.registry_url = val;
        }
        if let Some(val) = lookup("DOCKER_PULLER_AUTH_URL") {
            config.auth_url = val;
        }
        if let Some(val) = lookup("DOCKER_PULLER_SERVICE") {
            config.service = val;
        }
        if let Some(secs) = lookup("DOCKER_PULLER_TIMEOUT").and_then(|v| v.parse().ok()) {
            config.transport.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = lookup("DOCKER_PULLER_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            config.transport.max_retries = retries;
        }
        if let Some(max) = lookup("DOCKER_PULLER_MAX_CONCURRENT").and_then(|v| v.parse().ok()) {
            config.transport.max_concurrent = max;
        }

        config.registry_url = config.registry_url.trim_end_matches('/').to_string();
        config.auth_url = config.auth_url.trim_end_matches('/').to_string();
        config
    }

    /// Point both endpoints at one base URL, as a local mirror or test server does.
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.registry_url = base.to_string();
        self.auth_url = base.to_string();
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_base_url("registry_url", &self.registry_url)?;
        validate_base_url("auth_url", &self.auth_url)?;
        if self.service.is_empty() {
            return Err(PullerError::Config("service cannot be empty".to_string()));
        }
        self.transport.validate()
    }
}

fn validate_base_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| PullerError::Config(format!("{} is not a valid URL ({}): {}", name, value, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(PullerError::Config(format!(
            "{} must use http or https, got {}",
            name, other
        ))),
    }
}
