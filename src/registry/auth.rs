//! Anonymous bearer-token acquisition for Docker registry access

use crate::error::handlers::HttpErrorHandler;
use crate::error::{PullerError, Result};
use crate::logging::Logger;
use crate::registry::transport::RegistryTransport;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Opaque credential presented as `Authorization: Bearer <token>`.
///
/// The default value is the empty token; requests made with it are anonymous and
/// usually answered with 401.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BearerToken {
    pub token: String,
}

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Header value for the `Authorization` header
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("token", &format_args!("<{} chars>", self.token.len()))
            .finish()
    }
}

/// Requests repository-scoped pull tokens from the auth service
pub struct Auth {
    transport: Arc<RegistryTransport>,
    auth_url: String,
    service: String,
    output: Logger,
}

impl Auth {
    pub fn new(
        transport: Arc<RegistryTransport>,
        auth_url: &str,
        service: &str,
        output: Logger,
    ) -> Self {
        Self {
            transport,
            auth_url: auth_url.trim_end_matches('/').to_string(),
            service: service.to_string(),
            output,
        }
    }

    /// Token endpoint URL carrying the `service` and both repository scopes
    pub fn token_url(&self, repository: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/token", self.auth_url))?;
        url.query_pairs_mut()
            .append_pair("service", &self.service)
            .append_pair("scope", &format!("repository:{}:*", repository))
            .append_pair("scope", &format!("repository(plugin):{}:*", repository));
        Ok(url)
    }

    /// Acquire a bearer token scoped to `repository`
    pub async fn acquire(&self, repository: &str) -> Result<BearerToken> {
        let url = self.token_url(repository)?;
        self.output.detail(&format!("Requesting token from: {}", url));

        let response = self.transport.get(url.as_str(), HeaderMap::new()).await?;
        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_auth_error(status, &error_text));
        }

        let token_response: TokenResponse = response.json().await?;
        let token = token_response
            .token
            .filter(|t| !t.is_empty())
            .or(token_response.access_token)
            .ok_or_else(|| PullerError::Auth("Token response carried no token".to_string()))?;

        self.output
            .detail(&format!("Token obtained (length: {} chars)", token.len()));
        if let Some(expires_in) = token_response.expires_in {
            self.output
                .detail(&format!("Token expires in {} seconds", expires_in));
        }

        Ok(BearerToken::new(token))
    }
}
