//! Manifest operations for the registry client
//!
//! Both operations GET `/v2/{name}/manifests/{reference}` and differ only in the
//! `Accept` header and what happens with the body:
//! - the v1 probe only checks for 200 and discards the body
//! - the v2 fetch decodes the body into a [`Manifest`]

use crate::error::handlers::HttpErrorHandler;
use crate::error::Result;
use crate::image::{MANIFEST_V1_MEDIA_TYPE, MANIFEST_V2_MEDIA_TYPE, Manifest};
use crate::logging::Logger;
use crate::registry::auth::BearerToken;
use crate::registry::operations::request_headers;
use crate::registry::transport::{RegistryResponse, RegistryTransport};
use reqwest::StatusCode;
use std::sync::Arc;

#[derive(Clone)]
pub struct ManifestOperations {
    transport: Arc<RegistryTransport>,
    address: String,
    output: Logger,
}

impl ManifestOperations {
    pub fn new(transport: Arc<RegistryTransport>, address: &str, output: Logger) -> Self {
        Self {
            transport,
            address: address.trim_end_matches('/').to_string(),
            output,
        }
    }

    pub fn manifest_url(&self, repository: &str, tag: &str) -> String {
        format!("{}/v2/{}/manifests/{}", self.address, repository, tag)
    }

    /// Request the legacy schema 1 manifest; succeeds iff the registry answers 200
    pub async fn probe_v1(&self, repository: &str, tag: &str, token: &BearerToken) -> Result<()> {
        let response = self
            .get(repository, tag, token, MANIFEST_V1_MEDIA_TYPE, "manifest v1 probe")
            .await?;
        let discarded = response.drain().await?;
        self.output
            .detail(&format!("Manifest v1 probe returned {} bytes", discarded));
        Ok(())
    }

    /// Fetch and decode the schema 2 manifest
    pub async fn fetch_v2(&self, repository: &str, tag: &str, token: &BearerToken) -> Result<Manifest> {
        let response = self
            .get(repository, tag, token, MANIFEST_V2_MEDIA_TYPE, "manifest v2 fetch")
            .await?;
        if let Some(content_type) = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if content_type != MANIFEST_V2_MEDIA_TYPE {
                self.output.warning(&format!(
                    "Registry answered manifest request with content type {}",
                    content_type
                ));
            }
        }

        let manifest: Manifest = response.json().await?;
        self.output.detail(&format!(
            "Manifest lists {} layers ({} declared)",
            manifest.layers.len(),
            self.output.format_size(manifest.total_size())
        ));
        Ok(manifest)
    }

    async fn get(
        &self,
        repository: &str,
        tag: &str,
        token: &BearerToken,
        accept: &str,
        operation: &str,
    ) -> Result<RegistryResponse> {
        let url = self.manifest_url(repository, tag);
        self.output.detail(&format!("GET image manifest from {}", url));

        let headers = request_headers(token, Some(accept))?;
        let response = self.transport.get(&url, headers).await?;
        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                operation,
            ));
        }
        Ok(response)
    }
}
