//! Blob operations for the registry client
//!
//! Downloads `GET /v2/{name}/blobs/{digest}` for every layer of a manifest, in the
//! order the manifest declares them, and throws the bytes away. Payloads are not
//! hashed against their digest.

use crate::error::handlers::HttpErrorHandler;
use crate::error::Result;
use crate::image::{Layer, Manifest};
use crate::logging::Logger;
use crate::registry::auth::BearerToken;
use crate::registry::operations::request_headers;
use crate::registry::transport::RegistryTransport;
use reqwest::StatusCode;
use std::sync::Arc;

/// Outcome of one drained blob
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobReport {
    pub digest: String,
    /// `Content-Length` header as sent by the registry, if any
    pub advertised_size: Option<String>,
    /// Bytes actually read from the body
    pub bytes: u64,
}

#[derive(Clone)]
pub struct BlobOperations {
    transport: Arc<RegistryTransport>,
    address: String,
    output: Logger,
}

impl BlobOperations {
    pub fn new(transport: Arc<RegistryTransport>, address: &str, output: Logger) -> Self {
        Self {
            transport,
            address: address.trim_end_matches('/').to_string(),
            output,
        }
    }

    pub fn blob_url(&self, repository: &str, digest: &str) -> String {
        format!("{}/v2/{}/blobs/{}", self.address, repository, digest)
    }

    /// Fetch every layer of `manifest` in declared order.
    ///
    /// The first failure stops the iteration; layers fetched before it stay fetched.
    pub async fn drain(
        &self,
        repository: &str,
        manifest: &Manifest,
        token: &BearerToken,
    ) -> Result<Vec<BlobReport>> {
        let mut reports = Vec::with_capacity(manifest.layers.len());
        for (index, layer) in manifest.layers.iter().enumerate() {
            self.output.detail(&format!(
                "Layer {}/{}: {}",
                index + 1,
                manifest.layers.len(),
                layer.digest
            ));
            reports.push(self.fetch_blob(repository, layer, token).await?);
        }
        Ok(reports)
    }

    /// Download a single blob and discard its body
    pub async fn fetch_blob(
        &self,
        repository: &str,
        layer: &Layer,
        token: &BearerToken,
    ) -> Result<BlobReport> {
        let url = self.blob_url(repository, &layer.digest);
        self.output.info(&url);

        let headers = request_headers(token, None)?;
        let response = self.transport.get(&url, headers).await?;
        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                &format!("blob fetch {}", layer.digest),
            ));
        }

        let advertised_size = response.content_length_header().map(str::to_string);
        self.output.info(&format!(
            "Layer Size in Bytes: {}",
            advertised_size.as_deref().unwrap_or("unknown")
        ));

        let bytes = response.drain().await?;
        if layer.size != 0 && bytes != layer.size {
            self.output.warning(&format!(
                "Blob {} drained {} bytes, manifest declared {}",
                layer.digest, bytes, layer.size
            ));
        }

        Ok(BlobReport {
            digest: layer.digest.clone(),
            advertised_size,
            bytes,
        })
    }
}
