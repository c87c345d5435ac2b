//! Per-image pull pipeline
//!
//! `token -> manifest v1 probe -> manifest v2 -> blobs`, run sequentially for one
//! [`ImageRef`]. Stage failures are logged and recorded in the [`PullReport`]; they
//! never abort the batch.

use crate::config::PullerConfig;
use crate::error::{PullerError, Result};
use crate::image::{ImageRef, Manifest};
use crate::logging::Logger;
use crate::registry::auth::{Auth, BearerToken};
use crate::registry::operations::{BlobOperations, BlobReport, ManifestOperations};
use crate::registry::transport::RegistryTransport;
use std::sync::Arc;

/// Pipeline stage names, as they appear in the timing log lines
pub mod phase {
    pub const TOKEN: &str = "getToken";
    pub const MANIFEST_V1: &str = "getManifestV1Noop";
    pub const MANIFEST_V2: &str = "getManifestV2";
    pub const LAYERS: &str = "getLayers";
}

/// A stage failure recorded for one image
#[derive(Debug)]
pub struct StageError {
    pub stage: &'static str,
    pub error: PullerError,
}

/// What happened while pulling one image
#[derive(Debug)]
pub struct PullReport {
    pub image: ImageRef,
    pub layers_declared: usize,
    /// Drained blobs, in manifest order
    pub blobs: Vec<BlobReport>,
    pub errors: Vec<StageError>,
}

impl PullReport {
    fn new(image: ImageRef) -> Self {
        Self {
            image,
            layers_declared: 0,
            blobs: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn layers_fetched(&self) -> usize {
        self.blobs.len()
    }

    pub fn bytes(&self) -> u64 {
        self.blobs.iter().map(|b| b.bytes).sum()
    }

    /// True when every stage except the best-effort v1 probe succeeded
    pub fn is_success(&self) -> bool {
        self.errors.iter().all(|e| e.stage == phase::MANIFEST_V1)
    }

    pub fn error_for(&self, stage: &str) -> Option<&PullerError> {
        self.errors.iter().find(|e| e.stage == stage).map(|e| &e.error)
    }
}

/// Runs the registry pipeline for one image at a time
pub struct ImagePuller {
    auth: Auth,
    manifests: ManifestOperations,
    blobs: BlobOperations,
    output: Logger,
}

impl ImagePuller {
    pub fn new(config: &PullerConfig, transport: Arc<RegistryTransport>, output: Logger) -> Self {
        Self {
            auth: Auth::new(
                Arc::clone(&transport),
                &config.auth_url,
                &config.service,
                output.clone(),
            ),
            manifests: ManifestOperations::new(
                Arc::clone(&transport),
                &config.registry_url,
                output.clone(),
            ),
            blobs: BlobOperations::new(transport, &config.registry_url, output.clone()),
            output,
        }
    }

    /// Pull one image.
    ///
    /// A token failure falls through with an empty bearer and a failed v2 fetch
    /// with an empty manifest, so later stages still run and report their own errors.
    pub async fn pull(&self, image: &ImageRef) -> PullReport {
        let _timer = self.output.phase(format!("pull for {}", image));
        self.output.step(&format!("Pulling: {}", image));

        let mut report = PullReport::new(image.clone());

        let token = match self.token(&image.repository).await {
            Ok(token) => token,
            Err(error) => {
                self.output
                    .error(&format!("Unable to acquire token for {}: {}", image.repository, error));
                report.errors.push(StageError {
                    stage: phase::TOKEN,
                    error,
                });
                BearerToken::default()
            }
        };

        if let Err(error) = self.manifest_v1(image, &token).await {
            self.output
                .warning(&format!("Unable to retrieve manifest v1: {}", error));
            report.errors.push(StageError {
                stage: phase::MANIFEST_V1,
                error,
            });
        }

        let manifest = match self.manifest_v2(image, &token).await {
            Ok(manifest) => manifest,
            Err(error) => {
                self.output
                    .error(&format!("Unable to retrieve manifest v2: {}", error));
                report.errors.push(StageError {
                    stage: phase::MANIFEST_V2,
                    error,
                });
                Manifest::default()
            }
        };
        report.layers_declared = manifest.layers.len();

        match self.layers(image, &manifest, &token).await {
            Ok(blobs) => report.blobs = blobs,
            Err(error) => {
                self.output
                    .error(&format!("Unable to retrieve layers: {}", error));
                report.errors.push(StageError {
                    stage: phase::LAYERS,
                    error,
                });
            }
        }

        if report.is_success() {
            self.output.success(&format!(
                "Pulled {} ({} layers, {})",
                image,
                report.layers_fetched(),
                self.output.format_size(report.bytes())
            ));
        }
        report
    }

    async fn token(&self, repository: &str) -> Result<BearerToken> {
        let _timer = self.output.phase(phase::TOKEN);
        self.auth.acquire(repository).await
    }

    async fn manifest_v1(&self, image: &ImageRef, token: &BearerToken) -> Result<()> {
        let _timer = self.output.phase(phase::MANIFEST_V1);
        self.manifests
            .probe_v1(&image.repository, &image.tag, token)
            .await
    }

    async fn manifest_v2(&self, image: &ImageRef, token: &BearerToken) -> Result<Manifest> {
        let _timer = self.output.phase(phase::MANIFEST_V2);
        self.manifests
            .fetch_v2(&image.repository, &image.tag, token)
            .await
    }

    async fn layers(
        &self,
        image: &ImageRef,
        manifest: &Manifest,
        token: &BearerToken,
    ) -> Result<Vec<BlobReport>> {
        let _timer = self.output.phase(phase::LAYERS);
        self.blobs.drain(&image.repository, manifest, token).await
    }
}
