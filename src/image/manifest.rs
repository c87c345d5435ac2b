use serde::{Deserialize, Serialize};

/// Legacy schema 1 manifest, requested only as a probe
pub const MANIFEST_V1_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v1+json";
/// Single-architecture schema 2 manifest
pub const MANIFEST_V2_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v2+json";

/// Docker image manifest, schema 2.
///
/// Only `layers` drives the pull; the remaining fields are kept for logging.
/// Unknown fields are ignored and a body without `layers` decodes to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub config: Option<Layer>,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

/// A content-addressed blob referenced by a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    #[serde(default)]
    pub media_type: Option<String>,
    pub digest: String,
    #[serde(default)]
    pub size: u64,
}

impl Manifest {
    /// Sum of the declared layer sizes
    pub fn total_size(&self) -> u64 {
        self.layers.iter().map(|layer| layer.size).sum()
    }
}
