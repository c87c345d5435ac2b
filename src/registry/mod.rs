//! Registry module for Docker registry interactions
//!
//! This module provides the shared HTTP transport, anonymous token acquisition and
//! the manifest/blob operations of the Docker Registry HTTP API v2, tied together by
//! the per-image [`ImagePuller`] pipeline.

pub mod auth;
pub mod operations;
pub mod pipeline;
pub mod stats;
pub mod transport;

pub use auth::{Auth, BearerToken};
pub use operations::{BlobOperations, BlobReport, ManifestOperations};
pub use pipeline::{ImagePuller, PullReport, StageError};
pub use stats::{StatsSnapshot, TransportStats};
pub use transport::{RegistryResponse, RegistryTransport, RetryDecision, RetryPolicy};
