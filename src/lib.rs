//! Docker Image Puller Library
//!
//! This file serves as the library root for the docker-image-puller crate,
//! organizing and exposing the modules that pull images from a Docker registry:
//! token acquisition, manifest negotiation and blob download over a shared
//! retrying HTTP transport.

pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod logging;
pub mod registry;

pub use config::{PullerConfig, TransportConfig};
pub use error::{PullerError, Result};
pub use image::{ImageRef, Layer, Manifest};
pub use logging::Logger;
pub use registry::{ImagePuller, PullReport, RegistryTransport};
