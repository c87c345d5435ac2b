//! Image references and manifest model
//!
//! [`ImageRef`] is parsed from one line of the input file; [`Manifest`] is the decoded
//! Docker v2 manifest whose [`Layer`]s drive the blob downloads.
//!
//! ```
//! use docker_image_puller::image::ImageRef;
//!
//! let image: ImageRef = "library/alpine:latest".parse().unwrap();
//! assert_eq!(image.repository, "library/alpine");
//! assert_eq!(image.tag, "latest");
//! ```

pub mod manifest;
pub mod reference;

pub use manifest::{Layer, Manifest, MANIFEST_V1_MEDIA_TYPE, MANIFEST_V2_MEDIA_TYPE};
pub use reference::ImageRef;
