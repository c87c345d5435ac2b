//! Registry operations against the Distribution API v2 endpoints
//!
//! Manifest and blob GETs share the same header handling: every request carries
//! `Authorization: Bearer <token>`, manifest requests also pick a media type through `Accept`.

pub mod blob_operations;
pub mod manifest_operations;

pub use blob_operations::{BlobOperations, BlobReport};
pub use manifest_operations::ManifestOperations;

use crate::error::{PullerError, Result};
use crate::registry::auth::BearerToken;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

pub(crate) fn request_headers(token: &BearerToken, accept: Option<&str>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let authorization = HeaderValue::from_str(&token.header_value())
        .map_err(|e| PullerError::Auth(format!("Token is not a valid header value: {}", e)))?;
    headers.insert(AUTHORIZATION, authorization);
    if let Some(accept) = accept {
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(accept)
                .map_err(|e| PullerError::Config(format!("Invalid media type {}: {}", accept, e)))?,
        );
    }
    Ok(headers)
}
