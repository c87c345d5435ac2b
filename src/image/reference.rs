use crate::error::{PullerError, Result};
use std::fmt;
use std::str::FromStr;

/// A `repository:tag` pair read from the input file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    /// Parse `<repository>:<tag>`. The line must hold exactly one colon and both
    /// halves must be non-empty; registry hosts with ports are therefore not accepted.
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(repository), Some(tag), None) if !repository.is_empty() && !tag.is_empty() => {
                Ok(Self {
                    repository: repository.to_string(),
                    tag: tag.to_string(),
                })
            }
            _ => Err(PullerError::InvalidReference(line.to_string())),
        }
    }
}

impl FromStr for ImageRef {
    type Err = PullerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
