//! Command line interface module
//!
//! This module provides argument parsing and the batch runner that reads the input
//! file and drives the per-image pull pipeline.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::{BatchSummary, Runner};
