//! Logging and phase timing
//!
//! This module provides the [`Logger`] used for all user-visible output. Messages are
//! emitted as `tracing` events so that verbosity can be controlled through `RUST_LOG`
//! as well as the `-verbose` flag. [`PhaseTimer`] reports the wall time of a named
//! pipeline phase when it goes out of scope.

use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` wins over the `verbose` flag when set. Calling this twice is harmless.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Logger responsible for all user-visible output
#[derive(Debug, Clone)]
pub struct Logger {
    pub verbose: bool,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Information message
    pub fn info(&self, message: &str) {
        info!("{}", message);
    }

    /// Step information
    pub fn step(&self, message: &str) {
        info!("▶ {}", message);
    }

    /// Success message
    pub fn success(&self, message: &str) {
        info!("✓ {}", message);
    }

    /// Warning message
    pub fn warning(&self, message: &str) {
        warn!("{}", message);
    }

    /// Error message
    pub fn error(&self, message: &str) {
        error!("{}", message);
    }

    /// Detailed information (only shown in verbose mode)
    pub fn detail(&self, message: &str) {
        if self.verbose {
            info!("  {}", message);
        } else {
            debug!("  {}", message);
        }
    }

    /// Start timing a named phase; elapsed time is logged when the timer drops
    pub fn phase(&self, name: impl Into<String>) -> PhaseTimer {
        PhaseTimer {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Format byte count in human-readable units
    pub fn format_size(&self, bytes: u64) -> String {
        if bytes < 1024 {
            format!("{} B", bytes)
        } else if bytes < 1024 * 1024 {
            format!("{:.1} KB", bytes as f64 / 1024.0)
        } else if bytes < 1024 * 1024 * 1024 {
            format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
        }
    }

    /// Format duration in human-readable format
    pub fn format_duration(&self, duration: Duration) -> String {
        format_duration(duration)
    }
}

/// Logs `"<name> took <elapsed>"` when dropped.
#[derive(Debug)]
pub struct PhaseTimer {
    name: String,
    start: Instant,
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        info!("{} took {}", self.name, format_duration(self.start.elapsed()));
    }
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
    } else if secs < 60 {
        format!("{:.3}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{}h{}m{}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
