//! Command-line argument parsing

use crate::error::{PullerError, Result};
use clap::Parser;
use std::ffi::OsString;

/// Long flags that may also be written with a single dash (`-file list.txt`)
const LONG_FLAGS: &[&str] = &["file", "verbose", "help", "version"];

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "docker-image-puller")]
#[command(about = "Pull every image listed in a file from a Docker registry and discard the bytes")]
#[command(version)]
pub struct Args {
    /// File with a list of repositories to pull
    #[arg(
        long = "file",
        value_name = "PATH",
        help = "file with a list of repositories to pull, one repository:tag per line"
    )]
    pub file: Option<String>,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', help = "Enable verbose output")]
    pub verbose: bool,
}

impl Args {
    /// Parse the process arguments, accepting single-dash long flags
    pub fn parse_args() -> Self {
        Args::parse_from(normalize_flags(std::env::args_os()))
    }

    /// Parse an explicit argument list (program name first)
    pub fn try_parse_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Args::try_parse_from(normalize_flags(args))
    }

    /// Path of the input file; absent or empty is a setup error
    pub fn validate(&self) -> Result<&str> {
        match self.file.as_deref() {
            Some(file) if !file.is_empty() => Ok(file),
            _ => Err(PullerError::Validation("File is required".to_string())),
        }
    }
}

/// Rewrite `-file` / `-file=x` into `--file` / `--file=x` for the known long flags.
/// Everything after a bare `--` is left untouched.
pub fn normalize_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg: OsString| {
            if passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{}", text))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}
