//! Batch runner: reads the input file and pulls each listed image in order

use crate::cli::args::Args;
use crate::config::PullerConfig;
use crate::error::{PullerError, Result};
use crate::image::ImageRef;
use crate::logging::Logger;
use crate::registry::{ImagePuller, PullReport, RegistryTransport, StatsSnapshot};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// Totals over one input file
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<PullReport>,
    pub transport: StatsSnapshot,
}

impl BatchSummary {
    pub fn images(&self) -> usize {
        self.reports.len()
    }

    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.is_success()).count()
    }

    pub fn layers(&self) -> usize {
        self.reports.iter().map(|r| r.layers_fetched()).sum()
    }

    pub fn bytes(&self) -> u64 {
        self.reports.iter().map(|r| r.bytes()).sum()
    }
}

pub struct Runner {
    args: Args,
    config: PullerConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args, config: PullerConfig) -> Self {
        let output = Logger::new(args.verbose);
        Self {
            args,
            config,
            output,
        }
    }

    /// Run the batch.
    ///
    /// Only setup errors are returned: missing flag, bad configuration, unreadable
    /// file or a malformed line. Per-image failures end up in the summary.
    pub async fn run(&self) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let path = self.args.validate()?;
        self.config.validate()?;

        let file = File::open(path).await.map_err(|e| {
            PullerError::Io(std::io::Error::new(
                e.kind(),
                format!("Cannot open {}: {}", path, e),
            ))
        })?;

        self.output.detail(&format!(
            "Registry: {}, auth: {} (service {})",
            self.config.registry_url, self.config.auth_url, self.config.service
        ));

        let transport = Arc::new(RegistryTransport::new(
            self.config.transport.clone(),
            self.output.clone(),
        )?);
        let puller = ImagePuller::new(&self.config, Arc::clone(&transport), self.output.clone());

        let mut summary = pull_lines(BufReader::new(file), &puller).await?;
        summary.transport = transport.stats();

        self.output.info(&format!(
            "Pulled {}/{} images, {} layers, {} in {} ({} HTTP attempts, {} retries)",
            summary.succeeded(),
            summary.images(),
            summary.layers(),
            self.output.format_size(summary.bytes()),
            self.output.format_duration(start_time.elapsed()),
            summary.transport.attempts,
            summary.transport.retries
        ));

        Ok(summary)
    }
}

/// Pull every non-empty line of `reader` in order.
///
/// A malformed line stops the batch with `InvalidReference`; images on earlier
/// lines have already been pulled by then.
pub async fn pull_lines<R>(reader: R, puller: &ImagePuller) -> Result<BatchSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = BatchSummary::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        let image = ImageRef::parse(&line)?;
        summary.reports.push(puller.pull(&image).await);
    }

    Ok(summary)
}
