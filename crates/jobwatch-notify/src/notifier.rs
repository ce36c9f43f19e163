//! Report delivery channels.

use std::io::Write;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::{NotifyError, Report};

/// A channel a rendered report can be delivered through.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name for logs.
    fn name(&self) -> &'static str;

    /// Deliver a report. Returns only after delivery succeeded or failed.
    async fn notify(&self, report: &Report) -> Result<(), NotifyError>;
}

/// Prints reports to standard output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn notify(&self, report: &Report) -> Result<(), NotifyError> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "\n{}\n", report.subject)?;
        stdout.write_all(report.body.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

/// Delivers to several channels in order.
///
/// Every channel is attempted even when an earlier one fails; the first
/// failure is returned.
pub struct MultiNotifier {
    channels: Vec<Box<dyn Notifier>>,
}

impl MultiNotifier {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    fn name(&self) -> &'static str {
        "multi"
    }

    async fn notify(&self, report: &Report) -> Result<(), NotifyError> {
        let mut first_error = None;

        for channel in &self.channels {
            match channel.notify(report).await {
                Ok(()) => info!(channel = channel.name(), "report delivered"),
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "report delivery failed");
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
