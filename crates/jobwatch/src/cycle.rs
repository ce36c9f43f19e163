//! One monitoring cycle: fetch, extract, diff, notify, persist.
//!
//! Every step is a failure boundary. A failed cycle never writes the
//! snapshot, so the next cycle starts again from the last reported state.

use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info};

use jobwatch_listings::{Extractor, Fetcher, ListingsError, SnapshotStore, diff};
use jobwatch_notify::{Notifier, NotifyError, Report, ReportContext};

/// The step a cycle failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStep {
    Fetch,
    Extract,
    Load,
    Notify,
    Persist,
}

impl fmt::Display for CycleStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::Load => "load",
            Self::Notify => "notify",
            Self::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A failed cycle, by step.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] ListingsError),

    #[error("could not extract postings: {0}")]
    Extract(#[source] ListingsError),

    #[error("could not load snapshot: {0}")]
    Load(#[source] ListingsError),

    #[error("notification failed: {0}")]
    Notify(#[source] NotifyError),

    #[error("could not save snapshot: {0}")]
    Persist(#[source] ListingsError),
}

impl CycleError {
    pub fn step(&self) -> CycleStep {
        match self {
            Self::Fetch(_) => CycleStep::Fetch,
            Self::Extract(_) => CycleStep::Extract,
            Self::Load(_) => CycleStep::Load,
            Self::Notify(_) => CycleStep::Notify,
            Self::Persist(_) => CycleStep::Persist,
        }
    }
}

/// Counts from a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub current: usize,
    pub new: usize,
    pub removed: usize,
    pub persisted: bool,
}

/// Runs cycles against one careers source.
pub struct Monitor {
    fetcher: Box<dyn Fetcher>,
    extractor: Extractor,
    store: SnapshotStore,
    notifier: Box<dyn Notifier>,
    context: ReportContext,
    dry_run: bool,
}

impl Monitor {
    pub fn new(
        fetcher: Box<dyn Fetcher>,
        extractor: Extractor,
        store: SnapshotStore,
        notifier: Box<dyn Notifier>,
        context: ReportContext,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            store,
            notifier,
            context,
            dry_run: false,
        }
    }

    /// Report as usual but never write the snapshot.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Execute exactly one cycle.
    #[tracing::instrument(skip(self), fields(url = %self.extractor.source_url()))]
    pub async fn run_once(&self) -> Result<CycleSummary, CycleError> {
        let content = self
            .fetcher
            .fetch(self.extractor.source_url())
            .await
            .map_err(CycleError::Fetch)?;

        let current = self
            .extractor
            .extract(&content)
            .map_err(CycleError::Extract)?;

        let previous = self.store.load().map_err(CycleError::Load)?;
        let result = diff(&previous, current);

        info!(
            current = result.current.len(),
            new = result.new.len(),
            removed = result.removed.len(),
            "compared with last snapshot"
        );

        let report = Report::render(&result, &self.context, Utc::now());
        self.notifier
            .notify(&report)
            .await
            .map_err(CycleError::Notify)?;

        let mut summary = CycleSummary {
            current: result.current.len(),
            new: result.new.len(),
            removed: result.removed.len(),
            persisted: false,
        };

        if self.dry_run {
            info!("dry run, snapshot left unchanged");
            return Ok(summary);
        }

        self.store
            .save(&result.next_snapshot())
            .map_err(CycleError::Persist)?;
        summary.persisted = true;

        Ok(summary)
    }

    /// Run one cycle and log the outcome. Returns whether it succeeded.
    pub async fn run_logged(&self) -> bool {
        match self.run_once().await {
            Ok(summary) => {
                info!(
                    current = summary.current,
                    new = summary.new,
                    persisted = summary.persisted,
                    "cycle complete"
                );
                true
            }
            Err(e) => {
                error!(step = %e.step(), error = %e, "cycle failed, snapshot unchanged");
                false
            }
        }
    }
}
