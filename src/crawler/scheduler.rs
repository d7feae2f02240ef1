//! Run scheduler: repeats crawl + export on a fixed interval
//!
//! Cycles are independent. Nothing carries over from one to the next, and no
//! failure inside a cycle stops the schedule.

use crate::clock::Clock;
use crate::crawler::coordinator::{Coordinator, Termination};
use crate::crawler::fetcher::PageFetcher;
use crate::export::{BatchExporter, ExportArtifact, ObjectStore};
use crate::ExportError;
use std::sync::Arc;
use std::time::Duration;

/// What happened to a cycle's batch
#[derive(Debug)]
pub enum ExportStatus {
    Uploaded(ExportArtifact),

    /// The batch was empty, so nothing was written or uploaded
    NothingToExport,

    Failed(ExportError),
}

/// Per-cycle progress report
#[derive(Debug)]
pub struct CycleSummary {
    pub cycle: u64,
    pub records: usize,
    pub pages_fetched: u32,
    pub items_skipped: usize,
    pub termination: Termination,
    pub export: ExportStatus,
}

/// Drives the crawl → export cycle forever (or a bounded number of times)
pub struct RunScheduler<F, S> {
    coordinator: Coordinator<F>,
    exporter: BatchExporter<S>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl<F: PageFetcher, S: ObjectStore> RunScheduler<F, S> {
    pub fn new(
        coordinator: Coordinator<F>,
        exporter: BatchExporter<S>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            coordinator,
            exporter,
            clock,
            interval,
        }
    }

    /// Runs one crawl cycle followed by its export
    pub async fn run_cycle(&self, cycle: u64) -> CycleSummary {
        tracing::info!("Starting crawl cycle {}", cycle);

        let report = self.coordinator.run_cycle().await;
        let records = report.batch.len();

        let export = match self.exporter.export(&report.batch).await {
            Ok(artifact) => ExportStatus::Uploaded(artifact),
            Err(ExportError::EmptyBatch) => {
                tracing::info!("Cycle {} collected no records, skipping export", cycle);
                ExportStatus::NothingToExport
            }
            Err(e) => {
                tracing::error!("Export failed for cycle {}: {}", cycle, e);
                ExportStatus::Failed(e)
            }
        };

        tracing::info!(
            "Cycle {} finished ({}): {} records, {} pages, {} items skipped",
            cycle,
            report.termination,
            records,
            report.pages_fetched,
            report.items_skipped
        );

        CycleSummary {
            cycle,
            records,
            pages_fetched: report.pages_fetched,
            items_skipped: report.items_skipped,
            termination: report.termination,
            export,
        }
    }

    /// Runs cycles back to back, sleeping `interval` between them
    ///
    /// With `max_cycles = None` this never returns; the process is expected to
    /// be stopped externally. Returns the number of cycles completed.
    pub async fn run(&self, max_cycles: Option<u64>) -> u64 {
        let mut cycle = 0;

        loop {
            cycle += 1;
            self.run_cycle(cycle).await;

            if max_cycles.is_some_and(|max| cycle >= max) {
                return cycle;
            }

            tracing::info!("Next cycle in {}s", self.interval.as_secs());
            self.clock.sleep(self.interval).await;
        }
    }
}
