//! Sequential batch driver.

use super::identifier::Identifier;
use super::retriever::{RetrievalStatus, Retriever};
use crate::report::RunReport;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one identifier within a batch.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub identifier: String,
    #[serde(flatten)]
    pub status: RetrievalStatus,
    pub duration_ms: u64,
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub downloaded: usize,
    pub evidence: usize,
    pub failed: usize,
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchSummary {
    fn push(&mut self, outcome: BatchOutcome) {
        self.total += 1;
        match outcome.status {
            RetrievalStatus::Success { .. } => self.downloaded += 1,
            RetrievalStatus::PartialEvidence { .. } => self.evidence += 1,
            RetrievalStatus::Failure { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

/// Retrieve every identifier in order, one at a time, sleeping `delay`
/// between identifiers. A failing identifier never stops the batch.
pub async fn run_batch(
    retriever: &Retriever,
    identifiers: &[Identifier],
    delay: Duration,
    mut report: Option<&mut RunReport>,
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for (i, identifier) in identifiers.iter().enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let started = Instant::now();
        let status = retriever.retrieve(identifier).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if let Some(report) = report.as_deref_mut() {
            if let Err(e) = report.record_status(identifier.as_str(), &status, duration_ms) {
                warn!(path = %report.path().display(), "failed to write run report: {e:#}");
            }
        }

        summary.push(BatchOutcome {
            identifier: identifier.to_string(),
            status,
            duration_ms,
        });
    }

    info!(
        total = summary.total,
        downloaded = summary.downloaded,
        evidence = summary.evidence,
        failed = summary.failed,
        "batch complete"
    );
    summary
}
