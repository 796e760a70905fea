// Copyright 2026 doi-harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress event types and broadcast channel for per-tier retrieval telemetry.
//!
//! The retriever emits `ProgressEvent`s while it walks the tiers for an
//! identifier. They flow through a `tokio::sync::broadcast` channel to every
//! subscriber (the CLI printer, tests). When no subscriber exists, events are
//! silently dropped.

use serde::{Deserialize, Serialize};

/// A progress event emitted while retrieving one identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// The identifier this event belongs to.
    pub request_id: String,
    /// Monotonically increasing sequence number within the identifier.
    pub seq: u64,
    /// The kind of progress event.
    pub event: ProgressEventKind,
}

/// The specific kind of progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEventKind {
    /// A tier has started.
    TierStarted { tier: RetrievalTier, message: String },
    /// A tier failed; the retriever moves on.
    TierFailed { tier: RetrievalTier, reason: String },
    /// A tier was not attempted.
    TierSkipped { tier: RetrievalTier, reason: String },
    /// A cookie-consent overlay was dismissed.
    ConsentDismissed,
    /// A document was written.
    DocumentSaved { tier: RetrievalTier, path: String },
    /// Every tier failed and a screenshot was written instead.
    EvidenceSaved { path: String },
    /// Retrieval of the identifier finished.
    RetrievalComplete {
        status: String,
        elapsed_ms: u64,
    },
    /// A non-fatal warning occurred.
    Warning { message: String },
}

/// Identifies which retrieval tier is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetrievalTier {
    /// Tier 1: open-access lookup service.
    LookupService,
    /// Tier 2: landing page + download affordances.
    PageLoad,
    /// Tier 3: document URLs observed in network traffic.
    InterceptedTraffic,
    /// Tier 4: full-page screenshot.
    EvidenceCapture,
}

impl std::fmt::Display for RetrievalTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LookupService => write!(f, "Lookup"),
            Self::PageLoad => write!(f, "Landing Page"),
            Self::InterceptedTraffic => write!(f, "Intercepted"),
            Self::EvidenceCapture => write!(f, "Evidence"),
        }
    }
}

/// Sender handle for emitting progress events.
pub type ProgressSender = tokio::sync::broadcast::Sender<ProgressEvent>;

/// Receiver handle for consuming progress events.
pub type ProgressReceiver = tokio::sync::broadcast::Receiver<ProgressEvent>;

/// Create a new progress broadcast channel with a bounded buffer.
///
/// One identifier produces at most a dozen events, so 256 leaves plenty of
/// room for a slow printer.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emit a progress event, silently ignoring send errors
/// (which occur when no receivers are listening).
pub fn emit(
    tx: &Option<ProgressSender>,
    request_id: &str,
    seq: &mut u64,
    event: ProgressEventKind,
) {
    if let Some(ref sender) = tx {
        *seq += 1;
        let _ = sender.send(ProgressEvent {
            request_id: request_id.to_string(),
            seq: *seq,
            event,
        });
    }
}

/// Render an event as a single human-readable line.
pub fn describe(event: &ProgressEvent) -> String {
    let id = &event.request_id;
    match &event.event {
        ProgressEventKind::TierStarted { tier, message } => format!("[{id}] {tier}: {message}"),
        ProgressEventKind::TierFailed { tier, reason } => {
            format!("[{id}] {tier} failed: {reason}")
        }
        ProgressEventKind::TierSkipped { tier, reason } => {
            format!("[{id}] {tier} skipped: {reason}")
        }
        ProgressEventKind::ConsentDismissed => format!("[{id}] accepted cookie banner"),
        ProgressEventKind::DocumentSaved { tier, path } => {
            format!("[{id}] saved PDF via {tier} to {path}")
        }
        ProgressEventKind::EvidenceSaved { path } => {
            format!("[{id}] PDF not found, screenshot saved to {path}")
        }
        ProgressEventKind::RetrievalComplete { status, elapsed_ms } => {
            format!("[{id}] {status} in {elapsed_ms}ms")
        }
        ProgressEventKind::Warning { message } => format!("[{id}] warning: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_event_serialization() {
        let event = ProgressEvent {
            request_id: "10.1111/pce.14906".to_string(),
            seq: 1,
            event: ProgressEventKind::TierStarted {
                tier: RetrievalTier::LookupService,
                message: "querying open-access lookup".to_string(),
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("LookupService"));
        assert!(json.contains("TierStarted"));

        let parsed: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, "10.1111/pce.14906");
        assert_eq!(parsed.seq, 1);
    }

    #[test]
    fn test_channel_no_receivers() {
        let (tx, rx) = channel();
        drop(rx);
        let mut seq = 0;
        emit(
            &Some(tx),
            "test",
            &mut seq,
            ProgressEventKind::Warning {
                message: "test".to_string(),
            },
        );
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_emit_none_sender() {
        let mut seq = 0;
        emit(&None, "test", &mut seq, ProgressEventKind::ConsentDismissed);
        assert_eq!(seq, 0);
    }

    #[test]
    fn test_describe_evidence() {
        let event = ProgressEvent {
            request_id: "10.1104/pp.18.01482".to_string(),
            seq: 7,
            event: ProgressEventKind::EvidenceSaved {
                path: "screenshots/10.1104_pp.18.01482.png".to_string(),
            },
        };
        assert_eq!(
            describe(&event),
            "[10.1104/pp.18.01482] PDF not found, screenshot saved to screenshots/10.1104_pp.18.01482.png"
        );
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(RetrievalTier::LookupService.to_string(), "Lookup");
        assert_eq!(RetrievalTier::InterceptedTraffic.to_string(), "Intercepted");
    }
}
