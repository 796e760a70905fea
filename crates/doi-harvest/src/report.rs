//! JSONL run report: one line per processed identifier.
//!
//! Append-only, so several runs can share one report file.

use crate::retrieval::RetrievalStatus;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// A single report line.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub timestamp: String,
    pub identifier: String,
    pub status: String,
    pub tier: Option<String>,
    pub path: Option<String>,
    pub reason: Option<String>,
    pub duration_ms: u64,
}

impl ReportEntry {
    pub fn from_status(identifier: &str, status: &RetrievalStatus, duration_ms: u64) -> Self {
        let (tier, reason) = match status {
            RetrievalStatus::Success { tier, .. } => (Some(tier.to_string()), None),
            RetrievalStatus::PartialEvidence { .. } => (None, None),
            RetrievalStatus::Failure { reason } => (None, Some(reason.clone())),
        };
        Self {
            timestamp: Utc::now().to_rfc3339(),
            identifier: identifier.to_string(),
            status: status.label().to_string(),
            tier,
            path: status.artifact().map(|p| p.display().to_string()),
            reason,
            duration_ms,
        }
    }
}

/// Append-only JSONL writer.
pub struct RunReport {
    file: File,
    path: PathBuf,
}

impl RunReport {
    /// Open or create the report file, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open run report: {}", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&mut self, entry: &ReportEntry) -> Result<()> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }

    /// Record the outcome of one identifier.
    pub fn record_status(
        &mut self,
        identifier: &str,
        status: &RetrievalStatus,
        duration_ms: u64,
    ) -> Result<()> {
        self.record(&ReportEntry::from_status(identifier, status, duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RetrievalTier;
    use tempfile::TempDir;

    #[test]
    fn test_report_appends_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("logs/run.jsonl");

        let mut report = RunReport::open(&path).unwrap();
        report
            .record_status(
                "10.1186/s13059-023-02908-x",
                &RetrievalStatus::Success {
                    path: PathBuf::from("pdfs/10.1186_s13059-023-02908-x.pdf"),
                    tier: RetrievalTier::LookupService,
                },
                812,
            )
            .unwrap();
        drop(report);

        let mut report = RunReport::open(&path).unwrap();
        report
            .record_status(
                "10.1111/pce.14906",
                &RetrievalStatus::Failure {
                    reason: "no tier produced an artifact".to_string(),
                },
                40,
            )
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["status"], "downloaded");
        assert_eq!(lines[0]["tier"], "Lookup");
        assert_eq!(lines[0]["duration_ms"], 812);
        assert_eq!(lines[1]["status"], "failed");
        assert!(lines[1]["path"].is_null());
        assert_eq!(lines[1]["reason"], "no tier produced an artifact");
    }

    #[test]
    fn test_evidence_entry_points_at_screenshot() {
        let entry = ReportEntry::from_status(
            "10.1104/pp.18.01482",
            &RetrievalStatus::PartialEvidence {
                screenshot: PathBuf::from("screenshots/10.1104_pp.18.01482.png"),
            },
            5,
        );
        assert_eq!(entry.status, "evidence");
        assert_eq!(
            entry.path.as_deref(),
            Some("screenshots/10.1104_pp.18.01482.png")
        );
        assert!(entry.tier.is_none());
    }
}
