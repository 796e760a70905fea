//! Error taxonomy for the retrieval tiers.
//!
//! Every variant is recoverable: a tier that fails with one of these hands
//! control to the next tier. Only [`RetrievalError::EvidenceCapture`] ends an
//! identifier without any artifact.

/// A failure scoped to one tier of one identifier.
#[derive(thiserror::Error, Debug)]
pub enum RetrievalError {
    /// Timeout, connection failure, or a status other than the expected one.
    #[error("network error for {url}: {reason}")]
    Network { url: String, reason: String },

    /// A response arrived but was not a PDF.
    #[error("expected a PDF from {url}, got {found}")]
    ContentMismatch { url: String, found: String },

    /// No affordance in the priority list was visible.
    #[error("no download affordance was visible")]
    ElementNotFound,

    /// An affordance was clicked but no download followed.
    #[error("clicking {affordance} did not trigger a download")]
    DownloadNotTriggered { affordance: String },

    /// The landing page could not be loaded at all.
    #[error("failed to load {url}: {reason}")]
    PageLoad { url: String, reason: String },

    /// The tier was not attempted (missing configuration, no candidates).
    #[error("skipped: {0}")]
    Skipped(String),

    /// Not even a screenshot could be taken.
    #[error("evidence capture failed: {0}")]
    EvidenceCapture(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    /// Wrap a reqwest failure for `url`.
    pub fn network(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Network {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
