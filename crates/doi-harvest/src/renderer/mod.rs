//! Renderer abstraction for browser-based page retrieval.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). The tiered
//! retriever only talks to these traits, so its ordering rules can be
//! exercised against a scripted fake.

pub mod chromium;
pub mod scripts;

use crate::retrieval::affordance::Affordance;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A file the browser finished downloading.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Where the browser wrote it (inside the context's download directory).
    pub path: PathBuf,
    /// URL the download came from.
    pub url: String,
    /// File name the server suggested.
    pub suggested_filename: String,
}

/// Per-context settings. Everything scoped to one identifier.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Absolute directory the browser writes downloads to.
    pub download_dir: PathBuf,
    /// Consent controls, in priority order, clicked on every load and
    /// navigation event.
    pub consent_controls: Vec<Affordance>,
    pub consent_visible_ms: u64,
    pub consent_settle_ms: u64,
    /// Substring marking a top-level request as a document URL (`.pdf`).
    pub document_marker: String,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new isolated browser context with one page.
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (one page) for one identifier.
///
/// Request interception and consent dismissal start when the context is
/// created and stop when it is closed or dropped.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the main frame and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Click the first visible consent control, if any. Never fails.
    async fn dismiss_consent(&self) -> bool;
    /// Wait up to `timeout_ms` for the first visible element matching
    /// `affordance` in any frame and click it. `Ok(false)` when none showed up.
    /// Download events from before the click are discarded.
    async fn click_first_visible(
        &mut self,
        affordance: &Affordance,
        timeout_ms: u64,
    ) -> Result<bool>;
    /// Wait for a download to begin within `start_timeout_ms`, then for it to
    /// finish within `complete_timeout_ms`. `Ok(None)` when nothing started
    /// or the download was cancelled.
    async fn wait_for_download(
        &mut self,
        start_timeout_ms: u64,
        complete_timeout_ms: u64,
    ) -> Result<Option<DownloadedFile>>;
    /// Top-level document URLs containing the document marker, in the order
    /// they were requested.
    fn intercepted_urls(&self) -> Vec<String>;
    /// `Cookie` header value the context would send to `url`.
    async fn cookie_header(&self, url: &str) -> Result<Option<String>>;
    /// Save a full-page PNG screenshot.
    async fn screenshot(&self, path: &Path) -> Result<()>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;

    /// Source URLs of embedded PDF viewers, in document order.
    async fn embedded_viewer_sources(&self) -> Result<Vec<String>> {
        let value = self.execute_js(&scripts::viewer_sources_script()).await?;
        Ok(value
            .as_array()
            .map(|urls| {
                urls.iter()
                    .filter_map(|u| u.as_str())
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// A no-op renderer used when the browser tiers are disabled or Chromium
/// is unavailable.
///
/// The lookup tier works without a browser. This stub makes the browser
/// tiers fail fast, so an identifier without an open-access copy ends as a
/// plain failure.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self, _options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available (lookup-only mode)"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
