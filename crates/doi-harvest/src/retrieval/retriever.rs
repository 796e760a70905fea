//! The tiered document retriever.
//!
//! Tiers run strictly in order and the first success wins:
//!
//! 1. open-access lookup service (plain HTTP, no browser)
//! 2. landing page in a browser context, clicking download affordances
//! 3. document URLs observed in the page's own network traffic
//! 4. full-page screenshot as evidence
//!
//! Every tier failure is logged and turned into "try the next tier". The
//! browser context is closed whatever the outcome.

use super::affordance::{default_consent_affordances, default_pdf_affordances, Affordance};
use super::artifact::ArtifactStore;
use super::identifier::Identifier;
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::unpaywall::UnpaywallClient;
use crate::config::{HarvestConfig, Timeouts, DEFAULT_RESOLVER_BASE};
use crate::error::RetrievalError;
use crate::progress::{self, ProgressEventKind, ProgressSender, RetrievalTier};
use crate::renderer::{ContextOptions, RenderContext, Renderer};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Outcome of retrieving one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalStatus {
    /// A PDF was written.
    Success { path: PathBuf, tier: RetrievalTier },
    /// No PDF, but a screenshot of the landing page was written.
    PartialEvidence { screenshot: PathBuf },
    /// Nothing was written.
    Failure { reason: String },
}

impl RetrievalStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "downloaded",
            Self::PartialEvidence { .. } => "evidence",
            Self::Failure { .. } => "failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The artifact written, if any.
    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            Self::Success { path, .. } => Some(path),
            Self::PartialEvidence { screenshot } => Some(screenshot),
            Self::Failure { .. } => None,
        }
    }
}

/// Knobs of the retrieval procedure itself.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Canonical resolver, e.g. `https://doi.org`.
    pub resolver_base: String,
    /// Download affordances in priority order.
    pub affordances: Vec<Affordance>,
    /// Consent controls in priority order.
    pub consent_controls: Vec<Affordance>,
    /// Substring that marks a request URL as a document.
    pub document_marker: String,
    pub timeouts: Timeouts,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            resolver_base: DEFAULT_RESOLVER_BASE.to_string(),
            affordances: default_pdf_affordances(),
            consent_controls: default_consent_affordances(),
            document_marker: ".pdf".to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn from_harvest(config: &HarvestConfig) -> Self {
        Self {
            resolver_base: config.resolver_base.clone(),
            timeouts: config.timeouts,
            ..Self::default()
        }
    }
}

/// State carried through the tiers for one identifier.
struct RetrievalAttempt<'a> {
    identifier: &'a Identifier,
    /// Document URLs discovered so far, in discovery order.
    candidates: Vec<String>,
    success: bool,
    artifact: Option<PathBuf>,
    started: Instant,
    seq: u64,
}

impl<'a> RetrievalAttempt<'a> {
    fn new(identifier: &'a Identifier) -> Self {
        Self {
            identifier,
            candidates: Vec::new(),
            success: false,
            artifact: None,
            started: Instant::now(),
            seq: 0,
        }
    }

    fn emit(&mut self, tx: &Option<ProgressSender>, event: ProgressEventKind) {
        progress::emit(tx, self.identifier.as_str(), &mut self.seq, event);
    }

    fn discover(&mut self, urls: impl IntoIterator<Item = String>) {
        for url in urls {
            if !self.candidates.contains(&url) {
                self.candidates.push(url);
            }
        }
    }

    fn tier_failed(
        &mut self,
        tx: &Option<ProgressSender>,
        tier: RetrievalTier,
        err: &RetrievalError,
    ) {
        let reason = err.to_string();
        if let RetrievalError::Skipped(why) = err {
            debug!(identifier = %self.identifier, %tier, "tier skipped: {why}");
            self.emit(
                tx,
                ProgressEventKind::TierSkipped {
                    tier,
                    reason: why.clone(),
                },
            );
        } else {
            warn!(identifier = %self.identifier, %tier, "{reason}");
            self.emit(tx, ProgressEventKind::TierFailed { tier, reason });
        }
    }

    fn succeed(
        &mut self,
        tx: &Option<ProgressSender>,
        path: PathBuf,
        tier: RetrievalTier,
    ) -> RetrievalStatus {
        info!(identifier = %self.identifier, %tier, path = %path.display(), "downloaded PDF");
        self.success = true;
        self.artifact = Some(path.clone());
        self.emit(
            tx,
            ProgressEventKind::DocumentSaved {
                tier,
                path: path.display().to_string(),
            },
        );
        RetrievalStatus::Success { path, tier }
    }
}

/// Walks the tiers for one identifier at a time.
pub struct Retriever {
    config: RetrievalConfig,
    lookup: UnpaywallClient,
    http: HttpClient,
    renderer: Arc<dyn Renderer>,
    store: ArtifactStore,
    progress: Option<ProgressSender>,
}

impl Retriever {
    pub fn new(
        config: RetrievalConfig,
        lookup: UnpaywallClient,
        http: HttpClient,
        renderer: Arc<dyn Renderer>,
        store: ArtifactStore,
    ) -> Self {
        Self {
            config,
            lookup,
            http,
            renderer,
            store,
            progress: None,
        }
    }

    /// Build a retriever from the driver configuration.
    pub fn from_config(config: &HarvestConfig, renderer: Arc<dyn Renderer>) -> Self {
        let http = HttpClient::new(config.timeouts.fetch_ms);
        let lookup = UnpaywallClient::new(
            http.clone(),
            &config.lookup_base,
            config.contact_email.clone(),
            config.timeouts.lookup_ms,
        );
        let store = ArtifactStore::new(&config.pdf_dir, &config.screenshot_dir);
        Self::new(
            RetrievalConfig::from_harvest(config),
            lookup,
            http,
            renderer,
            store,
        )
    }

    /// Emit progress events on `tx`.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }

    /// Retrieve one identifier. Never fails: every problem is folded into the
    /// returned status.
    pub async fn retrieve(&self, identifier: &Identifier) -> RetrievalStatus {
        let mut attempt = RetrievalAttempt::new(identifier);
        info!(%identifier, "processing identifier");

        let status = self.run_tiers(&mut attempt).await;

        debug!(
            %identifier,
            candidates = ?attempt.candidates,
            success = attempt.success,
            artifact = ?attempt.artifact,
            "retrieval finished"
        );
        let elapsed_ms = attempt.started.elapsed().as_millis() as u64;
        attempt.emit(
            &self.progress,
            ProgressEventKind::RetrievalComplete {
                status: status.label().to_string(),
                elapsed_ms,
            },
        );
        status
    }

    async fn run_tiers(&self, attempt: &mut RetrievalAttempt<'_>) -> RetrievalStatus {
        let tx = &self.progress;

        // Tier 1: lookup service
        match self.try_lookup(attempt).await {
            Ok(path) => return attempt.succeed(tx, path, RetrievalTier::LookupService),
            Err(e) => attempt.tier_failed(tx, RetrievalTier::LookupService, &e),
        }

        // Tiers 2-4 share one browser context.
        let options = match self.context_options(attempt.identifier) {
            Ok(options) => options,
            Err(e) => {
                error!(identifier = %attempt.identifier, "cannot prepare download dir: {e}");
                return RetrievalStatus::Failure {
                    reason: format!("cannot prepare download dir: {e}"),
                };
            }
        };
        let mut context = match self.renderer.new_context(&options).await {
            Ok(context) => context,
            Err(e) => {
                warn!(identifier = %attempt.identifier, "browser unavailable: {e:#}");
                // A context that failed half-way may have created its download dir.
                self.store.clear_staging(attempt.identifier).await;
                attempt.emit(
                    tx,
                    ProgressEventKind::TierSkipped {
                        tier: RetrievalTier::PageLoad,
                        reason: format!("browser unavailable: {e:#}"),
                    },
                );
                return RetrievalStatus::Failure {
                    reason: format!("no lookup hit and browser unavailable: {e:#}"),
                };
            }
        };

        let status = self.browser_tiers(context.as_mut(), attempt).await;

        if let Err(e) = context.close().await {
            debug!(identifier = %attempt.identifier, "closing browser context failed: {e:#}");
            attempt.emit(
                tx,
                ProgressEventKind::Warning {
                    message: format!("closing browser context failed: {e:#}"),
                },
            );
        }
        self.store.clear_staging(attempt.identifier).await;
        status
    }

    fn context_options(&self, identifier: &Identifier) -> std::io::Result<ContextOptions> {
        let t = &self.config.timeouts;
        Ok(ContextOptions {
            download_dir: self.store.staging_dir(identifier)?,
            consent_controls: self.config.consent_controls.clone(),
            consent_visible_ms: t.consent_visible_ms,
            consent_settle_ms: t.consent_settle_ms,
            document_marker: self.config.document_marker.clone(),
        })
    }

    async fn try_lookup(&self, attempt: &mut RetrievalAttempt<'_>) -> Result<PathBuf, RetrievalError> {
        if !self.lookup.is_configured() {
            return Err(RetrievalError::Skipped(
                "no contact e-mail configured".to_string(),
            ));
        }
        attempt.emit(
            &self.progress,
            ProgressEventKind::TierStarted {
                tier: RetrievalTier::LookupService,
                message: "querying open-access lookup".to_string(),
            },
        );

        let url = self.lookup.find_pdf_url(attempt.identifier.as_str()).await?;
        info!(identifier = %attempt.identifier, %url, "found via open-access lookup");
        attempt.discover([url.clone()]);

        let doc = self
            .http
            .fetch_document(&url, None, self.config.timeouts.fetch_ms)
            .await?;
        self.store.write_document(attempt.identifier, &doc.body).await
    }

    async fn browser_tiers(
        &self,
        context: &mut dyn RenderContext,
        attempt: &mut RetrievalAttempt<'_>,
    ) -> RetrievalStatus {
        let tx = &self.progress;
        let t = &self.config.timeouts;
        let url = attempt.identifier.resolver_url(&self.config.resolver_base);

        // Tier 2: landing page
        attempt.emit(
            tx,
            ProgressEventKind::TierStarted {
                tier: RetrievalTier::PageLoad,
                message: format!("navigating to {url}"),
            },
        );
        let loaded = match context.navigate(&url, t.navigation_ms).await {
            Ok(nav) => {
                debug!(
                    identifier = %attempt.identifier,
                    final_url = %nav.final_url,
                    load_time_ms = nav.load_time_ms,
                    "landing page loaded"
                );
                if context.dismiss_consent().await {
                    attempt.emit(tx, ProgressEventKind::ConsentDismissed);
                }
                true
            }
            Err(e) => {
                let err = RetrievalError::PageLoad {
                    url: url.clone(),
                    reason: format!("{e:#}"),
                };
                attempt.tier_failed(tx, RetrievalTier::PageLoad, &err);
                false
            }
        };

        if loaded {
            match self.try_affordances(context, attempt).await {
                Ok(path) => return attempt.succeed(tx, path, RetrievalTier::PageLoad),
                Err(e) => attempt.tier_failed(tx, RetrievalTier::PageLoad, &e),
            }
        }

        // Tier 3: intercepted traffic. Runs even when navigation failed: a DOI
        // that resolves straight to a PDF aborts the navigation but still
        // shows up as a document request.
        match self.try_intercepted(context, attempt).await {
            Ok(path) => return attempt.succeed(tx, path, RetrievalTier::InterceptedTraffic),
            Err(e) => attempt.tier_failed(tx, RetrievalTier::InterceptedTraffic, &e),
        }

        // Tier 4: evidence
        self.capture_evidence(context, attempt).await
    }

    async fn try_affordances(
        &self,
        context: &mut dyn RenderContext,
        attempt: &mut RetrievalAttempt<'_>,
    ) -> Result<PathBuf, RetrievalError> {
        let t = &self.config.timeouts;
        let mut last_err = RetrievalError::ElementNotFound;

        for affordance in &self.config.affordances {
            match context
                .click_first_visible(affordance, t.affordance_visible_ms)
                .await
            {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!(%affordance, "click failed: {e:#}");
                    continue;
                }
            }
            info!(identifier = %attempt.identifier, %affordance, "found clickable PDF element");

            match context
                .wait_for_download(t.download_start_ms, t.download_complete_ms)
                .await
            {
                Ok(Some(file)) => {
                    attempt.discover([file.url.clone()]);
                    match self
                        .store
                        .adopt_download(attempt.identifier, &file.path, &file.url)
                        .await
                    {
                        Ok(path) => return Ok(path),
                        Err(e) => {
                            warn!(identifier = %attempt.identifier, %affordance, "{e}");
                            last_err = e;
                        }
                    }
                }
                Ok(None) => {
                    debug!(%affordance, "no download followed the click");
                    last_err = RetrievalError::DownloadNotTriggered {
                        affordance: affordance.to_string(),
                    };
                }
                Err(e) => {
                    debug!(%affordance, "download failed: {e:#}");
                    last_err = RetrievalError::DownloadNotTriggered {
                        affordance: affordance.to_string(),
                    };
                }
            }
        }

        Err(last_err)
    }

    async fn try_intercepted(
        &self,
        context: &mut dyn RenderContext,
        attempt: &mut RetrievalAttempt<'_>,
    ) -> Result<PathBuf, RetrievalError> {
        let mut urls = context.intercepted_urls();
        if urls.is_empty() {
            match context.embedded_viewer_sources().await {
                Ok(viewers) => urls = viewers,
                Err(e) => debug!("viewer scan failed: {e:#}"),
            }
        }
        attempt.discover(urls.iter().cloned());

        let Some(url) = urls.into_iter().next() else {
            return Err(RetrievalError::Skipped(
                "no document URL observed".to_string(),
            ));
        };
        attempt.emit(
            &self.progress,
            ProgressEventKind::TierStarted {
                tier: RetrievalTier::InterceptedTraffic,
                message: format!("fetching {url}"),
            },
        );

        let cookie = match context.cookie_header(&url).await {
            Ok(cookie) => cookie,
            Err(e) => {
                debug!("could not read cookies: {e:#}");
                attempt.emit(
                    &self.progress,
                    ProgressEventKind::Warning {
                        message: format!("fetching without cookies: {e:#}"),
                    },
                );
                None
            }
        };
        let doc = self
            .http
            .fetch_document(&url, cookie.as_deref(), self.config.timeouts.fetch_ms)
            .await?;
        self.store.write_document(attempt.identifier, &doc.body).await
    }

    async fn capture_evidence(
        &self,
        context: &mut dyn RenderContext,
        attempt: &mut RetrievalAttempt<'_>,
    ) -> RetrievalStatus {
        let tx = &self.progress;
        let page_url = match context.get_url().await {
            Ok(url) if !url.is_empty() => url,
            Ok(_) => "about:blank".to_string(),
            Err(e) => {
                debug!("could not read page URL: {e:#}");
                "unknown page".to_string()
            }
        };
        attempt.emit(
            tx,
            ProgressEventKind::TierStarted {
                tier: RetrievalTier::EvidenceCapture,
                message: format!("capturing full-page screenshot of {page_url}"),
            },
        );

        let shot = match self.store.prepare_evidence(attempt.identifier).await {
            Ok(path) => match context.screenshot(&path).await {
                Ok(()) => Ok(path),
                Err(e) => Err(RetrievalError::EvidenceCapture(format!("{e:#}"))),
            },
            Err(e) => Err(RetrievalError::EvidenceCapture(e.to_string())),
        };

        match shot {
            Ok(path) => {
                self.store.remove_stale_document(attempt.identifier).await;
                warn!(
                    identifier = %attempt.identifier,
                    path = %path.display(),
                    %page_url,
                    "PDF not found, screenshot saved"
                );
                attempt.artifact = Some(path.clone());
                attempt.emit(
                    tx,
                    ProgressEventKind::EvidenceSaved {
                        path: path.display().to_string(),
                    },
                );
                RetrievalStatus::PartialEvidence { screenshot: path }
            }
            Err(e) => {
                error!(identifier = %attempt.identifier, "{e}");
                attempt.emit(
                    tx,
                    ProgressEventKind::TierFailed {
                        tier: RetrievalTier::EvidenceCapture,
                        reason: e.to_string(),
                    },
                );
                RetrievalStatus::Failure {
                    reason: e.to_string(),
                }
            }
        }
    }
}
