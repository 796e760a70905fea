//! Scripted renderer for driving the retriever without a browser.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use doi_harvest::renderer::{
    ContextOptions, DownloadedFile, NavigationResult, RenderContext, Renderer,
};
use doi_harvest::retrieval::affordance::Affordance;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

/// What one landing page looks like.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    /// Navigation fails with this message.
    pub nav_error: Option<String>,
    /// Affordances with a visible match on the page.
    pub visible: Vec<Affordance>,
    /// Bytes the browser downloads after clicking an affordance. Visible
    /// affordances without an entry trigger no download.
    pub downloads: HashMap<Affordance, Vec<u8>>,
    /// Document requests the page issued.
    pub intercepted: Vec<String>,
    /// Embedded viewer sources.
    pub viewer_sources: Vec<String>,
    pub consent_banner: bool,
    pub screenshot_fails: bool,
    /// The cookie store cannot be read.
    pub cookie_error: bool,
}

impl FakePage {
    pub fn with_download(mut self, affordance: Affordance, bytes: &[u8]) -> Self {
        self.visible.push(affordance.clone());
        self.downloads.insert(affordance, bytes.to_vec());
        self
    }
}

/// Everything the fake saw.
#[derive(Debug, Default)]
pub struct FakeLog {
    pub contexts_created: usize,
    pub contexts_closed: usize,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub cookie_requests: Vec<String>,
    pub screenshots: Vec<PathBuf>,
}

/// Renderer serving `FakePage`s keyed by navigation URL.
#[derive(Clone, Default)]
pub struct FakeRenderer {
    pages: HashMap<String, FakePage>,
    fallback: FakePage,
    /// `new_context` creates the download dir, then fails.
    fail_context: bool,
    pub log: Arc<Mutex<FakeLog>>,
}

impl FakeRenderer {
    /// Every URL serves `page`.
    pub fn new(page: FakePage) -> Self {
        Self {
            fallback: page,
            ..Self::default()
        }
    }

    pub fn with_page(mut self, url: &str, page: FakePage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Every context fails to start after touching its download dir.
    pub fn failing_startup() -> Self {
        Self {
            fail_context: true,
            ..Self::default()
        }
    }

    pub fn created(&self) -> usize {
        self.log.lock().unwrap().contexts_created
    }

    pub fn closed(&self) -> usize {
        self.log.lock().unwrap().contexts_closed
    }

    pub fn clicks(&self) -> Vec<String> {
        self.log.lock().unwrap().clicks.clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        if self.fail_context {
            std::fs::create_dir_all(&options.download_dir)?;
            bail!("browser crashed during startup");
        }
        self.log.lock().unwrap().contexts_created += 1;
        Ok(Box::new(FakeContext {
            pages: self.pages.clone(),
            page: self.fallback.clone(),
            url: "about:blank".to_string(),
            download_dir: options.download_dir.clone(),
            pending: None,
            downloads: 0,
            log: Arc::clone(&self.log),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        let log = self.log.lock().unwrap();
        log.contexts_created - log.contexts_closed
    }
}

pub struct FakeContext {
    pages: HashMap<String, FakePage>,
    page: FakePage,
    url: String,
    download_dir: PathBuf,
    pending: Option<(String, Vec<u8>)>,
    downloads: usize,
    log: Arc<Mutex<FakeLog>>,
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.log.lock().unwrap().navigations.push(url.to_string());
        if let Some(page) = self.pages.get(url) {
            self.page = page.clone();
        }
        self.url = url.to_string();
        if let Some(reason) = &self.page.nav_error {
            bail!("{reason}");
        }
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        // Only the viewer scan runs scripts through here.
        Ok(serde_json::json!(self.page.viewer_sources))
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn dismiss_consent(&self) -> bool {
        self.page.consent_banner
    }

    async fn click_first_visible(&mut self, affordance: &Affordance, _timeout_ms: u64) -> Result<bool> {
        self.pending = None;
        if !self.page.visible.contains(affordance) {
            return Ok(false);
        }
        self.log.lock().unwrap().clicks.push(affordance.to_string());
        self.pending = self
            .page
            .downloads
            .get(affordance)
            .map(|bytes| (format!("{}/download/{}", self.url, self.downloads), bytes.clone()));
        Ok(true)
    }

    async fn wait_for_download(
        &mut self,
        _start_timeout_ms: u64,
        _complete_timeout_ms: u64,
    ) -> Result<Option<DownloadedFile>> {
        let Some((url, bytes)) = self.pending.take() else {
            return Ok(None);
        };
        self.downloads += 1;
        std::fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(format!("guid-{}", self.downloads));
        std::fs::write(&path, bytes)?;
        Ok(Some(DownloadedFile {
            path,
            url,
            suggested_filename: "article.pdf".to_string(),
        }))
    }

    fn intercepted_urls(&self) -> Vec<String> {
        self.page.intercepted.clone()
    }

    async fn cookie_header(&self, url: &str) -> Result<Option<String>> {
        self.log.lock().unwrap().cookie_requests.push(url.to_string());
        if self.page.cookie_error {
            bail!("cookie store unavailable");
        }
        Ok(Some("session=abc123".to_string()))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        if self.page.screenshot_fails {
            bail!("page crashed");
        }
        std::fs::write(path, PNG_BYTES)?;
        self.log.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().contexts_closed += 1;
        Ok(())
    }
}
