//! Chromium-based renderer using chromiumoxide.
//!
//! One browser process serves the whole batch. Every identifier gets its own
//! incognito browser context with a single page; the context's listeners
//! (downloads, intercepted requests, consent dismissal) live in spawned
//! tasks that are aborted when the context goes away.

use super::{scripts, ContextOptions, DownloadedFile, NavigationResult, RenderContext, Renderer};
use crate::acquisition::http_client::USER_AGENT;
use crate::config::ENV_CHROMIUM_PATH;
use crate::retrieval::affordance::Affordance;
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    BrowserContextId, CloseParams, DownloadProgressState, EventDownloadProgress,
    EventDownloadWillBegin, SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, GetCookiesParams, ResourceType,
};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CreateIsolatedWorldParams, EventFrameNavigated, EventLoadEventFired,
    FrameId, FrameTree, GetFrameTreeParams,
};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::{FutureExt, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Delay between visibility checks.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Name of the isolated world our scripts run in.
const WORLD_NAME: &str = "doi-harvest";

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Explicit flag
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    // 2. DOI_HARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(ENV_CHROMIUM_PATH) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in [
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Browsers installed by Playwright
    if let Some(found) = find_playwright_chromium() {
        return Some(found);
    }

    // 5. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Look through `<cache>/ms-playwright/chromium-*` for a runnable binary.
fn find_playwright_chromium() -> Option<PathBuf> {
    let root = dirs::cache_dir()?.join("ms-playwright");
    let mut installs: Vec<PathBuf> = std::fs::read_dir(&root)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("chromium-"))
        })
        .collect();
    // Newest revision first.
    installs.sort();
    installs.reverse();

    let relative: &[&str] = if cfg!(target_os = "macos") {
        &["chrome-mac/Chromium.app/Contents/MacOS/Chromium"]
    } else {
        &["chrome-linux/chrome", "chrome-linux64/chrome"]
    };
    installs
        .iter()
        .flat_map(|dir| relative.iter().map(move |r| dir.join(r)))
        .find(|candidate| candidate.exists())
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance (headless unless `headless` is false).
    pub async fn launch(chromium_path: Option<&Path>, headless: bool) -> Result<Self> {
        let chrome_path = find_chromium(chromium_path).with_context(|| {
            format!("Chromium not found. Install Chrome or set {ENV_CHROMIUM_PATH}.")
        })?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        builder = if headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        let config = builder
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler_task,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }

    async fn open_page(
        &self,
        context_id: &BrowserContextId,
        options: &ContextOptions,
    ) -> Result<ChromiumContext> {
        tokio::fs::create_dir_all(&options.download_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to create download dir {}",
                    options.download_dir.display()
                )
            })?;

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .browser_context_id(context_id.clone())
            .download_path(options.download_dir.to_string_lossy().to_string())
            .events_enabled(true)
            .build()
            .map_err(|e| anyhow!("invalid download behavior: {e}"))?;
        self.browser
            .execute(behavior)
            .await
            .context("failed to enable downloads")?;

        let download_began = self
            .browser
            .event_listener::<EventDownloadWillBegin>()
            .await?;
        let download_progress = self
            .browser
            .event_listener::<EventDownloadProgress>()
            .await?;

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(|e| anyhow!("invalid target params: {e}"))?;
        let page = self
            .browser
            .new_page(target)
            .await
            .context("failed to create new page")?;

        // Observers must exist before the first navigation.
        let requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let loads = page.event_listener::<EventLoadEventFired>().await?;
        let navigations = page.event_listener::<EventFrameNavigated>().await?;

        let consent = ConsentSettings {
            controls: options.consent_controls.clone(),
            visible_ms: options.consent_visible_ms,
            settle_ms: options.consent_settle_ms,
        };
        let intercepted = Arc::new(Mutex::new(Vec::new()));
        let (download_tx, download_rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::with_capacity(3);

        let sink = Arc::clone(&intercepted);
        let marker = options.document_marker.clone();
        tasks.push(tokio::spawn(async move {
            let mut requests = requests;
            while let Some(event) = requests.next().await {
                if event.r#type != Some(ResourceType::Document)
                    || !event.request.url.contains(&marker)
                {
                    continue;
                }
                if let Ok(mut urls) = sink.lock() {
                    if !urls.contains(&event.request.url) {
                        tracing::debug!(url = %event.request.url, "intercepted document request");
                        urls.push(event.request.url.clone());
                    }
                }
            }
        }));

        tasks.push(tokio::spawn(async move {
            let began = download_began.map(|e| DownloadEvent::Began {
                guid: e.guid.clone(),
                url: e.url.clone(),
                suggested_filename: e.suggested_filename.clone(),
            });
            let finished = download_progress.filter_map(|e| async move {
                match e.state {
                    DownloadProgressState::Completed => Some(DownloadEvent::Finished {
                        guid: e.guid.clone(),
                        completed: true,
                    }),
                    DownloadProgressState::Canceled => Some(DownloadEvent::Finished {
                        guid: e.guid.clone(),
                        completed: false,
                    }),
                    _ => None,
                }
            });
            let mut merged = Box::pin(futures::stream::select(began, finished));
            while let Some(event) = merged.next().await {
                if download_tx.send(event).is_err() {
                    break;
                }
            }
        }));

        let consent_page = page.clone();
        let consent_settings = consent.clone();
        tasks.push(tokio::spawn(async move {
            let lifecycle = futures::stream::select(loads.map(|_| ()), navigations.map(|_| ()));
            let mut lifecycle = Box::pin(lifecycle);
            while lifecycle.next().await.is_some() {
                dismiss_consent_on(&consent_page, &consent_settings).await;
                // Coalesce the burst of frame events that arrived meanwhile.
                while let Some(Some(())) = lifecycle.next().now_or_never() {}
            }
        }));

        Ok(ChromiumContext {
            browser: Arc::clone(&self.browser),
            browser_context_id: context_id.clone(),
            page,
            download_dir: options.download_dir.clone(),
            downloads: download_rx,
            intercepted,
            consent,
            tasks,
            active_count: Arc::clone(&self.active_count),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, options: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .context("failed to create browser context")?
            .result
            .browser_context_id;

        match self.open_page(&context_id, options).await {
            Ok(context) => {
                self.active_count.fetch_add(1, Ordering::Relaxed);
                Ok(Box::new(context))
            }
            Err(e) => {
                let _ = self
                    .browser
                    .execute(DisposeBrowserContextParams::new(context_id))
                    .await;
                Err(e)
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        // The browser stops answering once it closes, so the reply may never come.
        let _ = tokio::time::timeout(
            Duration::from_secs(5),
            self.browser.execute(CloseParams::default()),
        )
        .await;
        self.handler_task.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// Download lifecycle as seen by one context.
#[derive(Debug)]
enum DownloadEvent {
    Began {
        guid: String,
        url: String,
        suggested_filename: String,
    },
    Finished {
        guid: String,
        completed: bool,
    },
}

#[derive(Debug, Clone)]
struct ConsentSettings {
    controls: Vec<Affordance>,
    visible_ms: u64,
    settle_ms: u64,
}

/// A single Chromium page in its own browser context.
pub struct ChromiumContext {
    browser: Arc<Browser>,
    browser_context_id: BrowserContextId,
    page: Page,
    download_dir: PathBuf,
    downloads: mpsc::UnboundedReceiver<DownloadEvent>,
    intercepted: Arc<Mutex<Vec<String>>>,
    consent: ConsentSettings,
    tasks: Vec<JoinHandle<()>>,
    active_count: Arc<AtomicUsize>,
}

impl Drop for ChromiumContext {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
        self.active_count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_)) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!("navigation timed out after {timeout_ms}ms"),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn dismiss_consent(&self) -> bool {
        dismiss_consent_on(&self.page, &self.consent).await
    }

    async fn click_first_visible(
        &mut self,
        affordance: &Affordance,
        timeout_ms: u64,
    ) -> Result<bool> {
        while self.downloads.try_recv().is_ok() {}

        let script = scripts::click_first_visible_script(affordance);
        let hit = poll_frames(&self.page, &script, timeout_ms, |v| v.as_bool() == Some(true))
            .await?;
        Ok(hit.is_some())
    }

    async fn wait_for_download(
        &mut self,
        start_timeout_ms: u64,
        complete_timeout_ms: u64,
    ) -> Result<Option<DownloadedFile>> {
        let downloads = &mut self.downloads;

        let began = tokio::time::timeout(Duration::from_millis(start_timeout_ms), async {
            while let Some(event) = downloads.recv().await {
                if let DownloadEvent::Began {
                    guid,
                    url,
                    suggested_filename,
                } = event
                {
                    return Some((guid, url, suggested_filename));
                }
            }
            None
        })
        .await;

        let (guid, url, suggested_filename) = match began {
            Ok(Some(began)) => began,
            Ok(None) => bail!("download listener stopped"),
            Err(_) => return Ok(None),
        };
        tracing::debug!(%url, %guid, "download started");

        let finished = tokio::time::timeout(Duration::from_millis(complete_timeout_ms), async {
            while let Some(event) = downloads.recv().await {
                if let DownloadEvent::Finished {
                    guid: done,
                    completed,
                } = event
                {
                    if done == guid {
                        return Some(completed);
                    }
                }
            }
            None
        })
        .await;

        match finished {
            Ok(Some(true)) => Ok(Some(DownloadedFile {
                // AllowAndName stores downloads under their GUID.
                path: self.download_dir.join(&guid),
                url,
                suggested_filename,
            })),
            Ok(Some(false)) => {
                tracing::debug!(%url, "download was cancelled");
                Ok(None)
            }
            Ok(None) => bail!("download listener stopped"),
            Err(_) => bail!("download of {url} did not finish within {complete_timeout_ms}ms"),
        }
    }

    fn intercepted_urls(&self) -> Vec<String> {
        self.intercepted
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }

    async fn cookie_header(&self, url: &str) -> Result<Option<String>> {
        let mut params = GetCookiesParams::default();
        params.urls = Some(vec![url.to_string()]);
        let cookies = self
            .page
            .execute(params)
            .await
            .context("failed to read cookies")?
            .result
            .cookies;

        if cookies.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        ))
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .with_context(|| format!("failed to save screenshot to {}", path.display()))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        for task in &self.tasks {
            task.abort();
        }
        let _ = self.page.clone().close().await;
        self.browser
            .execute(DisposeBrowserContextParams::new(
                self.browser_context_id.clone(),
            ))
            .await
            .context("failed to dispose browser context")?;
        Ok(())
    }
}

/// Click the first visible consent control in any frame. Best effort:
/// absence, timeouts and script errors all come back as `false`.
async fn dismiss_consent_on(page: &Page, settings: &ConsentSettings) -> bool {
    if settings.controls.is_empty() {
        return false;
    }
    let script = scripts::consent_pass_script(&settings.controls);
    let hit = poll_frames(page, &script, settings.visible_ms, |v| {
        v.as_i64().is_some_and(|i| i >= 0)
    })
    .await;

    match hit {
        Ok(Some(index)) => {
            let control = index
                .as_u64()
                .and_then(|i| settings.controls.get(i as usize))
                .map(|c| c.to_string())
                .unwrap_or_default();
            tracing::info!(%control, "accepted cookie banner");
            tokio::time::sleep(Duration::from_millis(settings.settle_ms)).await;
            true
        }
        Ok(None) => false,
        Err(e) => {
            tracing::debug!("consent dismissal skipped: {e:#}");
            false
        }
    }
}

/// Evaluate `script` in every frame until one result satisfies `hit` or
/// `timeout_ms` elapses. Every frame is tried at least once.
async fn poll_frames<F>(
    page: &Page,
    script: &str,
    timeout_ms: u64,
    hit: F,
) -> Result<Option<serde_json::Value>>
where
    F: Fn(&serde_json::Value) -> bool + Send + Sync,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    let mut worlds = FrameWorlds::default();
    loop {
        let frames = frame_ids(page).await?;
        for frame_id in worlds.sync(&frames) {
            let world = create_world(page, frame_id.clone()).await?;
            worlds.insert(frame_id, world);
        }
        for (frame_id, context_id) in worlds.ordered(&frames) {
            match evaluate_in(page, context_id, script).await {
                Ok(value) if hit(&value) => return Ok(Some(value)),
                Ok(_) => {}
                Err(e) => {
                    // The frame navigated and took its world with it.
                    tracing::trace!("frame evaluation failed: {e:#}");
                    worlds.forget(&frame_id);
                }
            }
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Isolated worlds created during one polling call, keyed by frame. `None`
/// marks a frame that cannot host a world from the page session.
#[derive(Debug, Default)]
struct FrameWorlds {
    worlds: HashMap<FrameId, Option<ExecutionContextId>>,
}

impl FrameWorlds {
    /// Drop frames that left the tree and return those not seen yet, in
    /// tree order.
    fn sync(&mut self, frames: &[FrameId]) -> Vec<FrameId> {
        self.worlds.retain(|id, _| frames.contains(id));
        frames
            .iter()
            .filter(|id| !self.worlds.contains_key(*id))
            .cloned()
            .collect()
    }

    fn insert(&mut self, frame: FrameId, world: Option<ExecutionContextId>) {
        self.worlds.insert(frame, world);
    }

    fn forget(&mut self, frame: &FrameId) {
        self.worlds.remove(frame);
    }

    /// Usable worlds in tree order.
    fn ordered(&self, frames: &[FrameId]) -> Vec<(FrameId, ExecutionContextId)> {
        frames
            .iter()
            .filter_map(|id| match self.worlds.get(id) {
                Some(Some(world)) => Some((id.clone(), world.clone())),
                _ => None,
            })
            .collect()
    }
}

/// Every frame of the page, main frame first.
async fn frame_ids(page: &Page) -> Result<Vec<FrameId>> {
    let tree = page
        .execute(GetFrameTreeParams::default())
        .await
        .context("failed to read frame tree")?
        .result
        .frame_tree;

    let mut frames = Vec::new();
    collect_frames(&tree, &mut frames);
    Ok(frames)
}

async fn create_world(page: &Page, frame_id: FrameId) -> Result<Option<ExecutionContextId>> {
    let params = CreateIsolatedWorldParams::builder()
        .frame_id(frame_id)
        .world_name(WORLD_NAME)
        .build()
        .map_err(|e| anyhow!("invalid isolated world params: {e}"))?;
    match page.execute(params).await {
        Ok(resp) => Ok(Some(resp.result.execution_context_id)),
        // Detached or out-of-process frames cannot host a world here.
        Err(e) => {
            tracing::trace!("skipping frame: {e}");
            Ok(None)
        }
    }
}

fn collect_frames(tree: &FrameTree, out: &mut Vec<FrameId>) {
    out.push(tree.frame.id.clone());
    if let Some(children) = &tree.child_frames {
        for child in children {
            collect_frames(child, out);
        }
    }
}

async fn evaluate_in(
    page: &Page,
    context_id: ExecutionContextId,
    script: &str,
) -> Result<serde_json::Value> {
    let params = EvaluateParams::builder()
        .expression(script)
        .context_id(context_id)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow!("invalid evaluate params: {e}"))?;
    let resp = page.execute(params).await.context("evaluate failed")?;
    if let Some(details) = resp.result.exception_details {
        bail!("script threw: {}", details.text);
    }
    Ok(resp.result.result.value.unwrap_or(serde_json::Value::Null))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_worlds_reused_until_frame_changes() {
        let main = FrameId::new("main");
        let ad = FrameId::new("ad");
        let viewer = FrameId::new("viewer");
        let mut worlds = FrameWorlds::default();

        let first = [main.clone(), ad.clone()];
        assert_eq!(worlds.sync(&first), first.to_vec());
        worlds.insert(main.clone(), Some(ExecutionContextId::new(1)));
        worlds.insert(ad.clone(), None);
        assert!(worlds.sync(&first).is_empty());
        assert_eq!(
            worlds.ordered(&first),
            vec![(main.clone(), ExecutionContextId::new(1))]
        );

        // The ad frame is gone, a viewer frame appeared.
        let second = [main.clone(), viewer.clone()];
        assert_eq!(worlds.sync(&second), vec![viewer.clone()]);
        worlds.insert(viewer.clone(), Some(ExecutionContextId::new(2)));
        assert_eq!(worlds.worlds.len(), 2);

        worlds.forget(&main);
        assert_eq!(worlds.sync(&second), vec![main.clone()]);
        assert_eq!(
            worlds.ordered(&second),
            vec![(viewer, ExecutionContextId::new(2))]
        );
    }

    #[test]
    fn test_find_chromium_ignores_missing_explicit_path() {
        let missing = Path::new("/definitely/not/a/browser");
        let found = find_chromium(Some(missing));
        assert_ne!(found.as_deref(), Some(missing));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_clicks_and_screenshots() {
        let renderer = ChromiumRenderer::launch(None, true)
            .await
            .expect("failed to launch renderer");
        let tmp = tempfile::TempDir::new().unwrap();
        let options = ContextOptions {
            download_dir: tmp.path().join("downloads"),
            consent_controls: crate::retrieval::affordance::default_consent_affordances(),
            consent_visible_ms: 500,
            consent_settle_ms: 0,
            document_marker: ".pdf".to_string(),
        };
        let mut ctx = renderer
            .new_context(&options)
            .await
            .expect("failed to create context");
        assert_eq!(renderer.active_contexts(), 1);

        ctx.navigate(
            "data:text/html,<button id='b' onclick='this.textContent=\"done\"'>Accept</button><a href='#'>Download PDF</a>",
            10_000,
        )
        .await
        .expect("navigation failed");

        assert!(ctx.dismiss_consent().await);
        let text = ctx
            .execute_js("document.getElementById('b').textContent")
            .await
            .expect("JS execution failed");
        assert_eq!(text.as_str(), Some("done"));

        let clicked = ctx
            .click_first_visible(&Affordance::has_text("a", "download pdf"), 1_000)
            .await
            .expect("visibility check failed");
        assert!(clicked);

        let shot = tmp.path().join("page.png");
        ctx.screenshot(&shot).await.expect("screenshot failed");
        assert!(shot.exists());

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }
}
