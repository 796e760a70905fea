//! `doi-harvest fetch` - run a batch of identifiers through the retriever.

use crate::cli::output::{self, Styled};
use crate::config::{
    self, HarvestConfig, DEFAULT_DELAY_MS, DEFAULT_PDF_DIR, DEFAULT_SCREENSHOT_DIR,
    ENV_CHROMIUM_PATH, ENV_PDF_DIR, ENV_SCREENSHOT_DIR,
};
use crate::progress::{self, ProgressEventKind, ProgressReceiver};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{NoopRenderer, Renderer};
use crate::report::RunReport;
use crate::retrieval::{
    parse_identifier_list, run_batch, ArtifactStore, BatchSummary, Identifier, Retriever,
};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, clap::Args)]
pub struct FetchArgs {
    /// DOIs to retrieve (bare, `doi:` or `https://doi.org/` form)
    pub ids: Vec<String>,
    /// Read DOIs from a file, one per line (`#` starts a comment)
    #[arg(long, short)]
    pub input: Option<PathBuf>,
    /// Directory for downloaded PDFs [env: DOI_HARVEST_PDF_DIR, default: pdfs]
    #[arg(long)]
    pub pdf_dir: Option<String>,
    /// Directory for evidence screenshots [env: DOI_HARVEST_SCREENSHOT_DIR, default: screenshots]
    #[arg(long)]
    pub screenshot_dir: Option<String>,
    /// Contact e-mail for the open-access lookup [env: DOI_HARVEST_EMAIL]
    #[arg(long)]
    pub email: Option<String>,
    /// Pause between identifiers in milliseconds
    #[arg(long, default_value_t = DEFAULT_DELAY_MS)]
    pub delay_ms: u64,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
    /// Only use the open-access lookup, never start a browser
    #[arg(long)]
    pub no_browser: bool,
    /// Append one JSON line per identifier to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Chromium binary [env: DOI_HARVEST_CHROMIUM_PATH]
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,
    /// Landing-page navigation timeout in milliseconds
    #[arg(long)]
    pub nav_timeout_ms: Option<u64>,
    /// Download completion timeout in milliseconds
    #[arg(long)]
    pub download_timeout_ms: Option<u64>,
}

/// Resolve flags and environment into a driver configuration.
pub fn build_config(args: &FetchArgs) -> HarvestConfig {
    let mut cfg = HarvestConfig {
        pdf_dir: config::resolve_dir(args.pdf_dir.as_deref(), ENV_PDF_DIR, DEFAULT_PDF_DIR),
        screenshot_dir: config::resolve_dir(
            args.screenshot_dir.as_deref(),
            ENV_SCREENSHOT_DIR,
            DEFAULT_SCREENSHOT_DIR,
        ),
        contact_email: config::resolve_contact_email(args.email.as_deref()),
        politeness_delay: Duration::from_millis(args.delay_ms),
        use_browser: !args.no_browser,
        headless: !args.headful,
        chromium_path: args.chromium_path.clone().or_else(|| {
            config::resolve_setting(None, ENV_CHROMIUM_PATH).map(PathBuf::from)
        }),
        report_path: args.report.clone(),
        ..HarvestConfig::default()
    };
    if let Some(ms) = args.nav_timeout_ms {
        cfg.timeouts.navigation_ms = ms;
    }
    if let Some(ms) = args.download_timeout_ms {
        cfg.timeouts.download_complete_ms = ms;
    }
    cfg
}

/// Positional identifiers first, then the input file, without duplicates.
pub fn collect_identifiers(ids: &[String], input: Option<&Path>) -> Result<Vec<Identifier>> {
    let mut all: Vec<Identifier> = ids.iter().filter_map(|raw| Identifier::parse(raw)).collect();
    if let Some(path) = input {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?;
        all.extend(parse_identifier_list(&text));
    }

    let mut seen = HashSet::new();
    all.retain(|id| seen.insert(id.clone()));
    Ok(all)
}

/// Run the fetch command.
pub async fn run(args: FetchArgs) -> Result<()> {
    let s = Styled::new();
    let cfg = build_config(&args);
    let identifiers = collect_identifiers(&args.ids, args.input.as_deref())?;
    if identifiers.is_empty() {
        bail!("no identifiers given. Pass DOIs as arguments or use --input FILE.");
    }

    let store = ArtifactStore::new(&cfg.pdf_dir, &cfg.screenshot_dir);
    store.ensure_dirs().with_context(|| {
        format!(
            "cannot create output directories {} and {}",
            cfg.pdf_dir.display(),
            cfg.screenshot_dir.display()
        )
    })?;

    if cfg.contact_email.is_none() && !output::is_quiet() {
        eprintln!(
            "  {} No contact e-mail (--email or DOI_HARVEST_EMAIL): open-access lookup disabled.",
            s.warn_sym()
        );
    }

    let renderer = start_renderer(&cfg, &s).await;

    let (tx, rx) = progress::channel();
    let printer = if output::is_quiet() {
        drop(rx);
        None
    } else {
        Some(tokio::spawn(print_outcomes(rx)))
    };

    let mut report = match &cfg.report_path {
        Some(path) => Some(RunReport::open(path)?),
        None => None,
    };

    info!(count = identifiers.len(), "starting batch");
    let retriever = Retriever::from_config(&cfg, renderer.clone()).with_progress(tx);
    let summary = run_batch(&retriever, &identifiers, cfg.politeness_delay, report.as_mut()).await;

    // Dropping the retriever closes the progress channel.
    drop(retriever);
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }

    print_summary(&summary, &s)
}

async fn start_renderer(cfg: &HarvestConfig, s: &Styled) -> Arc<dyn Renderer> {
    if !cfg.use_browser {
        info!("browser tiers disabled");
        return Arc::new(NoopRenderer);
    }
    match ChromiumRenderer::launch(cfg.chromium_path.as_deref(), cfg.headless).await {
        Ok(renderer) => {
            info!("Chromium renderer initialized");
            Arc::new(renderer)
        }
        Err(e) => {
            warn!("failed to start Chromium: {e:#}; continuing in lookup-only mode");
            if !output::is_quiet() {
                eprintln!(
                    "  {} Chromium unavailable ({e:#}). Only the open-access lookup will run.",
                    s.warn_sym()
                );
            }
            Arc::new(NoopRenderer)
        }
    }
}

/// Print one line per finished identifier.
async fn print_outcomes(mut rx: ProgressReceiver) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let show = match &event.event {
                    ProgressEventKind::DocumentSaved { .. }
                    | ProgressEventKind::EvidenceSaved { .. } => true,
                    ProgressEventKind::RetrievalComplete { status, .. } => status == "failed",
                    _ => false,
                };
                if show {
                    println!("  {}", progress::describe(&event));
                }
            }
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_summary(summary: &BatchSummary, s: &Styled) -> Result<()> {
    if output::is_json() {
        output::print_json(&serde_json::to_value(summary)?);
        return Ok(());
    }
    if output::is_quiet() {
        return Ok(());
    }

    println!();
    let sym = if summary.failed == 0 && summary.evidence == 0 {
        s.ok_sym()
    } else {
        s.warn_sym()
    };
    println!(
        "  {sym} {} identifiers: {} downloaded, {} screenshots, {} failed",
        summary.total, summary.downloaded, summary.evidence, summary.failed
    );
    Ok(())
}
