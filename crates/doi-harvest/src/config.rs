//! Configuration loading and resolution.
//!
//! Every setting resolves the same way: an explicit value (CLI flag) wins,
//! then the environment, then the built-in default.

use std::path::PathBuf;
use std::time::Duration;

/// Contact e-mail sent to the lookup service.
pub const ENV_EMAIL: &str = "DOI_HARVEST_EMAIL";
/// Browser binary override.
pub const ENV_CHROMIUM_PATH: &str = "DOI_HARVEST_CHROMIUM_PATH";
pub const ENV_PDF_DIR: &str = "DOI_HARVEST_PDF_DIR";
pub const ENV_SCREENSHOT_DIR: &str = "DOI_HARVEST_SCREENSHOT_DIR";

pub const DEFAULT_PDF_DIR: &str = "pdfs";
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";
pub const DEFAULT_LOOKUP_BASE: &str = "https://api.unpaywall.org/v2";
pub const DEFAULT_RESOLVER_BASE: &str = "https://doi.org";
pub const DEFAULT_DELAY_MS: u64 = 1_000;

/// Bounds on every wait the retriever performs. All values in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Landing-page navigation.
    pub navigation_ms: u64,
    /// How long each affordance may take to become visible.
    pub affordance_visible_ms: u64,
    /// Click-to-download correlation window.
    pub download_start_ms: u64,
    /// Once a download began, how long it may take to finish.
    pub download_complete_ms: u64,
    /// How long a consent control may take to become visible.
    pub consent_visible_ms: u64,
    /// Pause after a consent click so the overlay can disappear.
    pub consent_settle_ms: u64,
    /// Lookup-service request.
    pub lookup_ms: u64,
    /// Direct document fetch.
    pub fetch_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            navigation_ms: 60_000,
            affordance_visible_ms: 3_000,
            download_start_ms: 10_000,
            download_complete_ms: 60_000,
            consent_visible_ms: 1_500,
            consent_settle_ms: 1_000,
            lookup_ms: 10_000,
            fetch_ms: 20_000,
        }
    }
}

/// Everything the batch driver needs to build a retriever.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub pdf_dir: PathBuf,
    pub screenshot_dir: PathBuf,
    /// `None` disables the lookup tier.
    pub contact_email: Option<String>,
    pub lookup_base: String,
    pub resolver_base: String,
    pub politeness_delay: Duration,
    /// `false` skips the browser tiers entirely.
    pub use_browser: bool,
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            pdf_dir: PathBuf::from(DEFAULT_PDF_DIR),
            screenshot_dir: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
            contact_email: None,
            lookup_base: DEFAULT_LOOKUP_BASE.to_string(),
            resolver_base: DEFAULT_RESOLVER_BASE.to_string(),
            politeness_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            use_browser: true,
            headless: true,
            chromium_path: None,
            report_path: None,
            timeouts: Timeouts::default(),
        }
    }
}

/// Resolve a setting: explicit value, then `env_key`, then `None`.
pub fn resolve_setting(explicit: Option<&str>, env_key: &str) -> Option<String> {
    if let Some(value) = explicit {
        return Some(value.to_string());
    }
    std::env::var(env_key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve an output directory.
pub fn resolve_dir(explicit: Option<&str>, env_key: &str, default: &str) -> PathBuf {
    PathBuf::from(resolve_setting(explicit, env_key).unwrap_or_else(|| default.to_string()))
}

/// Resolve the contact e-mail. Values without an `@` are rejected.
pub fn resolve_contact_email(explicit: Option<&str>) -> Option<String> {
    resolve_setting(explicit, ENV_EMAIL)
        .map(|e| e.trim().to_string())
        .filter(|e| e.contains('@'))
}
