//! Page affordances: selectors for elements that start a download or accept
//! a cookie banner.
//!
//! Affordances are written in the familiar `tag:has-text("Label")` shorthand
//! or as plain CSS. Lists are ordered by priority; the retriever never ranks
//! matches beyond list position.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single element lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Affordance {
    /// Elements matching a CSS selector.
    Css(String),
    /// Elements of `tag` whose rendered text contains `text`, ignoring case.
    HasText { tag: String, text: String },
}

impl Affordance {
    pub fn css(selector: &str) -> Self {
        Self::Css(selector.to_string())
    }

    pub fn has_text(tag: &str, text: &str) -> Self {
        Self::HasText {
            tag: tag.to_string(),
            text: text.to_string(),
        }
    }
}

impl fmt::Display for Affordance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(selector) => write!(f, "{selector}"),
            Self::HasText { tag, text } => write!(f, "{tag}:has-text(\"{text}\")"),
        }
    }
}

impl FromStr for Affordance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty selector".to_string());
        }
        if let Some((tag, rest)) = s.split_once(":has-text(") {
            let inner = rest
                .strip_suffix(')')
                .ok_or_else(|| format!("unterminated :has-text in {s}"))?;
            let text = inner
                .strip_prefix('"')
                .and_then(|t| t.strip_suffix('"'))
                .or_else(|| inner.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))
                .ok_or_else(|| format!(":has-text needs a quoted label in {s}"))?;
            let tag = if tag.is_empty() { "*" } else { tag };
            return Ok(Self::has_text(tag, text));
        }
        Ok(Self::Css(s.to_string()))
    }
}

/// Elements that, when clicked, should start a PDF download.
pub const PDF_AFFORDANCES: &[&str] = &[
    r#"a:has-text("Download PDF")"#,
    r#"a:has-text("PDF")"#,
    r#"a:has-text("Full Text PDF")"#,
    r#"a[href$=".pdf"]"#,
    r#"button:has-text("PDF")"#,
    "a.pdf-link",
    "a#pdfLink",
    r#"button:has-text("Download")"#,
    r#"a:has-text("Download")"#,
    r#"button[aria-label*="PDF"]"#,
    r#"span:has-text("Download PDF")"#,
];

/// Buttons consent managers use to accept cookies.
pub const CONSENT_AFFORDANCES: &[&str] = &[
    "#onetrust-accept-btn-handler",
    r#"button:has-text("Accept")"#,
    r#"button:has-text("Accept All")"#,
    r#"button:has-text("Allow all")"#,
    r#"button:has-text("Allow cookies")"#,
    r#"button:has-text("Accept Cookies")"#,
    r#"button:has-text("I agree")"#,
    "button#accept-cookies",
    "button.cookie-accept",
];

/// Embedded PDF viewers whose source URL can be fetched directly.
pub const VIEWER_SELECTORS: &[&str] = &[
    r#"iframe[src*=".pdf"]"#,
    r#"iframe[src*="download"]"#,
    r#"embed[type="application/pdf"]"#,
    r#"object[type="application/pdf"]"#,
];

/// Parse a built-in list. The built-ins are known to parse.
fn parse_list(raw: &[&str]) -> Vec<Affordance> {
    raw.iter().filter_map(|s| s.parse().ok()).collect()
}

pub fn default_pdf_affordances() -> Vec<Affordance> {
    parse_list(PDF_AFFORDANCES)
}

pub fn default_consent_affordances() -> Vec<Affordance> {
    parse_list(CONSENT_AFFORDANCES)
}
