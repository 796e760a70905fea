//! Output mode flags and terminal styling.
//!
//! `main` exports the global `--json` / `--quiet` flags as environment
//! variables so every command can consult them without threading them
//! through.

use std::io::IsTerminal;

pub const ENV_JSON: &str = "DOI_HARVEST_JSON";
pub const ENV_QUIET: &str = "DOI_HARVEST_QUIET";
pub const ENV_NO_COLOR: &str = "NO_COLOR";

/// Machine-readable output requested.
pub fn is_json() -> bool {
    std::env::var_os(ENV_JSON).is_some()
}

/// Non-essential output suppressed. JSON mode implies quiet.
pub fn is_quiet() -> bool {
    is_json() || std::env::var_os(ENV_QUIET).is_some()
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("  Error: failed to encode JSON output: {e}"),
    }
}

/// Status symbols, colored when stdout is a terminal.
pub struct Styled {
    color: bool,
}

impl Styled {
    pub fn new() -> Self {
        Self {
            color: std::io::stdout().is_terminal() && std::env::var_os(ENV_NO_COLOR).is_none(),
        }
    }

    fn paint(&self, code: &str, text: &'static str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn ok_sym(&self) -> String {
        self.paint("32", "[OK]")
    }

    pub fn warn_sym(&self) -> String {
        self.paint("33", "[!!]")
    }

    pub fn fail_sym(&self) -> String {
        self.paint("31", "[XX]")
    }
}

impl Default for Styled {
    fn default() -> Self {
        Self::new()
    }
}
