//! Environment readiness check.

use crate::cli::output::{self, Styled};
use crate::config::{self, DEFAULT_PDF_DIR, DEFAULT_SCREENSHOT_DIR, ENV_PDF_DIR, ENV_SCREENSHOT_DIR};
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::Path;

const WRITE_CHECK_FILE: &str = ".doi-harvest-write-check";

/// Check browser availability, contact e-mail, and output directories.
pub async fn run(chromium_path: Option<&Path>, email: Option<&str>) -> Result<()> {
    let s = Styled::new();

    let chromium = find_chromium(chromium_path);
    let contact = config::resolve_contact_email(email);
    let pdf_dir = config::resolve_dir(None, ENV_PDF_DIR, DEFAULT_PDF_DIR);
    let shot_dir = config::resolve_dir(None, ENV_SCREENSHOT_DIR, DEFAULT_SCREENSHOT_DIR);
    let pdf_ok = check_writable(&pdf_dir);
    let shot_ok = check_writable(&shot_dir);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "contact_email": contact,
            "pdf_dir": { "path": pdf_dir.display().to_string(), "writable": pdf_ok.is_ok() },
            "screenshot_dir": { "path": shot_dir.display().to_string(), "writable": shot_ok.is_ok() },
        }));
        return Ok(());
    }

    println!("doi-harvest doctor");
    println!("==================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match &chromium {
        Some(path) => println!("{} Chromium found: {}", s.ok_sym(), path.display()),
        None => println!(
            "{} Chromium NOT found. Set DOI_HARVEST_CHROMIUM_PATH or install Chrome.",
            s.warn_sym()
        ),
    }
    match &contact {
        Some(addr) => println!("{} Contact e-mail: {addr}", s.ok_sym()),
        None => println!(
            "{} No contact e-mail. Set DOI_HARVEST_EMAIL to enable the open-access lookup.",
            s.warn_sym()
        ),
    }
    for (label, dir, ok) in [("PDF", &pdf_dir, &pdf_ok), ("Screenshot", &shot_dir, &shot_ok)] {
        match ok {
            Ok(()) => println!("{} {label} directory writable: {}", s.ok_sym(), dir.display()),
            Err(e) => println!(
                "{} {label} directory not writable: {} ({e})",
                s.fail_sym(),
                dir.display()
            ),
        }
    }

    println!();
    if pdf_ok.is_ok() && shot_ok.is_ok() && (chromium.is_some() || contact.is_some()) {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}

/// Create `dir` if needed and write then remove a scratch file.
fn check_writable(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let scratch = dir.join(WRITE_CHECK_FILE);
    std::fs::write(&scratch, b"ok")?;
    std::fs::remove_file(&scratch)
}
