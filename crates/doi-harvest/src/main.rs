// Copyright 2026 doi-harvest Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use doi_harvest::cli::{self, fetch_cmd::FetchArgs, output};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "doi-harvest",
    about = "doi-harvest: fetch full-text PDFs for DOIs, with screenshots as evidence when none is reachable",
    version,
    after_help = "Run 'doi-harvest <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve PDFs for a batch of DOIs
    Fetch(FetchArgs),
    /// Check environment and diagnose issues
    Doctor {
        /// Chromium binary to check instead of searching for one
        #[arg(long)]
        chromium_path: Option<PathBuf>,
        /// Contact e-mail to check [env: DOI_HARVEST_EMAIL]
        #[arg(long)]
        email: Option<String>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "doi_harvest=debug"
    } else if quiet {
        "doi_harvest=error"
    } else {
        "doi_harvest=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global flags via environment variables so all modules can check them
    if cli.json {
        std::env::set_var(output::ENV_JSON, "1");
    }
    if cli.quiet {
        std::env::set_var(output::ENV_QUIET, "1");
    }
    init_tracing(cli.verbose, cli.quiet || cli.json);

    let result = match cli.command {
        Commands::Fetch(args) => cli::fetch_cmd::run(args).await,
        Commands::Doctor {
            chromium_path,
            email,
        } => cli::doctor::run(chromium_path.as_deref(), email.as_deref()).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "doi-harvest", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if !output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        }
        std::process::exit(1);
    }

    result
}
