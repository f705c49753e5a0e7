//! # gemd-author - GEMD Template Store CLI
//!
//! The host binary for the gemd-core authoring library.
//!
//! This application provides:
//! - CLI interface for template store operations
//! - `gemd.toml` configuration
//! - Tracing subscriber setup
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │             apps/gemd-author (THE BINARY)        │
//! │                                                  │
//! │  ┌─────────────┐          ┌──────────────────┐   │
//! │  │   CLI       │          │  Config          │   │
//! │  │  (clap)     │          │  (gemd.toml)     │   │
//! │  └──────┬──────┘          └────────┬─────────┘   │
//! │         └────────────┬─────────────┘             │
//! │                      ▼                           │
//! │              ┌───────────────┐                   │
//! │              │   gemd-core   │                   │
//! │              │  (THE LOGIC)  │                   │
//! │              └───────────────┘                   │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! gemd-author init --root ./templates
//! gemd-author register -f arc_melting.json
//! gemd-author list --kind process
//! gemd-author show --kind process --name "arc melting" --json-mode
//! ```

mod cli;
mod config;

use clap::Parser;
use config::AuthorConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // Configuration errors surface before tracing exists.
    let config = match AuthorConfig::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(cli.store_id.clone(), cli.root.clone()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // GEMD_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GEMD_LOG_FORMAT").unwrap_or_else(|_| config.log.format.clone());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gemd_author=info,gemd_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  gemd-author v{}
  Template · Spec · Run
"#,
        env!("CARGO_PKG_VERSION")
    );
}
