//! # gemd-author CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Initialize the template store
//! - `register` - Register a template from a JSON file
//! - `list` - List the manifest records
//! - `show` - Print a canonical template

mod commands;

use crate::config::AuthorConfig;
use clap::{Parser, Subcommand};
use gemd_core::{GemdError, TemplateStores};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// gemd-author - GEMD template store
///
/// Registers, lists and prints the canonical templates of a store.
#[derive(Parser, Debug)]
#[command(name = "gemd-author")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file (default: gemd.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store id, overriding the configuration
    #[arg(short = 'S', long, global = true)]
    pub store_id: Option<String>,

    /// Store root directory, overriding the configuration
    #[arg(short = 'R', long, global = true)]
    pub root: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the store folders and manifest
    Init,

    /// Register a template from a JSON file
    Register {
        /// Path to the template JSON
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List registered templates
    List {
        /// Only this kind (material, process, measurement)
        #[arg(short, long)]
        kind: Option<String>,
    },

    /// Print a canonical template
    Show {
        /// Template kind (material, process, measurement)
        #[arg(short, long)]
        kind: String,

        /// Template name
        #[arg(short, long)]
        name: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI against the configured store.
pub fn execute(cli: Cli, config: &AuthorConfig) -> Result<(), GemdError> {
    let json_mode = cli.json_mode;
    let mut stores = TemplateStores::new();
    let registry = stores.open(&config.store.id, config.store.root.clone())?;

    match cli.command {
        Some(Commands::Init) => cmd_init(registry, json_mode),
        Some(Commands::Register { file }) => cmd_register(registry, json_mode, &file),
        Some(Commands::List { kind }) => cmd_list(registry, json_mode, kind.as_deref()),
        Some(Commands::Show { kind, name }) => cmd_show(registry, json_mode, &kind, &name),
        None => {
            // No subcommand - list everything
            cmd_list(registry, json_mode, None)
        }
    }
}
