//! Command-line interface for reportloom.
//!
//! # Available Commands
//!
//! - `render` - Render a template against JSON data into a new document
//! - `compile` - Show the compiled main content of a template, or its loops
//!
//! # Usage
//!
//! ```bash
//! # Render an invoice
//! reportloom render invoice.ods --data invoice.json --output invoice-0001.ods
//!
//! # Read the data from stdin
//! generate-data | reportloom render invoice.ods --data - --output out.ods
//!
//! # Check where loop markers ended up
//! reportloom compile invoice.ods
//! reportloom compile invoice.ods --regions
//! ```
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging
//! - `--quiet` - Only report errors
//! - `--config` - Use a specific configuration file (see [`crate::config`])
//!
//! Logging goes to stderr; `RUST_LOG` overrides the level chosen by the flags.

mod compile;
mod render;

pub use compile::CompileCommand;
pub use render::RenderCommand;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::RenderConfig;

/// Runtime settings derived from the global flags.
///
/// Kept separate from [`Cli`] so tests can run commands without parsing
/// arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,
    /// Suppress success messages
    pub quiet: bool,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            quiet: false,
            config_path: None,
        }
    }
}

impl CliConfig {
    /// Install the global tracing subscriber.
    ///
    /// Only the first call in a process has any effect.
    pub fn init_logging(&self) {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&self.log_level)
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Load the render configuration this CLI run should use.
    pub fn load_render_config(&self) -> crate::core::Result<RenderConfig> {
        RenderConfig::load_with_optional(self.config_path.as_deref())
    }
}

/// Render office documents from templates.
#[derive(Parser)]
#[command(
    name = "reportloom",
    about = "Render office documents from templates",
    version,
    author,
    long_about = "reportloom renders OpenDocument and SpreadsheetML templates against JSON data. \
                  Repeated rows and columns are marked with [[#row x in xs]] / [[/row]] and \
                  [[#col x in xs]] / [[/col]] inside table cells."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file
    ///
    /// Overrides `REPORTLOOM_CONFIG` and the default location
    /// (`<config dir>/reportloom/config.toml`).
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template against JSON data
    Render(RenderCommand),

    /// Print the compiled main content of a template
    Compile(CompileCommand),
}

impl Cli {
    /// Run the selected command.
    pub fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config)
    }

    /// Translate the global flags into a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        };

        CliConfig {
            log_level: log_level.to_string(),
            quiet: self.quiet,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with an explicit configuration.
    pub fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let render_config = config.load_render_config()?;

        match self.command {
            Commands::Render(cmd) => cmd.execute(&render_config, config.quiet),
            Commands::Compile(cmd) => cmd.execute(&render_config),
        }
    }
}
