//! The `compile` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::RenderConfig;
use crate::document::{Document, DocumentTemplate};
use crate::templating::TeraEngine;

/// Print the compiled main content of a template.
///
/// Useful to check where loop markers were moved before rendering anything.
#[derive(Debug, Args)]
pub struct CompileCommand {
    /// Template document (.ods, .odt or SpreadsheetML .xml)
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Print the loop regions as JSON instead of the markup
    #[arg(long)]
    pub regions: bool,
}

impl CompileCommand {
    pub fn execute(self, config: &RenderConfig) -> Result<()> {
        let document = Document::open(&self.template)
            .with_context(|| format!("Failed to open template {}", self.template.display()))?;
        let template = DocumentTemplate::compile_with(document, TeraEngine, config)?;

        let text = if self.regions {
            serde_json::to_string_pretty(template.regions())?
        } else {
            template.compiled_markup().to_string()
        };

        match &self.output {
            Some(path) => std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{text}"),
        }
        Ok(())
    }
}
