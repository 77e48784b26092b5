//! The `render` command.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tracing::debug;

use crate::config::RenderConfig;
use crate::document::{Document, DocumentTemplate};
use crate::templating::{RenderContext, TeraEngine};

/// Render a template against JSON data.
///
/// Image files can be referenced from the data as
/// `{"$image_file": "logo.png"}`; relative paths are resolved against the
/// directory of the data file (or the current directory for stdin).
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Template document (.ods, .odt or SpreadsheetML .xml)
    #[arg(value_name = "TEMPLATE")]
    pub template: PathBuf,

    /// JSON object to render against, or `-` for stdin
    #[arg(short, long, value_name = "DATA")]
    pub data: PathBuf,

    /// Where to write the rendered document
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,
}

impl RenderCommand {
    /// Compile the template, render it and save the result.
    pub fn execute(self, config: &RenderConfig, quiet: bool) -> Result<()> {
        let document = Document::open(&self.template)
            .with_context(|| format!("Failed to open template {}", self.template.display()))?;
        let template = DocumentTemplate::compile_with(document, TeraEngine, config)?;
        debug!("Template has {} loop region(s)", template.regions().len());

        let context = self.load_context()?;
        let rendered = template.render(&context)?;
        rendered.save(&self.output)?;

        if !quiet {
            println!(
                "{} Rendered {} -> {}",
                "✓".green(),
                self.template.display(),
                self.output.display()
            );
        }
        Ok(())
    }

    fn load_context(&self) -> Result<RenderContext> {
        let (text, base_dir) = if self.data.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read render data from stdin")?;
            (text, PathBuf::from("."))
        } else {
            let text = std::fs::read_to_string(&self.data)
                .with_context(|| format!("Failed to read render data {}", self.data.display()))?;
            let base_dir = self
                .data
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            (text, base_dir)
        };

        let value: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("Render data in {} is not valid JSON", self.data.display()))?;
        Ok(RenderContext::from_json_with_files(value, &base_dir)?)
    }
}
