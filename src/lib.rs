//! reportloom - office document templating
//!
//! Renders office documents (OpenDocument spreadsheets and text documents,
//! flat SpreadsheetML 2003 workbooks) from templates authored in the office
//! application itself. Cells hold template expressions such as `{{ name }}`;
//! rows and columns that repeat are marked with loop markers typed into the
//! cells:
//!
//! ```text
//! | [[#row line in lines]]{{ line.item }} | {{ line.qty }}[[/row]] |
//! ```
//!
//! # Architecture Overview
//!
//! Rendering runs in two phases.
//!
//! 1. **Compile** (once per template): the main content entry is read from the
//!    package, the structural compiler moves every loop marker out to the
//!    boundary of the rows or cells it governs, and the result is parsed by the
//!    template engine.
//! 2. **Render** (once per output): the package is duplicated, the parsed
//!    template is evaluated against the render data with every printed value
//!    passing through the interceptor chain (XML escaping, image embedding),
//!    and embedded images are added to the output package.
//!
//! # Core Modules
//!
//! - [`container`] - In-memory zip entry store with copy-on-write duplication
//! - [`compiler`] - Loop marker scanning, pairing and relocation
//! - [`templating`] - Engine boundary (Tera), render data, interceptors
//! - [`resources`] - Images and their embedding into output packages
//! - [`document`] - Document formats and compiled document templates
//! - [`config`] - Optional TOML configuration
//! - [`core`] - Error types and markup positions
//! - [`cli`] - The `reportloom` command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use reportloom::document::{Document, DocumentTemplate};
//! use reportloom::templating::RenderContext;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let template = DocumentTemplate::compile(Document::open("report.ods")?)?;
//!
//! let context = RenderContext::from_json(json!({
//!     "title": "Stock",
//!     "lines": [{"item": "Tea", "qty": 2}, {"item": "Rice", "qty": 5}],
//! }))?;
//! template.render(&context)?.save("stock.ods")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Command-Line Usage
//!
//! ```bash
//! # Render a template against JSON data
//! reportloom render report.ods --data data.json --output out.ods
//!
//! # Show the compiled main content
//! reportloom compile report.ods
//! ```

// Pipeline
pub mod compiler;
pub mod container;
pub mod document;
pub mod resources;
pub mod templating;

// Supporting modules
pub mod cli;
pub mod config;
pub mod core;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
