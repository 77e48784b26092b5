//! Template parsing, binding and rendering
//!
//! This module sits between the structural compiler and the output container:
//!
//! - [`TemplateEngine`] is the boundary to the general-purpose template
//!   language. [`TeraEngine`] is the shipped implementation.
//! - [`RenderContext`] holds the data a template is rendered against,
//!   including images.
//! - [`InterceptorChain`] sees every value the engine prints and turns it into
//!   markup: text is XML-escaped, image handles become image references.
//! - [`render_entry`] drives one render into one container entry.
//!
//! # Template Syntax
//!
//! Compiled templates use Tera syntax. Variables are written `{{ name }}`,
//! control flow `{% if %}` / `{% for %}`; loop markers in tables are turned
//! into `{% for %}` blocks by the compiler before parsing.
//!
//! # Examples
//!
//! ```rust
//! use reportloom::container::Container;
//! use reportloom::templating::{
//!     RenderContext, RenderOptions, TemplateEngine, TeraEngine, render_entry,
//! };
//!
//! let engine = TeraEngine;
//! let template = engine.parse("content.xml", "<p>{{ greeting }}</p>").unwrap();
//!
//! let mut context = RenderContext::new();
//! context.insert("greeting", "Fish & Chips").unwrap();
//!
//! let mut output = Container::new();
//! let options = RenderOptions::default();
//! render_entry(&engine, &template, &context, &mut output, "content.xml", &options).unwrap();
//! assert_eq!(output.read_text_entry("content.xml").unwrap(), "<p>Fish &amp; Chips</p>");
//! ```

mod context;
mod engine;
mod instrument;
pub mod interceptors;
mod renderer;

pub use context::{IMAGE_FILE_KEY, RenderContext};
pub use engine::{TemplateEngine, TeraEngine, TeraTemplate, format_tera_error};
pub use instrument::{INSERT_FILTER, INSERT_VALUE};
pub use interceptors::{ImageEmbedder, Insertion, InterceptorChain, ValueInterceptor, XmlEscape};
pub use renderer::{RenderOptions, RenderReport, render_entry};
