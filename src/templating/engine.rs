//! The template engine boundary and its Tera implementation.

use std::collections::HashMap;
use std::error::Error as _;
use std::io::Write;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use strsim::levenshtein;
use tera::Tera;
use tracing::debug;

use super::context::RenderContext;
use super::instrument::{INSERT_FILTER, instrument};
use super::interceptors::InterceptorChain;
use crate::compiler::{JinjaLoopSyntax, LoopSyntax};
use crate::core::{ReportError, Result};

/// Maximum allowed Levenshtein distance as a percentage of the name length
/// for "did you mean" suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Context paths deeper than this are not offered as suggestions.
const SUGGESTION_DEPTH: usize = 3;

static UNDEFINED_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Variable `([^`]+)` not found|Unknown variable `([^`]+)`")
        .expect("undefined variable pattern is a valid regex")
});

/// A general-purpose template language that can parse compiled markup and
/// render it against a [`RenderContext`].
///
/// Engines must hand every value they print to the [`InterceptorChain`]
/// passed to [`render`](Self::render) and write the returned markup instead
/// of the value.
pub trait TemplateEngine: Send + Sync {
    /// Parsed, ready-to-render template.
    type Template: Send + Sync;

    /// Parse `source`.
    ///
    /// # Errors
    ///
    /// [`ReportError::TemplateSyntax`] with every diagnostic found.
    fn parse(&self, name: &str, source: &str) -> Result<Self::Template>;

    /// Render `template` into `sink`.
    ///
    /// # Errors
    ///
    /// [`ReportError::Render`] for evaluation failures, or the error an
    /// interceptor raised.
    fn render(
        &self,
        template: &Self::Template,
        context: &RenderContext,
        sink: &mut dyn Write,
        interceptors: Arc<InterceptorChain>,
    ) -> Result<()>;

    /// Loop constructs the structural compiler emits for this engine.
    fn loop_syntax(&self) -> &dyn LoopSyntax;
}

/// [`TemplateEngine`] backed by Tera.
///
/// Autoescaping is switched off; escaping is done by the interceptor chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraEngine;

/// A template parsed by [`TeraEngine`].
#[derive(Clone)]
pub struct TeraTemplate {
    tera: Tera,
    name: String,
    source: String,
}

impl std::fmt::Debug for TeraTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeraTemplate")
            .field("name", &self.name)
            .field("len", &self.source.len())
            .finish_non_exhaustive()
    }
}

impl TeraTemplate {
    /// The instrumented source Tera parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn insertion_filter(chain: Arc<InterceptorChain>) -> impl tera::Filter + 'static {
    move |value: &tera::Value, _: &HashMap<String, tera::Value>| -> tera::Result<tera::Value> {
        chain.insert(value).map(tera::Value::String).map_err(|e| {
            let message = e.to_string();
            chain.record_failure(e);
            tera::Error::msg(message)
        })
    }
}

impl TemplateEngine for TeraEngine {
    type Template = TeraTemplate;

    fn parse(&self, name: &str, source: &str) -> Result<TeraTemplate> {
        let instrumented = instrument(source);
        let mut diagnostics = instrumented.diagnostics;

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_filter(INSERT_FILTER, insertion_filter(Arc::new(InterceptorChain::new())));

        if let Err(e) = tera.add_raw_template(name, &instrumented.source) {
            diagnostics.extend(error_chain(&e));
        }
        if !diagnostics.is_empty() {
            return Err(ReportError::TemplateSyntax { diagnostics });
        }

        debug!("Parsed template '{}' ({} bytes)", name, instrumented.source.len());
        Ok(TeraTemplate {
            tera,
            name: name.to_string(),
            source: instrumented.source,
        })
    }

    fn render(
        &self,
        template: &TeraTemplate,
        context: &RenderContext,
        sink: &mut dyn Write,
        interceptors: Arc<InterceptorChain>,
    ) -> Result<()> {
        // Per-render copy so concurrent renders never share a filter
        let mut tera = template.tera.clone();
        tera.register_filter(INSERT_FILTER, insertion_filter(Arc::clone(&interceptors)));

        let tera_context = context.to_tera()?;
        tera.render_to(&template.name, &tera_context, sink)
            .map_err(|e| match interceptors.take_failure() {
                Some(failure) => failure,
                None => render_error(&e, context),
            })
    }

    fn loop_syntax(&self) -> &dyn LoopSyntax {
        &JinjaLoopSyntax
    }
}

/// Every message in a Tera error's source chain, outermost first.
fn error_chain(error: &tera::Error) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(cause) = current {
        messages.push(cause.to_string());
        current = cause.source();
    }
    messages
        .into_iter()
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .collect()
}

/// Format a Tera error chain as one message, one cause per line.
#[must_use]
pub fn format_tera_error(error: &tera::Error) -> String {
    let messages = error_chain(error);
    if messages.is_empty() {
        "Template rendering failed".to_string()
    } else {
        messages.join("\n  -> ")
    }
}

fn render_error(error: &tera::Error, context: &RenderContext) -> ReportError {
    let message = format_tera_error(error);
    let suggestions = extract_variable_name(&message)
        .map(|name| find_similar_variables(&name, &available_variables(context)))
        .unwrap_or_default();
    ReportError::Render {
        message,
        suggestions,
    }
}

/// Extract the name from "Variable `foo` not found" style messages.
fn extract_variable_name(message: &str) -> Option<String> {
    let captures = UNDEFINED_VARIABLE.captures(message)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map(|m| m.as_str().to_string())
}

/// Dotted paths of every value in the context, a few levels deep.
fn available_variables(context: &RenderContext) -> Vec<String> {
    fn walk(prefix: &str, value: &Value, depth: usize, out: &mut Vec<String>) {
        out.push(prefix.to_string());
        if depth >= SUGGESTION_DEPTH {
            return;
        }
        if let Value::Object(map) = value {
            for (key, nested) in map {
                walk(&format!("{prefix}.{key}"), nested, depth + 1, out);
            }
        }
    }

    let mut variables = Vec::new();
    for (key, value) in context.values() {
        walk(key, value, 1, &mut variables);
    }
    variables
}

/// Find similar variable names using Levenshtein distance.
fn find_similar_variables(target: &str, available: &[String]) -> Vec<String> {
    let mut scored: Vec<_> = available
        .iter()
        .map(|var| (var.clone(), levenshtein(target, var)))
        .collect();

    scored.sort_by_key(|(_, dist)| *dist);

    scored
        .into_iter()
        .filter(|(_, dist)| *dist <= target.len() * SIMILARITY_THRESHOLD_PERCENT / 100)
        .take(3)
        .map(|(var, _)| var)
        .collect()
}
