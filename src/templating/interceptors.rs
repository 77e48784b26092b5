//! Value interception for every inserted template value
//!
//! The template engine never writes a value into the markup on its own. Each
//! value goes through an [`InterceptorChain`] first: an ordered list of
//! [`ValueInterceptor`]s, each of which may claim the value and turn it into
//! final markup. Once a value has become markup, later interceptors see it
//! but leave it alone.
//!
//! The standard chain is:
//!
//! 1. [`XmlEscape`] turns text into escaped markup
//! 2. [`ImageEmbedder`] turns image handles into image references
//!
//! Values no interceptor claims are written as plain text: numbers and
//! booleans as their literal, null as nothing, sequences and records as
//! escaped JSON.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::core::{ReportError, Result};
use crate::resources::{EmbeddingSession, Image, ImageRef};

/// A value on its way into the markup.
#[derive(Debug, Clone, PartialEq)]
pub enum Insertion {
    /// Still a data value
    Value(Value),
    /// Final markup, written verbatim
    Markup(String),
}

/// One step of the interceptor chain.
pub trait ValueInterceptor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Claim `insertion` by returning markup, or hand it on unchanged.
    fn intercept(&self, insertion: Insertion) -> Result<Insertion>;
}

/// Escapes text values for XML content and attribute values.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlEscape;

impl ValueInterceptor for XmlEscape {
    fn name(&self) -> &'static str {
        "xml-escape"
    }

    fn intercept(&self, insertion: Insertion) -> Result<Insertion> {
        Ok(match insertion {
            Insertion::Value(Value::String(text)) => {
                Insertion::Markup(quick_xml::escape::escape(text.as_str()).into_owned())
            }
            other => other,
        })
    }
}

/// Replaces image handles with references to embedded copies.
pub struct ImageEmbedder {
    images: HashMap<String, Image>,
    session: Arc<Mutex<EmbeddingSession>>,
}

impl ImageEmbedder {
    /// Embed images from `images` through `session`.
    pub fn new(images: HashMap<String, Image>, session: Arc<Mutex<EmbeddingSession>>) -> Self {
        Self { images, session }
    }
}

impl ValueInterceptor for ImageEmbedder {
    fn name(&self) -> &'static str {
        "image-embedder"
    }

    fn intercept(&self, insertion: Insertion) -> Result<Insertion> {
        let Insertion::Value(value) = &insertion else {
            return Ok(insertion);
        };
        let Some(digest) = ImageRef::digest_of(value) else {
            return Ok(insertion);
        };

        let image = self.images.get(digest).ok_or_else(|| ReportError::Resource {
            reason: format!("image {digest} is not registered with the render context"),
        })?;
        let fragment = self
            .session
            .lock()
            .map_err(|_: PoisonError<_>| ReportError::Resource {
                reason: "embedding session is unavailable after an earlier failure".to_string(),
            })?
            .resolve(image)?;
        Ok(Insertion::Markup(fragment))
    }
}

/// Ordered interceptors plus the first failure they reported.
///
/// Engines usually flatten errors raised inside filters into strings. The
/// chain keeps the original error so the renderer can report it unchanged.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn ValueInterceptor>>,
    failure: Mutex<Option<ReportError>>,
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("interceptors", &self.names())
            .finish_non_exhaustive()
    }
}

impl InterceptorChain {
    /// A chain with no interceptors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Escaping followed by image embedding.
    pub fn standard(images: HashMap<String, Image>, session: Arc<Mutex<EmbeddingSession>>) -> Self {
        Self::new()
            .with(XmlEscape)
            .with(ImageEmbedder::new(images, session))
    }

    /// Append an interceptor; it runs after the ones already present.
    #[must_use]
    pub fn with(mut self, interceptor: impl ValueInterceptor + 'static) -> Self {
        self.interceptors.push(Box::new(interceptor));
        self
    }

    /// Interceptor names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run `value` through the chain and return the markup to insert.
    pub fn insert(&self, value: &Value) -> Result<String> {
        let mut insertion = Insertion::Value(value.clone());
        for interceptor in &self.interceptors {
            insertion = interceptor.intercept(insertion)?;
        }

        Ok(match insertion {
            Insertion::Markup(markup) => markup,
            Insertion::Value(value) => plain_text(&value),
        })
    }

    /// Remember `error` unless an earlier failure is already recorded.
    pub fn record_failure(&self, error: ReportError) {
        if let Ok(mut slot) = self.failure.lock() {
            if slot.is_none() {
                *slot = Some(error);
            }
        }
    }

    /// The first recorded failure, if any.
    pub fn take_failure(&self) -> Option<ReportError> {
        self.failure.lock().ok().and_then(|mut slot| slot.take())
    }
}

fn plain_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => quick_xml::escape::escape(text.as_str()).into_owned(),
        Value::Array(_) | Value::Object(_) => {
            quick_xml::escape::escape(value.to_string().as_str()).into_owned()
        }
    }
}
