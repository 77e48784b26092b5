//! Render data: named values plus the images they refer to.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{ReportError, Result};
use crate::resources::{Image, ImageRef};

/// Key of the object that loads an image file in JSON render data.
pub const IMAGE_FILE_KEY: &str = "$image_file";

/// Values a template is rendered against.
///
/// Values are plain JSON. Images are kept in a side table keyed by content
/// digest and appear among the values as [`ImageRef`] handles. A context is
/// never modified by rendering, so one context can serve many renders.
///
/// # Examples
///
/// ```rust
/// use reportloom::templating::RenderContext;
/// use serde_json::json;
///
/// let mut context = RenderContext::new();
/// context.insert("title", "Quarterly report").unwrap();
/// context.insert("rows", &json!([{"name": "a"}, {"name": "b"}])).unwrap();
/// assert!(context.contains_key("rows"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: Map<String, Value>,
    images: HashMap<String, Image>,
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object.
    ///
    /// # Errors
    ///
    /// [`ReportError::Context`] if `value` is not an object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self {
                values,
                images: HashMap::new(),
            }),
            other => Err(ReportError::Context {
                reason: format!(
                    "expected a JSON object at the top level, found {}",
                    kind_name(&other)
                ),
            }),
        }
    }

    /// Build a context from a JSON object, loading `{"$image_file": "path"}`
    /// objects as images.
    ///
    /// Relative paths are resolved against `base_dir`.
    pub fn from_json_with_files(value: Value, base_dir: &Path) -> Result<Self> {
        let mut context = Self::from_json(value)?;
        let mut values = std::mem::take(&mut context.values);
        for value in values.values_mut() {
            context.load_image_files(value, base_dir)?;
        }
        context.values = values;
        Ok(context)
    }

    fn load_image_files(&mut self, value: &mut Value, base_dir: &Path) -> Result<()> {
        match value {
            Value::Object(object) => {
                let file = if object.len() == 1 {
                    object.get(IMAGE_FILE_KEY).and_then(Value::as_str)
                } else {
                    None
                };
                if let Some(file) = file {
                    let path = base_dir.join(file);
                    debug!("Loading image file {}", path.display());
                    let handle = self.register_image(Image::open(&path)?);
                    *value = image_value(&handle)?;
                    return Ok(());
                }
                for nested in object.values_mut() {
                    self.load_image_files(nested, base_dir)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.load_image_files(item, base_dir)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Insert a serializable value.
    pub fn insert<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|e| ReportError::Context {
            reason: format!("cannot serialize value for '{key}': {e}"),
        })?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Register `image` and bind its handle to `key`.
    pub fn insert_image(&mut self, key: impl Into<String>, image: Image) -> Result<ImageRef> {
        let handle = self.register_image(image);
        self.values.insert(key.into(), image_value(&handle)?);
        Ok(handle)
    }

    /// Register `image` without binding it; place the returned handle
    /// anywhere in the values.
    pub fn register_image(&mut self, image: Image) -> ImageRef {
        let handle = image.handle();
        self.images.entry(handle.digest.clone()).or_insert(image);
        handle
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Top-level value names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    #[must_use]
    pub const fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// The registered image with this digest.
    #[must_use]
    pub fn image(&self, digest: &str) -> Option<&Image> {
        self.images.get(digest)
    }

    /// All registered images, keyed by digest.
    #[must_use]
    pub const fn images(&self) -> &HashMap<String, Image> {
        &self.images
    }

    /// Convert the values into a Tera context.
    pub fn to_tera(&self) -> Result<tera::Context> {
        tera::Context::from_value(Value::Object(self.values.clone())).map_err(|e| {
            ReportError::Context {
                reason: e.to_string(),
            }
        })
    }
}

fn image_value(handle: &ImageRef) -> Result<Value> {
    serde_json::to_value(handle).map_err(|e| ReportError::Context {
        reason: format!("cannot serialize image handle: {e}"),
    })
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
