//! Per-render bookkeeping of embedded images.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::image::Image;
use crate::core::{ReportError, Result};

/// Default container directory for embedded images.
pub const DEFAULT_RESOURCE_DIRECTORY: &str = "Pictures";

/// An image assigned to a container path during a render.
#[derive(Debug, Clone)]
pub struct EmbeddedResource {
    /// Path of the new container entry
    pub path: String,
    /// Media type for package manifests
    pub media_type: &'static str,
    /// Content digest of the payload
    pub digest: String,
    /// Encoded bytes
    pub data: Arc<[u8]>,
}

/// Maps image digests to container paths for one render call.
///
/// The first time a digest is seen a fresh path is allocated and the payload
/// is queued; every later sighting returns the same path. Queued payloads are
/// handed out by [`take_pending`](Self::take_pending) once rendering is done.
#[derive(Debug)]
pub struct EmbeddingSession {
    directory: String,
    supports_images: bool,
    taken: HashSet<String>,
    assigned: HashMap<String, String>,
    pending: Vec<EmbeddedResource>,
}

impl EmbeddingSession {
    /// Start a session for an output container holding `existing_paths`.
    ///
    /// When `supports_images` is false every [`resolve`](Self::resolve) fails.
    pub fn new<'a, I>(
        directory: impl Into<String>,
        existing_paths: I,
        supports_images: bool,
    ) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let directory = directory.into().trim_matches('/').to_string();
        Self {
            directory,
            supports_images,
            taken: existing_paths.into_iter().map(str::to_string).collect(),
            assigned: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Container path assigned to `image`, allocating one on first sight.
    pub fn path_for(&mut self, image: &Image) -> Result<String> {
        if !self.supports_images {
            return Err(ReportError::Resource {
                reason: "this document format cannot reference embedded images".to_string(),
            });
        }

        if let Some(path) = self.assigned.get(image.digest()) {
            debug!("Reusing embedded image {} for {}", path, image.digest());
            return Ok(path.clone());
        }

        let path = self.allocate(image);
        debug!("Embedding image {} as {}", image.digest(), path);
        self.taken.insert(path.clone());
        self.assigned.insert(image.digest().to_string(), path.clone());
        self.pending.push(EmbeddedResource {
            path: path.clone(),
            media_type: image.format().media_type(),
            digest: image.digest().to_string(),
            data: image.shared_data(),
        });
        Ok(path)
    }

    fn allocate(&self, image: &Image) -> String {
        let hex = image.digest().trim_start_matches("sha256:");
        let extension = image.format().extension();
        let prefix = if self.directory.is_empty() {
            String::new()
        } else {
            format!("{}/", self.directory)
        };

        let mut candidate = format!("{prefix}{hex}.{extension}");
        let mut suffix = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{prefix}{hex}-{suffix}.{extension}");
            suffix += 1;
        }
        candidate
    }

    /// Markup fragment that references `image` from the main content.
    pub fn resolve(&mut self, image: &Image) -> Result<String> {
        let path = self.path_for(image)?;
        image_fragment(&path)
    }

    /// Number of distinct images embedded so far.
    #[must_use]
    pub fn embedded_count(&self) -> usize {
        self.assigned.len()
    }

    /// Hand over the payloads queued since the last call.
    pub fn take_pending(&mut self) -> Vec<EmbeddedResource> {
        std::mem::take(&mut self.pending)
    }
}

/// `<draw:image xlink:href="PATH" .../>` for an embedded picture.
pub fn image_fragment(path: &str) -> Result<String> {
    let mut element = BytesStart::new("draw:image");
    element.push_attribute(("xlink:href", path));
    element.push_attribute(("xlink:type", "simple"));
    element.push_attribute(("xlink:show", "embed"));
    element.push_attribute(("xlink:actuate", "onLoad"));

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Empty(element))
        .map_err(|e| ReportError::Resource {
            reason: format!("cannot write image reference: {e}"),
        })?;
    String::from_utf8(writer.into_inner()).map_err(|e| ReportError::Resource {
        reason: format!("cannot write image reference: {e}"),
    })
}
