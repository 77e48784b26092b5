//! `META-INF/manifest.xml` bookkeeping for OpenDocument packages.

use std::collections::HashSet;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};

use crate::core::{ReportError, Result};
use crate::resources::EmbeddedResource;

/// Manifest entry path inside an OpenDocument package.
pub const MANIFEST_PATH: &str = "META-INF/manifest.xml";

const MANIFEST_CLOSE: &str = "</manifest:manifest>";

fn manifest_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::EntryRead {
        path: MANIFEST_PATH.to_string(),
        reason: e.to_string(),
    }
}

/// Every `manifest:full-path` already listed.
fn listed_paths(manifest: &str) -> Result<HashSet<String>> {
    let mut reader = Reader::from_str(manifest);
    let mut paths = HashSet::new();
    loop {
        match reader.read_event().map_err(manifest_error)? {
            Event::Start(element) | Event::Empty(element)
                if element.name().as_ref() == b"manifest:file-entry" =>
            {
                for attribute in element.attributes() {
                    let attribute = attribute.map_err(manifest_error)?;
                    if attribute.key.as_ref() == b"manifest:full-path" {
                        let value = attribute.unescape_value().map_err(manifest_error)?;
                        paths.insert(value.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paths)
}

fn file_entry(resource: &EmbeddedResource) -> Result<String> {
    let mut element = BytesStart::new("manifest:file-entry");
    element.push_attribute(("manifest:full-path", resource.path.as_str()));
    element.push_attribute(("manifest:media-type", resource.media_type));

    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Empty(element))
        .map_err(manifest_error)?;
    String::from_utf8(writer.into_inner()).map_err(manifest_error)
}

/// Add a `manifest:file-entry` for each resource not yet listed.
///
/// Returns the rewritten manifest, or `None` when nothing had to change.
pub(crate) fn register_resources(
    manifest: &str,
    resources: &[EmbeddedResource],
) -> Result<Option<String>> {
    let listed = listed_paths(manifest)?;
    let mut additions = String::new();
    for resource in resources.iter().filter(|r| !listed.contains(&r.path)) {
        additions.push_str(&file_entry(resource)?);
    }
    if additions.is_empty() {
        return Ok(None);
    }

    let close = manifest
        .rfind(MANIFEST_CLOSE)
        .ok_or_else(|| manifest_error(format!("missing {MANIFEST_CLOSE}")))?;
    let mut updated = String::with_capacity(manifest.len() + additions.len());
    updated.push_str(&manifest[..close]);
    updated.push_str(&additions);
    updated.push_str(&manifest[close..]);
    Ok(Some(updated))
}
