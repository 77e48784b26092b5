//! Rendering of one parsed template into one container entry.

use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use super::context::RenderContext;
use super::engine::TemplateEngine;
use super::interceptors::InterceptorChain;
use crate::container::Container;
use crate::core::{ReportError, Result};
use crate::resources::{DEFAULT_RESOURCE_DIRECTORY, EmbeddedResource, EmbeddingSession};

/// Settings for a single render.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Container directory that receives embedded images
    pub resource_directory: String,
    /// Whether the output format can reference embedded images
    pub supports_images: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            resource_directory: DEFAULT_RESOURCE_DIRECTORY.to_string(),
            supports_images: true,
        }
    }
}

/// What a successful render produced.
#[derive(Debug, Clone)]
pub struct RenderReport {
    /// Entry that received the rendered markup
    pub entry: String,
    /// Size of the rendered markup
    pub bytes_written: usize,
    /// Images written into the container, in first-use order
    pub resources: Vec<EmbeddedResource>,
}

/// Counts bytes on their way into an entry writer.
struct CountingWriter<W> {
    inner: W,
    written: usize,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Render `template` against `context` into `entry_path` of `output`.
///
/// Every inserted value runs through the standard interceptor chain (escape,
/// then embed images). Embedded images are added to `output` after the
/// markup has been written.
///
/// # Errors
///
/// Any engine or interceptor failure. On failure `output` is left exactly as
/// it was before the call.
pub fn render_entry<E>(
    engine: &E,
    template: &E::Template,
    context: &RenderContext,
    output: &mut Container,
    entry_path: &str,
    options: &RenderOptions,
) -> Result<RenderReport>
where
    E: TemplateEngine + ?Sized,
{
    debug!("Rendering entry '{}'", entry_path);

    let session = Arc::new(Mutex::new(EmbeddingSession::new(
        options.resource_directory.as_str(),
        output.entry_paths(),
        options.supports_images,
    )));
    let chain = Arc::new(InterceptorChain::standard(
        context.images().clone(),
        Arc::clone(&session),
    ));

    let previous = output.payload(entry_path);
    // The writer borrows `output`; it must be gone before the entry is
    // restored or resources are added
    let (rendered, bytes_written) = {
        let mut writer = CountingWriter {
            inner: output.put_entry(entry_path),
            written: 0,
        };
        let rendered = engine.render(template, context, &mut writer, chain);
        let written = writer.written;
        writer.inner.close();
        (rendered, written)
    };

    if let Err(e) = rendered {
        match previous {
            Some(payload) => output.write_entry(entry_path, payload),
            None => {
                output.remove_entry(entry_path);
            }
        }
        return Err(e);
    }

    let resources = session
        .lock()
        .map_err(|_| ReportError::Resource {
            reason: "embedding session is unavailable after an earlier failure".to_string(),
        })?
        .take_pending();
    for resource in &resources {
        output.write_entry(resource.path.clone(), Arc::clone(&resource.data));
    }

    info!(
        "Rendered '{}' ({} bytes, {} embedded image(s))",
        entry_path,
        bytes_written,
        resources.len()
    );
    Ok(RenderReport {
        entry: entry_path.to_string(),
        bytes_written,
        resources,
    })
}
