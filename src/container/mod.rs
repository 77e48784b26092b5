//! In-memory entry store for zip-packaged documents
//!
//! A [`Container`] holds every entry of a document package as an immutable,
//! shared payload (`Arc<[u8]>`) keyed by its path. Loading reads the whole zip
//! stream up front; saving writes every entry back in load order, choosing the
//! compression of each entry from its extension (see [`CompressionPolicy`]).
//!
//! Duplicating a container clones the payload handles, not the bytes: the
//! renderer starts every output from a duplicate of the template's container
//! and only replaces the entries it produces.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reportloom::container::Container;
//! use std::io::Write;
//!
//! # fn example(bytes: &[u8]) -> reportloom::core::Result<()> {
//! let mut container = Container::load(bytes)?;
//! let content = container.read_text_entry("content.xml")?;
//!
//! let mut writer = container.put_entry("content.xml");
//! writer.write_all(content.replace("draft", "final").as_bytes())?;
//! writer.close();
//!
//! let saved = container.save()?;
//! # let _ = saved;
//! # Ok(())
//! # }
//! ```

mod compression;

pub use compression::{
    CompressionPolicy, DEFAULT_DEFLATE_LEVEL, EntryCompression, MIMETYPE_ENTRY, STORED_EXTENSIONS,
};

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::Arc;

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::{ReportError, Result};

/// Path-to-payload map with a stable entry order.
#[derive(Debug, Clone, Default)]
pub struct Container {
    entries: HashMap<String, Arc<[u8]>>,
    order: Vec<String>,
    policy: CompressionPolicy,
}

impl Container {
    /// Create an empty container with the default compression policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every entry of a zip stream into memory.
    ///
    /// # Errors
    ///
    /// - [`ReportError::ContainerFormat`] if `bytes` is not a zip stream
    /// - [`ReportError::EntryRead`] if an entry yields fewer bytes than its
    ///   declared size or its compressed data is corrupt
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| ReportError::ContainerFormat {
                reason: e.to_string(),
            })?;

        let mut container = Self::new();
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(|e| ReportError::ContainerFormat {
                reason: format!("entry #{index}: {e}"),
            })?;
            let path = file.name().to_string();
            let declared = file.size();

            let mut payload = Vec::with_capacity(usize::try_from(declared).unwrap_or(0));
            file.read_to_end(&mut payload).map_err(|e| ReportError::EntryRead {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            if payload.len() as u64 != declared {
                return Err(ReportError::EntryRead {
                    path,
                    reason: format!("read {} of {declared} declared bytes", payload.len()),
                });
            }

            container.insert_payload(path, Arc::from(payload));
        }

        debug!("Loaded container with {} entries", container.len());
        Ok(container)
    }

    /// Replace the compression policy in place.
    pub fn set_policy(&mut self, policy: CompressionPolicy) {
        self.policy = policy;
    }

    /// The compression policy used by [`save`](Self::save).
    #[must_use]
    pub const fn policy(&self) -> &CompressionPolicy {
        &self.policy
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the container has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entry paths in load/insertion order.
    pub fn entry_paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Whether an entry exists at `path`.
    #[must_use]
    pub fn entry_exists(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Borrow the payload of an entry.
    #[must_use]
    pub fn entry(&self, path: &str) -> Option<&[u8]> {
        self.entries.get(path).map(AsRef::as_ref)
    }

    /// Shared handle to the payload of an entry.
    #[must_use]
    pub fn payload(&self, path: &str) -> Option<Arc<[u8]>> {
        self.entries.get(path).map(Arc::clone)
    }

    /// Remove an entry, returning its payload.
    pub fn remove_entry(&mut self, path: &str) -> Option<Arc<[u8]>> {
        let payload = self.entries.remove(path)?;
        self.order.retain(|existing| existing != path);
        Some(payload)
    }

    /// Open a read stream over an entry.
    ///
    /// The stream shares the payload; later writes to the same path do not
    /// affect a reader that is already open.
    pub fn get_entry(&self, path: &str) -> Result<EntryReader> {
        let payload = self.entries.get(path).ok_or_else(|| ReportError::EntryNotFound {
            path: path.to_string(),
        })?;
        Ok(EntryReader {
            inner: Cursor::new(Arc::clone(payload)),
        })
    }

    /// Read an entry as UTF-8 text.
    pub fn read_text_entry(&self, path: &str) -> Result<String> {
        let payload = self.entry(path).ok_or_else(|| ReportError::EntryNotFound {
            path: path.to_string(),
        })?;
        String::from_utf8(payload.to_vec()).map_err(|e| ReportError::EntryRead {
            path: path.to_string(),
            reason: format!("not valid UTF-8: {e}"),
        })
    }

    /// Open a write stream that replaces (or creates) the entry at `path`.
    ///
    /// The entry becomes visible when the writer is flushed, closed, or dropped.
    pub fn put_entry(&mut self, path: impl Into<String>) -> EntryWriter<'_> {
        EntryWriter {
            container: self,
            path: path.into(),
            buffer: Vec::new(),
            closed: false,
        }
    }

    /// Replace (or create) an entry in one step.
    pub fn write_entry(&mut self, path: impl Into<String>, payload: impl Into<Arc<[u8]>>) {
        self.insert_payload(path.into(), payload.into());
    }

    fn insert_payload(&mut self, path: String, payload: Arc<[u8]>) {
        if !self.entries.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.entries.insert(path, payload);
    }

    /// Copy every path/payload pair into `other`, sharing the payloads.
    ///
    /// Entries already present in `other` are replaced; its policy is kept.
    pub fn copy_to(&self, other: &mut Self) {
        for path in &self.order {
            if let Some(payload) = self.entries.get(path) {
                other.insert_payload(path.clone(), Arc::clone(payload));
            }
        }
    }

    /// A copy-on-write duplicate of this container.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// Serialize every entry, in order, to a zip byte stream.
    pub fn save(&self) -> Result<Vec<u8>> {
        let cursor = self.write_zip(Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Serialize every entry to `writer`.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.save()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    fn write_zip<W: Write + io::Seek>(&self, sink: W) -> Result<W> {
        let mut zip = ZipWriter::new(sink);
        for path in &self.order {
            let Some(payload) = self.entries.get(path) else {
                continue;
            };

            let options = match self.policy.compression_for(path) {
                EntryCompression::Stored => {
                    SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
                }
                EntryCompression::Deflated(level) => SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .compression_level(Some(i64::from(level))),
            };

            if path.ends_with('/') && payload.is_empty() {
                zip.add_directory(path.as_str(), options).map_err(write_error)?;
                continue;
            }

            zip.start_file(path.as_str(), options).map_err(write_error)?;
            zip.write_all(payload).map_err(write_error)?;
        }

        let sink = zip.finish().map_err(write_error)?;
        debug!("Saved container with {} entries", self.order.len());
        Ok(sink)
    }
}

fn write_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::ContainerWrite {
        reason: e.to_string(),
    }
}

/// Read stream over one entry's payload.
#[derive(Debug)]
pub struct EntryReader {
    inner: Cursor<Arc<[u8]>>,
}

impl Read for EntryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Buffered write stream for one entry.
///
/// Borrowing the container mutably keeps a second writer from opening on the
/// same container while this one is alive.
#[derive(Debug)]
pub struct EntryWriter<'a> {
    container: &'a mut Container,
    path: String,
    buffer: Vec<u8>,
    closed: bool,
}

impl EntryWriter<'_> {
    /// Path of the entry being written.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Publish the final bytes and end the stream.
    pub fn close(mut self) {
        self.publish_final();
    }

    fn publish_final(&mut self) {
        let payload: Arc<[u8]> = Arc::from(std::mem::take(&mut self.buffer));
        self.container.insert_payload(self.path.clone(), payload);
        self.closed = true;
    }
}

impl Write for EntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.container
            .insert_payload(self.path.clone(), Arc::from(self.buffer.as_slice()));
        Ok(())
    }
}

impl Drop for EntryWriter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.publish_final();
        }
    }
}
