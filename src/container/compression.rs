//! Per-entry compression decisions for saved containers.

use serde::{Deserialize, Serialize};

/// Extensions of payload classes that are already compressed.
///
/// Deflating these again costs time and usually makes them larger.
pub const STORED_EXTENSIONS: &[&str] = &[
    "zip", "jpeg", "jpg", "png", "gif", "webp", "mp3", "mp4", "avi", "ogg",
];

/// The ODF `mimetype` entry must be stored uncompressed.
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// Fastest deflate level, used unless configured otherwise.
pub const DEFAULT_DEFLATE_LEVEL: u32 = 1;

/// How a single entry is written into the zip stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCompression {
    /// Written as-is
    Stored,
    /// Deflated at the given level (1..=9)
    Deflated(u32),
}

/// Decides the compression of each entry from its path.
///
/// Matching is on the final extension and is case-insensitive, so
/// `Pictures/LOGO.PNG` is stored just like `Pictures/logo.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    deflate_level: u32,
    extra_stored: Vec<String>,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            deflate_level: DEFAULT_DEFLATE_LEVEL,
            extra_stored: Vec::new(),
        }
    }
}

impl CompressionPolicy {
    /// Create a policy with a deflate level and extra stored extensions.
    ///
    /// The level is clamped into `1..=9`; callers that need to reject bad
    /// levels validate them before building the policy.
    pub fn new<I, S>(deflate_level: u32, extra_stored: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            deflate_level: deflate_level.clamp(1, 9),
            extra_stored: extra_stored
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// The deflate level applied to compressible entries.
    #[must_use]
    pub const fn deflate_level(&self) -> u32 {
        self.deflate_level
    }

    /// Compression for the entry at `path`.
    #[must_use]
    pub fn compression_for(&self, path: &str) -> EntryCompression {
        if path == MIMETYPE_ENTRY {
            return EntryCompression::Stored;
        }

        let file_name = path.rsplit('/').next().unwrap_or(path);
        let Some((_, extension)) = file_name.rsplit_once('.') else {
            return EntryCompression::Deflated(self.deflate_level);
        };
        let extension = extension.to_ascii_lowercase();

        if STORED_EXTENSIONS.contains(&extension.as_str())
            || self.extra_stored.iter().any(|extra| *extra == extension)
        {
            EntryCompression::Stored
        } else {
            EntryCompression::Deflated(self.deflate_level)
        }
    }
}
