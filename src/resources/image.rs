//! Binary images and the handles that stand for them in render data.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::core::{ReportError, Result};

/// Key of the object that marks an image handle in render data.
pub const IMAGE_HANDLE_KEY: &str = "$image";

/// Image encodings recognized by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    WebP,
    Svg,
}

impl ImageFormat {
    /// Detect the format from the leading bytes of `data`.
    #[must_use]
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if data.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.starts_with(b"BM") && data.len() > 14 {
            Some(Self::Bmp)
        } else if data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else if looks_like_svg(data) {
            Some(Self::Svg)
        } else {
            None
        }
    }

    /// File extension used for embedded copies.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::WebP => "webp",
            Self::Svg => "svg",
        }
    }

    /// IANA media type, as recorded in package manifests.
    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::WebP => "image/webp",
            Self::Svg => "image/svg+xml",
        }
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let head = &data[..data.len().min(1024)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    (text.starts_with("<?xml") || text.starts_with("<svg") || text.starts_with("<!--"))
        && text.contains("<svg")
}

/// An image supplied as render data.
///
/// Identity is the SHA-256 digest of the bytes: two images with equal content
/// are the same image, however they were loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    data: Arc<[u8]>,
    format: ImageFormat,
    digest: String,
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("digest", &self.digest)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Image {
    /// Wrap encoded image bytes, detecting the format from their content.
    ///
    /// # Errors
    ///
    /// [`ReportError::Resource`] if the bytes are not a recognized image.
    pub fn from_bytes(data: impl Into<Arc<[u8]>>) -> Result<Self> {
        let data = data.into();
        let format = ImageFormat::sniff(&data).ok_or_else(|| ReportError::Resource {
            reason: "unrecognized image format (expected PNG, JPEG, GIF, BMP, WebP or SVG)"
                .to_string(),
        })?;
        Ok(Self::with_format(data, format))
    }

    /// Wrap bytes whose format is already known.
    pub fn with_format(data: impl Into<Arc<[u8]>>, format: ImageFormat) -> Self {
        let data = data.into();
        let digest = content_digest(&data);
        Self {
            data,
            format,
            digest,
        }
    }

    /// Read an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| ReportError::Resource {
            reason: format!("cannot read image '{}': {e}", path.display()),
        })?;
        Self::from_bytes(data).map_err(|e| match e {
            ReportError::Resource { reason } => ReportError::Resource {
                reason: format!("{}: {reason}", path.display()),
            },
            other => other,
        })
    }

    /// Encoded bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the encoded bytes.
    #[must_use]
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    #[must_use]
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// Content digest in `sha256:<hex>` form.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// The handle that refers to this image in render data.
    #[must_use]
    pub fn handle(&self) -> ImageRef {
        ImageRef {
            digest: self.digest.clone(),
        }
    }
}

/// Compute the `sha256:<hex>` digest of `data`.
#[must_use]
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Reference to an image registered with a render context.
///
/// Serializes as `{"$image": "sha256:<hex>"}`, so it can sit anywhere in the
/// render data, including inside records and sequences that loops iterate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(rename = "$image")]
    pub digest: String,
}

impl ImageRef {
    /// The digest of an image handle, if `value` is one.
    #[must_use]
    pub fn digest_of(value: &Value) -> Option<&str> {
        let object = value.as_object()?;
        if object.len() != 1 {
            return None;
        }
        object.get(IMAGE_HANDLE_KEY)?.as_str()
    }
}
