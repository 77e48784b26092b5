//! Embedding of binary images into rendered documents
//!
//! Render data refers to images through [`ImageRef`] handles. When the
//! rendering pipeline meets a handle it asks the render's
//! [`EmbeddingSession`] for the image's container path. The session allocates
//! one path per distinct image content (`<directory>/<sha256 hex>.<ext>`),
//! queues the payload once, and returns the reference fragment that replaces
//! the handle in the markup. After rendering the queued payloads are written
//! into the output container.

mod image;
mod session;

pub use image::{IMAGE_HANDLE_KEY, Image, ImageFormat, ImageRef, content_digest};
pub use session::{DEFAULT_RESOURCE_DIRECTORY, EmbeddedResource, EmbeddingSession, image_fragment};
