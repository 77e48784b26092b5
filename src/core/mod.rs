//! Core types shared by every layer of reportloom
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! - [`ReportError`] - Enumerated error types covering every failure of the
//!   compile and render pipeline
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! ## `position` - Markup Positions
//!
//! - [`MarkupPosition`] - Byte offset plus line and column, attached to
//!   structural errors so template authors can find the faulty marker
//!
//! # Examples
//!
//! ```rust
//! use reportloom::core::{ReportError, user_friendly_error};
//! use anyhow::Result;
//!
//! fn load_template() -> Result<()> {
//!     Err(ReportError::ContainerFormat {
//!         reason: "invalid Zip archive".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = load_template() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.suggestion.is_some());
//! }
//! ```

pub mod error;
pub mod position;

pub use error::{ErrorContext, ReportError, user_friendly_error};
pub use position::MarkupPosition;

/// Result alias used by the library layers.
pub type Result<T, E = ReportError> = std::result::Result<T, E>;
