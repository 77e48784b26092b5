//! Error handling for reportloom
//!
//! This module provides the error type shared by every layer of the report
//! pipeline and the user-friendly reporting used by the CLI. The error system
//! follows two principles:
//! 1. **Strongly-typed errors** so callers can tell a broken container from a
//!    broken template without parsing messages
//! 2. **User-friendly messages** with actionable suggestions for template authors
//!
//! # Error Categories
//!
//! - **Container**: [`ReportError::ContainerFormat`], [`ReportError::EntryRead`],
//!   [`ReportError::EntryNotFound`], [`ReportError::ContainerWrite`]
//! - **Compilation**: [`ReportError::MalformedLoopStructure`],
//!   [`ReportError::MalformedMarkup`]
//! - **Templating**: [`ReportError::TemplateSyntax`], [`ReportError::Render`],
//!   [`ReportError::Context`]
//! - **Resources**: [`ReportError::Resource`]
//! - **Setup**: [`ReportError::UnsupportedDocument`], [`ReportError::Config`],
//!   [`ReportError::Io`]
//!
//! Every error is terminal for the compile or render call that raised it. None
//! of them describe transient conditions, so nothing in the crate retries.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reportloom::core::{ReportError, user_friendly_error};
//!
//! let error = ReportError::EntryNotFound {
//!     path: "content.xml".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // Shows colored error with suggestions
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use super::position::MarkupPosition;

/// The main error type for reportloom operations
///
/// Lower layers (the entry store and the structural compiler) never catch and
/// suppress these; each failure travels to the caller with enough positional
/// or diagnostic context to locate the faulty marker, entry, or template
/// expression.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The input bytes are not a readable zip container
    ///
    /// Raised by [`Container::load`](crate::container::Container::load) when the
    /// central directory cannot be parsed.
    #[error("Not a valid document container: {reason}")]
    ContainerFormat {
        /// Description of what the zip reader rejected
        reason: String,
    },

    /// An entry declared in the container could not be read completely
    ///
    /// Happens on short reads (fewer bytes than the declared size) and on
    /// corrupt compressed data.
    #[error("Failed to read container entry '{path}': {reason}")]
    EntryRead {
        /// Path of the entry inside the container
        path: String,
        /// Why the read failed
        reason: String,
    },

    /// A requested entry does not exist in the container
    #[error("Container entry '{path}' not found")]
    EntryNotFound {
        /// Path of the missing entry
        path: String,
    },

    /// Serializing the container back to a zip stream failed
    #[error("Failed to write container: {reason}")]
    ContainerWrite {
        /// Description of the zip writer failure
        reason: String,
    },

    /// The input is neither a supported package nor a supported flat XML file
    #[error("Unsupported document: {reason}")]
    UnsupportedDocument {
        /// Why the document was rejected
        reason: String,
    },

    /// Loop markers are unbalanced, crossing, or span illegal boundaries
    ///
    /// # Fields
    /// - `message`: What is wrong with the marker
    /// - `position`: Approximate position of the offending marker in the
    ///   main content markup
    #[error("Malformed loop structure at {position}: {message}")]
    MalformedLoopStructure {
        /// What is wrong with the marker
        message: String,
        /// Position of the offending marker
        position: MarkupPosition,
    },

    /// The main content markup is not well-formed XML
    #[error("Malformed markup at {position}: {message}")]
    MalformedMarkup {
        /// The XML reader's diagnostic
        message: String,
        /// Where the reader gave up
        position: MarkupPosition,
    },

    /// The compiled template could not be parsed by the template engine
    ///
    /// Carries every diagnostic in encounter order so template authors see all
    /// problems in a single pass. The display form joins them with newlines.
    #[error("Template syntax error:\n{}", diagnostics.join("\n"))]
    TemplateSyntax {
        /// All syntax diagnostics, in encounter order
        diagnostics: Vec<String>,
    },

    /// The template engine failed while evaluating the template
    #[error("Template rendering failed: {message}")]
    Render {
        /// The engine's own diagnostic chain
        message: String,
        /// Context names close to an undefined variable, if any
        suggestions: Vec<String>,
    },

    /// A binary resource could not be embedded into the output document
    #[error("Cannot embed resource: {reason}")]
    Resource {
        /// Why embedding failed
        reason: String,
    },

    /// The render context could not be built from the supplied data
    #[error("Invalid render context: {reason}")]
    Context {
        /// What is wrong with the data
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// I/O error from the standard library
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for errors that have no dedicated variant
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

impl ReportError {
    /// Shorthand for a [`ReportError::MalformedLoopStructure`].
    pub fn malformed_loop(message: impl Into<String>, position: MarkupPosition) -> Self {
        Self::MalformedLoopStructure {
            message: message.into(),
            position,
        }
    }
}

/// Error wrapper with a suggestion and details for CLI display
///
/// # Examples
///
/// ```rust,no_run
/// use reportloom::core::{ErrorContext, ReportError};
///
/// let context = ErrorContext::new(ReportError::EntryNotFound {
///     path: "content.xml".to_string(),
/// })
/// .with_suggestion("Check that the template was saved as an OpenDocument file")
/// .with_details("The main content entry holds the document body");
///
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: ReportError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: ReportError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions are displayed in green in the terminal.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    ///
    /// Details are displayed in yellow in the terminal.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`ReportError`] and [`std::io::Error`] anywhere at the top of the
/// chain; everything else is reported with its full cause chain.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    // Downcasting sees through context layers, so the typed shortcuts are
    // only taken when nothing was attached
    let outermost = error.chain().next();
    let bare_report = outermost.is_some_and(|e| e.is::<ReportError>());
    let bare_io = outermost.is_some_and(|e| e.is::<std::io::Error>());

    let error = if bare_report {
        match error.downcast::<ReportError>() {
            Ok(report_error) => return create_error_context(report_error),
            Err(error) => error,
        }
    } else {
        error
    };

    let error = if bare_io {
        match error.downcast::<std::io::Error>() {
            Ok(io_error) => return io_error_context(io_error),
            Err(error) => error,
        }
    } else {
        error
    };

    // Keep the context chain: the CLI attaches the file being processed
    if let Some(report_error) = error.chain().find_map(|cause| cause.downcast_ref::<ReportError>())
    {
        let mut ctx = ErrorContext::new(ReportError::Other {
            message: format_chain(&error),
        });
        if let Some(suggestion) = suggestion_for(report_error) {
            ctx = ctx.with_suggestion(suggestion);
        }
        return ctx;
    }

    ErrorContext::new(ReportError::Other {
        message: format_chain(&error),
    })
}

fn io_error_context(io_error: std::io::Error) -> ErrorContext {
    let suggestion = match io_error.kind() {
        std::io::ErrorKind::NotFound => "Check that the file exists and the path is correct",
        std::io::ErrorKind::PermissionDenied => {
            "Check file ownership and permissions of the input and output paths"
        }
        _ => "Check the file paths and available disk space",
    };
    ErrorContext::new(ReportError::Io(io_error)).with_suggestion(suggestion)
}

fn format_chain(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn suggestion_for(error: &ReportError) -> Option<String> {
    let suggestion = match error {
        ReportError::ContainerFormat { .. } => {
            "Make sure the template is saved as .ods/.odt (a zip package) or as SpreadsheetML 2003 XML"
                .to_string()
        }
        ReportError::EntryRead { .. } => {
            "The file looks truncated or corrupt. Re-save it from the office application".to_string()
        }
        ReportError::EntryNotFound { path } => {
            format!("The document has no '{path}' entry. Re-save it from the office application")
        }
        ReportError::MalformedLoopStructure { .. } => {
            "Loop markers must be balanced: [[#row item in items]] ... [[/row]] and \
             [[#col item in items]] ... [[/col]]. A column loop must start and end in the same row"
                .to_string()
        }
        ReportError::MalformedMarkup { .. } => {
            "The document body is not well-formed XML. Re-save it from the office application"
                .to_string()
        }
        ReportError::TemplateSyntax { .. } => {
            "Check template syntax: variables use {{ var }}, control flow uses {% %}. \
             Unclosed delimiters are the most common cause"
                .to_string()
        }
        ReportError::Render { suggestions, .. } if !suggestions.is_empty() => {
            format!("Did you mean one of these? {}", suggestions.join(", "))
        }
        ReportError::Render { .. } => {
            "Ensure every variable referenced in the template exists in the data file".to_string()
        }
        ReportError::Resource { .. } => {
            "Images can only be embedded into OpenDocument templates (.ods/.odt)".to_string()
        }
        ReportError::Context { .. } => {
            "The data file must contain a JSON object at the top level".to_string()
        }
        ReportError::Config { .. } => {
            "Check the TOML syntax of the configuration file; deflate_level must be between 1 and 9"
                .to_string()
        }
        ReportError::UnsupportedDocument { .. } => {
            "Supported templates: OpenDocument spreadsheet (.ods), OpenDocument text (.odt), \
             SpreadsheetML 2003 (.xml)"
                .to_string()
        }
        ReportError::ContainerWrite { .. } | ReportError::Io(_) => {
            "Check the output path and available disk space".to_string()
        }
        ReportError::Other { .. } => return None,
    };
    Some(suggestion)
}

/// Create the [`ErrorContext`] for a specific [`ReportError`]
fn create_error_context(error: ReportError) -> ErrorContext {
    let suggestion = suggestion_for(&error);
    let details = match &error {
        ReportError::TemplateSyntax { diagnostics } => Some(format!(
            "{} problem(s) reported by the template engine",
            diagnostics.len()
        )),
        ReportError::MalformedLoopStructure { position, .. } => Some(format!(
            "The offending marker is near line {}, column {} of the main content",
            position.line, position.column
        )),
        ReportError::Render { .. } => {
            Some("Template errors occur when the engine cannot evaluate an expression".to_string())
        }
        _ => None,
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(suggestion) = suggestion {
        ctx = ctx.with_suggestion(suggestion);
    }
    if let Some(details) = details {
        ctx = ctx.with_details(details);
    }
    ctx
}
