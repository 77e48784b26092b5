//! Office documents and compiled document templates
//!
//! A [`Document`] is a loaded office file: an OpenDocument package (`.ods`,
//! `.odt`) or a flat SpreadsheetML 2003 workbook. A [`DocumentTemplate`] is a
//! document whose main content has been run through the structural compiler
//! and parsed by a [`TemplateEngine`]; it renders any number of output
//! documents, concurrently if needed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use reportloom::document::{Document, DocumentTemplate};
//! use reportloom::templating::RenderContext;
//! use serde_json::json;
//!
//! # fn example() -> reportloom::core::Result<()> {
//! let template = DocumentTemplate::compile(Document::open("invoice.ods")?)?;
//! let context = RenderContext::from_json(json!({"lines": [{"item": "Tea", "qty": 2}]}))?;
//! template.render(&context)?.save("invoice-0001.ods")?;
//! # Ok(())
//! # }
//! ```

mod manifest;

pub use manifest::MANIFEST_PATH;

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::compiler::{Compilation, Compiler, StructuralRegion, TableDialect};
use crate::config::RenderConfig;
use crate::container::{Container, MIMETYPE_ENTRY};
use crate::core::{ReportError, Result};
use crate::templating::{RenderContext, RenderOptions, TemplateEngine, TeraEngine, render_entry};

const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";
const ODT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";
const SPREADSHEET_ML_NAMESPACE: &str = "urn:schemas-microsoft-com:office:spreadsheet";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// OpenDocument spreadsheet (`.ods`, `.ots`)
    Spreadsheet,
    /// OpenDocument text (`.odt`, `.ott`)
    Text,
    /// Flat SpreadsheetML 2003 workbook (`.xml`)
    SpreadsheetMl2003,
}

impl DocumentKind {
    /// Entry holding the markup that gets compiled and rendered.
    #[must_use]
    pub const fn main_content_path(self) -> &'static str {
        match self {
            Self::Spreadsheet | Self::Text => "content.xml",
            Self::SpreadsheetMl2003 => "workbook.xml",
        }
    }

    #[must_use]
    pub const fn dialect(self) -> TableDialect {
        match self {
            Self::Spreadsheet | Self::Text => TableDialect::OpenDocument,
            Self::SpreadsheetMl2003 => TableDialect::SpreadsheetMl2003,
        }
    }

    /// Whether the format is a zip package rather than a single XML file.
    #[must_use]
    pub const fn is_packaged(self) -> bool {
        !matches!(self, Self::SpreadsheetMl2003)
    }

    /// Whether embedded images can be referenced from the main content.
    #[must_use]
    pub const fn supports_images(self) -> bool {
        self.is_packaged()
    }

    /// The `mimetype` entry of a packaged format.
    #[must_use]
    pub const fn mimetype(self) -> Option<&'static str> {
        match self {
            Self::Spreadsheet => Some(ODS_MIMETYPE),
            Self::Text => Some(ODT_MIMETYPE),
            Self::SpreadsheetMl2003 => None,
        }
    }

    /// Recognize a package `mimetype`, template variants included.
    #[must_use]
    pub fn from_mimetype(mimetype: &str) -> Option<Self> {
        match mimetype.trim().trim_end_matches("-template") {
            ODS_MIMETYPE => Some(Self::Spreadsheet),
            ODT_MIMETYPE => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Spreadsheet => "OpenDocument spreadsheet",
            Self::Text => "OpenDocument text",
            Self::SpreadsheetMl2003 => "SpreadsheetML 2003 workbook",
        })
    }
}

/// A loaded office document.
///
/// Flat formats are held as a one-entry container keyed by
/// [`DocumentKind::main_content_path`].
#[derive(Debug, Clone)]
pub struct Document {
    kind: DocumentKind,
    container: Container,
}

impl Document {
    /// Load a document, detecting its format from the bytes.
    ///
    /// # Errors
    ///
    /// - [`ReportError::ContainerFormat`] / [`ReportError::EntryRead`] for
    ///   broken zip packages
    /// - [`ReportError::UnsupportedDocument`] for packages or XML files of an
    ///   unknown format
    pub fn load(bytes: &[u8]) -> Result<Self> {
        if !bytes.starts_with(ZIP_MAGIC) && looks_like_xml(bytes) {
            return Self::load_flat(bytes);
        }

        let container = Container::load(bytes)?;
        let kind = detect_package_kind(&container)?;
        if !container.entry_exists(kind.main_content_path()) {
            return Err(ReportError::EntryNotFound {
                path: kind.main_content_path().to_string(),
            });
        }
        debug!("Loaded {} with {} entries", kind, container.len());
        Ok(Self { kind, container })
    }

    fn load_flat(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|e| ReportError::UnsupportedDocument {
            reason: format!("XML document is not UTF-8: {e}"),
        })?;
        if !text.contains(SPREADSHEET_ML_NAMESPACE) {
            return Err(ReportError::UnsupportedDocument {
                reason: format!(
                    "XML document does not use the {SPREADSHEET_ML_NAMESPACE} namespace"
                ),
            });
        }
        let kind = DocumentKind::SpreadsheetMl2003;
        let mut container = Container::new();
        container.write_entry(kind.main_content_path(), bytes.to_vec());
        debug!("Loaded {} ({} bytes)", kind, bytes.len());
        Ok(Self { kind, container })
    }

    /// Read and [`load`](Self::load) a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening {}", path.display());
        Self::load(&std::fs::read(path)?)
    }

    /// Serialize the document: a zip package, or the XML text of a flat format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.kind.is_packaged() {
            return self.container.save();
        }
        let path = self.kind.main_content_path();
        self.container
            .entry(path)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ReportError::EntryNotFound {
                path: path.to_string(),
            })
    }

    /// Write [`to_bytes`](Self::to_bytes) to a file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if self.kind.is_packaged() {
            let mut file = BufWriter::new(File::create(path)?);
            self.container.save_to(&mut file)?;
            file.flush()?;
        } else {
            std::fs::write(path, self.to_bytes()?)?;
        }
        info!("Saved {} to {}", self.kind, path.display());
        Ok(())
    }

    /// The main content markup.
    pub fn main_content(&self) -> Result<String> {
        self.container.read_text_entry(self.kind.main_content_path())
    }

    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        self.kind
    }

    #[must_use]
    pub const fn container(&self) -> &Container {
        &self.container
    }

    pub const fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }
}

fn looks_like_xml(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'<')
}

fn detect_package_kind(container: &Container) -> Result<DocumentKind> {
    if let Some(mimetype) = container.entry(MIMETYPE_ENTRY) {
        let mimetype = String::from_utf8_lossy(mimetype);
        return DocumentKind::from_mimetype(&mimetype).ok_or_else(|| {
            ReportError::UnsupportedDocument {
                reason: format!("unsupported package mimetype '{}'", mimetype.trim()),
            }
        });
    }

    // Packages without a mimetype entry: look at the office body element
    let content = container.read_text_entry("content.xml").map_err(|_| {
        ReportError::UnsupportedDocument {
            reason: "package has neither a mimetype nor a content.xml entry".to_string(),
        }
    })?;
    if content.contains("<office:spreadsheet") {
        Ok(DocumentKind::Spreadsheet)
    } else if content.contains("<office:text") {
        Ok(DocumentKind::Text)
    } else {
        Err(ReportError::UnsupportedDocument {
            reason: "content.xml holds neither a spreadsheet nor a text body".to_string(),
        })
    }
}

/// A compiled, parsed document template.
///
/// Compilation happens once; [`render`](Self::render) only reads the template,
/// so one template can serve concurrent renders from several threads.
pub struct DocumentTemplate<E: TemplateEngine = TeraEngine> {
    kind: DocumentKind,
    source: Arc<Container>,
    engine: E,
    template: E::Template,
    compilation: Compilation,
    options: RenderOptions,
}

impl<E: TemplateEngine> fmt::Debug for DocumentTemplate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentTemplate")
            .field("kind", &self.kind)
            .field("entries", &self.source.len())
            .field("regions", &self.compilation.regions.len())
            .finish_non_exhaustive()
    }
}

impl DocumentTemplate<TeraEngine> {
    /// Compile `document` with [`TeraEngine`] and default settings.
    ///
    /// # Errors
    ///
    /// [`ReportError::MalformedMarkup`], [`ReportError::MalformedLoopStructure`]
    /// or [`ReportError::TemplateSyntax`].
    pub fn compile(document: Document) -> Result<Self> {
        Self::compile_with(document, TeraEngine, &RenderConfig::default())
    }
}

impl<E: TemplateEngine> DocumentTemplate<E> {
    /// Compile `document` for `engine` using the given settings.
    pub fn compile_with(document: Document, engine: E, config: &RenderConfig) -> Result<Self> {
        config.validate()?;
        let Document {
            kind,
            mut container,
        } = document;
        container.set_policy(config.container.policy());

        let markup = container.read_text_entry(kind.main_content_path())?;
        let compilation = Compiler::new(kind.dialect()).compile(&markup, engine.loop_syntax())?;
        let template = engine.parse(kind.main_content_path(), &compilation.markup)?;

        info!(
            "Compiled {} template with {} loop region(s)",
            kind,
            compilation.regions.len()
        );
        Ok(Self {
            kind,
            source: Arc::new(container),
            engine,
            template,
            compilation,
            options: RenderOptions {
                resource_directory: config.resources.directory.clone(),
                supports_images: kind.supports_images(),
            },
        })
    }

    /// Render a new document.
    ///
    /// The output starts as a copy of the template's package with the main
    /// content replaced; embedded images are added as new entries and, for
    /// OpenDocument packages, listed in the manifest.
    ///
    /// # Errors
    ///
    /// [`ReportError::Render`], [`ReportError::Resource`] or any error raised
    /// while writing the output. The template is unaffected by failures.
    pub fn render(&self, context: &RenderContext) -> Result<Document> {
        let mut output = self.source.duplicate();
        let report = render_entry(
            &self.engine,
            &self.template,
            context,
            &mut output,
            self.kind.main_content_path(),
            &self.options,
        )?;

        if self.kind.is_packaged()
            && !report.resources.is_empty()
            && output.entry_exists(MANIFEST_PATH)
        {
            let current = output.read_text_entry(MANIFEST_PATH)?;
            if let Some(updated) = manifest::register_resources(&current, &report.resources)? {
                debug!("Listed {} resource(s) in {}", report.resources.len(), MANIFEST_PATH);
                output.write_entry(MANIFEST_PATH, updated.into_bytes());
            }
        }

        Ok(Document {
            kind: self.kind,
            container: output,
        })
    }

    /// Main content after loop relocation, as handed to the engine.
    #[must_use]
    pub fn compiled_markup(&self) -> &str {
        &self.compilation.markup
    }

    /// Every loop the compiler relocated.
    #[must_use]
    pub fn regions(&self) -> &[StructuralRegion] {
        &self.compilation.regions
    }

    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        self.kind
    }

    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }
}
