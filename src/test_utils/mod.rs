//! Test utilities for reportloom
//!
//! Fixture builders for the supported document formats, plus helpers to read
//! rendered tables back as plain text so tests can assert on content instead
//! of exact markup.
//!
//! # Example
//!
//! ```rust,no_run
//! use reportloom::document::{Document, DocumentTemplate};
//! use reportloom::templating::RenderContext;
//! use reportloom::test_utils::{OdsBuilder, row_texts};
//! use serde_json::json;
//!
//! let bytes = OdsBuilder::new().row(&["[[#row c in chars]]{{ c }}[[/row]]"]).build();
//! let template = DocumentTemplate::compile(Document::load(&bytes).unwrap()).unwrap();
//! let context = RenderContext::from_json(json!({"chars": ["a", "b"]})).unwrap();
//! let output = template.render(&context).unwrap();
//! assert_eq!(row_texts(&output.main_content().unwrap()).len(), 2);
//! ```

use std::sync::Once;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::compiler::TableDialect;
use crate::container::{Container, MIMETYPE_ENTRY};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has any effect. With `level` unset, logging is enabled
/// only when `RUST_LOG` is set.
///
/// ```bash
/// RUST_LOG=reportloom=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// A complete 1x1 transparent PNG.
#[must_use]
pub fn tiny_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
        0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
    ]
}

/// A complete 1x1 GIF, distinct from [`tiny_png`].
#[must_use]
pub fn tiny_gif() -> Vec<u8> {
    let mut gif = b"GIF89a".to_vec();
    gif.extend_from_slice(&[
        0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x21, 0xf9,
        0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
        0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
    ]);
    gif
}

const ODS_MIMETYPE: &str = "application/vnd.oasis.opendocument.spreadsheet";

const OFFICE_NAMESPACES: &str = concat!(
    r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
    r#"xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" "#,
    r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" "#,
    r#"xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" "#,
    r#"xmlns:xlink="http://www.w3.org/1999/xlink""#,
);

/// Builds minimal `.ods` packages with one sheet.
///
/// Cell texts are XML-escaped, so `a > b` is stored as `a &gt; b` the way an
/// office application would store it.
#[derive(Debug, Clone, Default)]
pub struct OdsBuilder {
    rows: Vec<Vec<String>>,
    extra: Vec<(String, Vec<u8>)>,
    manifest: bool,
}

impl OdsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            manifest: true,
            ..Self::default()
        }
    }

    /// Append a row with one cell per text.
    #[must_use]
    pub fn row(mut self, cells: &[&str]) -> Self {
        self.rows.push(cells.iter().map(|cell| (*cell).to_string()).collect());
        self
    }

    /// Add an arbitrary entry to the package.
    #[must_use]
    pub fn entry(mut self, path: &str, payload: impl Into<Vec<u8>>) -> Self {
        self.extra.push((path.to_string(), payload.into()));
        self
    }

    /// Leave out `META-INF/manifest.xml`.
    #[must_use]
    pub fn without_manifest(mut self) -> Self {
        self.manifest = false;
        self
    }

    /// The `content.xml` this builder produces.
    #[must_use]
    pub fn content(&self) -> String {
        let rows: String = self
            .rows
            .iter()
            .map(|cells| {
                let cells: String = cells
                    .iter()
                    .map(|text| {
                        format!(
                            r#"<table:table-cell office:value-type="string"><text:p>{}</text:p></table:table-cell>"#,
                            escape(text.as_str())
                        )
                    })
                    .collect();
                format!("<table:table-row>{cells}</table:table-row>")
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content {OFFICE_NAMESPACES} office:version="1.2"><office:body><office:spreadsheet><table:table table:name="Sheet1">{rows}</table:table></office:spreadsheet></office:body></office:document-content>"#
        )
    }

    /// The package as an in-memory container.
    #[must_use]
    pub fn container(&self) -> Container {
        let mut container = Container::new();
        container.write_entry(MIMETYPE_ENTRY, ODS_MIMETYPE.as_bytes().to_vec());
        container.write_entry("content.xml", self.content().into_bytes());
        container.write_entry(
            "styles.xml",
            format!(r#"<office:document-styles {OFFICE_NAMESPACES}/>"#).into_bytes(),
        );
        if self.manifest {
            container.write_entry(
                "META-INF/manifest.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2"><manifest:file-entry manifest:full-path="/" manifest:media-type="{ODS_MIMETYPE}"/><manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/><manifest:file-entry manifest:full-path="styles.xml" manifest:media-type="text/xml"/></manifest:manifest>"#
                )
                .into_bytes(),
            );
        }
        for (path, payload) in &self.extra {
            container.write_entry(path.clone(), payload.clone());
        }
        container
    }

    /// The package as zip bytes.
    ///
    /// # Panics
    ///
    /// If the in-memory zip cannot be written.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        self.container().save().expect("in-memory zip can always be written")
    }
}

/// A flat SpreadsheetML 2003 workbook with one sheet.
#[must_use]
pub fn spreadsheet_ml(rows: &[&[&str]]) -> String {
    let rows: String = rows
        .iter()
        .map(|cells| {
            let cells: String = cells
                .iter()
                .map(|text| {
                    format!(r#"<Cell><Data ss:Type="String">{}</Data></Cell>"#, escape(*text))
                })
                .collect();
            format!("<Row>{cells}</Row>")
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?><Workbook xmlns="urn:schemas-microsoft-com:office:spreadsheet" xmlns:ss="urn:schemas-microsoft-com:office:spreadsheet"><Worksheet ss:Name="Sheet1"><Table>{rows}</Table></Worksheet></Workbook>"#
    )
}

fn is_row(name: &[u8]) -> bool {
    [TableDialect::OpenDocument, TableDialect::SpreadsheetMl2003]
        .iter()
        .any(|dialect| dialect.row_elements().iter().any(|row| row.as_bytes() == name))
}

fn is_cell(name: &[u8]) -> bool {
    [TableDialect::OpenDocument, TableDialect::SpreadsheetMl2003]
        .iter()
        .any(|dialect| dialect.cell_elements().iter().any(|cell| cell.as_bytes() == name))
}

/// The text of every table cell, row by row, entities decoded.
///
/// # Panics
///
/// If `markup` is not well-formed.
#[must_use]
pub fn row_texts(markup: &str) -> Vec<Vec<String>> {
    let mut reader = Reader::from_str(markup);
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut in_cell = false;
    loop {
        match reader.read_event().expect("rendered markup is well-formed") {
            Event::Start(element) if is_row(element.name().as_ref()) => rows.push(Vec::new()),
            Event::Empty(element) if is_row(element.name().as_ref()) => rows.push(Vec::new()),
            Event::Start(element) if is_cell(element.name().as_ref()) => {
                in_cell = true;
                if let Some(row) = rows.last_mut() {
                    row.push(String::new());
                }
            }
            Event::Empty(element) if is_cell(element.name().as_ref()) => {
                if let Some(row) = rows.last_mut() {
                    row.push(String::new());
                }
            }
            Event::End(element) if is_cell(element.name().as_ref()) => in_cell = false,
            Event::Text(text) if in_cell => {
                let text = text.unescape().expect("text has valid entities");
                if let Some(cell) = rows.last_mut().and_then(|row| row.last_mut()) {
                    cell.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    rows
}

/// Each row's cell texts concatenated, one string per row.
#[must_use]
pub fn table_text(markup: &str) -> Vec<String> {
    row_texts(markup).into_iter().map(|cells| cells.concat()).collect()
}
