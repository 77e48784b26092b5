//! Table vocabularies of the supported document formats.

/// Which element names make up table rows and cells.
///
/// Names are compared on the qualified name exactly as written in the markup,
/// so a document must use the conventional prefixes (`table:` for
/// OpenDocument, none or `ss:` for SpreadsheetML).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableDialect {
    /// OpenDocument (`content.xml` of .ods and .odt packages)
    OpenDocument,
    /// Flat SpreadsheetML 2003 workbooks
    SpreadsheetMl2003,
}

impl TableDialect {
    /// Element names that delimit a table row.
    #[must_use]
    pub const fn row_elements(self) -> &'static [&'static str] {
        match self {
            Self::OpenDocument => &["table:table-row"],
            Self::SpreadsheetMl2003 => &["Row", "ss:Row"],
        }
    }

    /// Element names that delimit a table cell.
    #[must_use]
    pub const fn cell_elements(self) -> &'static [&'static str] {
        match self {
            Self::OpenDocument => &["table:table-cell", "table:covered-table-cell"],
            Self::SpreadsheetMl2003 => &["Cell", "ss:Cell"],
        }
    }

    pub(crate) fn unit_of(self, name: &[u8]) -> Option<UnitKind> {
        if self.row_elements().iter().any(|row| row.as_bytes() == name) {
            Some(UnitKind::Row)
        } else if self.cell_elements().iter().any(|cell| cell.as_bytes() == name) {
            Some(UnitKind::Cell)
        } else {
            None
        }
    }
}

/// A structural unit that loop constructs are anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnitKind {
    Row,
    Cell,
}
