//! Positions inside main-content markup.

use serde::Serialize;
use std::fmt;

/// A byte offset in a markup string together with its 1-based line and column.
///
/// Columns count characters, not bytes, so positions reported for markup with
/// non-ASCII text match what an editor shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct MarkupPosition {
    /// Byte offset from the start of the markup
    pub offset: usize,
    /// 1-based line number
    pub line: usize,
    /// 1-based column number, in characters
    pub column: usize,
}

impl MarkupPosition {
    /// Compute the position of `offset` within `text`.
    ///
    /// Offsets past the end are clamped to the end of the text. Offsets that
    /// fall inside a multi-byte character are moved back to its start.
    #[must_use]
    pub fn locate(text: &str, offset: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let before = &text[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;

        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for MarkupPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}
