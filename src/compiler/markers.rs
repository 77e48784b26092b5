//! Loop marker syntax
//!
//! Loop markers are plain text typed by the template author into table cells.
//! Syntax version 1 ([`MARKER_SYNTAX_VERSION`]):
//!
//! | Marker                          | Meaning                  |
//! |---------------------------------|--------------------------|
//! | `[[#row ITEM in EXPRESSION]]`   | start of a row loop      |
//! | `[[/row]]`                      | end of a row loop        |
//! | `[[#col ITEM in EXPRESSION]]`   | start of a column loop   |
//! | `[[/col]]`                      | end of a column loop     |
//!
//! `column` is accepted wherever `col` is. `ITEM` must be an identifier.
//! `EXPRESSION` runs up to the closing `]]`; XML entity references in it are
//! decoded (so `a &gt; b` reaches the engine as `a > b`), everything else is
//! copied verbatim. A marker must sit inside a single text run: office
//! applications split text at formatting changes, and a marker broken across
//! runs is reported instead of being silently ignored.

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::{MarkupPosition, ReportError, Result};

/// Version of the marker syntax understood by this compiler.
pub const MARKER_SYNTAX_VERSION: u32 = 1;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\[\[\s*(?:#\s*(?P<open>row|column|col)\s+(?P<item>[A-Za-z_][A-Za-z0-9_]*)\s+in\s+(?P<expr>.+?)|/\s*(?P<close>row|column|col))\s*\]\]",
    )
    .expect("marker pattern is a valid regex")
});

static MARKER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[\s*[#/]").expect("marker prefix is a valid regex"));

/// The structural unit a loop repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    /// Repeats whole table rows
    Row,
    /// Repeats cells within one row
    Column,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => write!(f, "row"),
            Self::Column => write!(f, "col"),
        }
    }
}

/// Whether a marker opens or closes a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerRole {
    /// `[[#kind item in expression]]`
    Start {
        /// Loop variable name
        item: String,
        /// Iterable expression, entity references decoded
        expression: String,
    },
    /// `[[/kind]]`
    End,
}

/// A loop marker found in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Row or column loop
    pub kind: LoopKind,
    /// Start or end
    pub role: MarkerRole,
    /// Byte range of the marker text in the markup
    pub span: Range<usize>,
}

impl Marker {
    /// Whether this marker opens a loop.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        matches!(self.role, MarkerRole::Start { .. })
    }
}

fn kind_of(keyword: &str) -> LoopKind {
    if keyword == "row" {
        LoopKind::Row
    } else {
        LoopKind::Column
    }
}

/// Find every marker in `markup[range]`.
///
/// Offsets in the returned spans are relative to the whole `markup`. Fails
/// with [`ReportError::MalformedLoopStructure`] when the run holds the
/// beginning of a marker that never completes.
pub fn scan(markup: &str, range: Range<usize>) -> Result<Vec<Marker>> {
    let base = range.start;
    let text = &markup[range];
    let mut markers = Vec::new();
    let mut gap_start = 0;

    for captures in MARKER.captures_iter(text) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        check_gap(markup, base, &text[gap_start..whole.start()], gap_start)?;
        gap_start = whole.end();

        let span = base + whole.start()..base + whole.end();
        let marker = if let Some(open) = captures.name("open") {
            let item = captures.name("item").map_or("", |m| m.as_str()).to_string();
            let raw = captures.name("expr").map_or("", |m| m.as_str()).trim();
            let expression = quick_xml::escape::unescape(raw)
                .map_err(|e| {
                    ReportError::malformed_loop(
                        format!("invalid entity reference in loop expression '{raw}': {e}"),
                        MarkupPosition::locate(markup, span.start),
                    )
                })?
                .into_owned();
            Marker {
                kind: kind_of(open.as_str()),
                role: MarkerRole::Start { item, expression },
                span,
            }
        } else {
            let close = captures.name("close").map_or("", |m| m.as_str());
            Marker {
                kind: kind_of(close),
                role: MarkerRole::End,
                span,
            }
        };
        markers.push(marker);
    }
    check_gap(markup, base, &text[gap_start..], gap_start)?;

    Ok(markers)
}

fn check_gap(markup: &str, base: usize, gap: &str, gap_offset: usize) -> Result<()> {
    if let Some(prefix) = MARKER_PREFIX.find(gap) {
        let offset = base + gap_offset + prefix.start();
        return Err(ReportError::malformed_loop(
            "incomplete loop marker; a marker must be written as one piece of unformatted text \
             ending with ']]'",
            MarkupPosition::locate(markup, offset),
        ));
    }
    Ok(())
}
