//! Tokenization of main-content markup into structural nodes.

use std::collections::HashMap;
use std::ops::Range;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::dialect::{TableDialect, UnitKind};
use crate::core::{MarkupPosition, ReportError, Result};

/// A row or cell element with the byte span of its whole markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Unit {
    pub kind: UnitKind,
    /// Offset of the `<` of the start tag
    pub start: usize,
    /// Offset just past the `>` of the end tag
    pub end: usize,
    /// Element id of the enclosing element
    pub parent: Option<usize>,
    /// Element id of the innermost enclosing row
    pub row: Option<usize>,
}

/// Character data between two tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextRun {
    pub range: Range<usize>,
    /// Element id of the innermost enclosing row
    pub row: Option<usize>,
    /// Element id of the innermost enclosing cell
    pub cell: Option<usize>,
}

/// Rows, cells and text runs of a markup document.
///
/// Units are keyed by element id, a counter assigned to elements in
/// document order.
#[derive(Debug, Default)]
pub(crate) struct Structure {
    pub units: HashMap<usize, Unit>,
    pub runs: Vec<TextRun>,
}

struct OpenElement {
    id: usize,
    start: usize,
    kind: Option<UnitKind>,
    parent: Option<usize>,
}

fn innermost(stack: &[OpenElement], kind: UnitKind) -> Option<usize> {
    stack
        .iter()
        .rev()
        .find(|open| open.kind == Some(kind))
        .map(|open| open.id)
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

/// Offset of the `<` that opened the markup event read between `before` and `end`.
fn tag_start(markup: &str, before: usize, end: usize) -> usize {
    let bytes = markup.as_bytes();
    if bytes.get(before) == Some(&b'<') {
        before
    } else if before > 0 && bytes.get(before - 1) == Some(&b'<') {
        before - 1
    } else {
        markup
            .get(before..end)
            .and_then(|tag| tag.find('<'))
            .map_or(before, |i| before + i)
    }
}

impl Structure {
    /// Tokenize `markup`, failing with [`ReportError::MalformedMarkup`] when it
    /// is not well-formed.
    pub(crate) fn parse(markup: &str, dialect: TableDialect) -> Result<Self> {
        let mut reader = Reader::from_str(markup);
        let mut structure = Self::default();
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut next_id = 0;
        let mut last_end = 0;

        loop {
            let before = position(&reader);
            let event = reader.read_event().map_err(|e| ReportError::MalformedMarkup {
                message: e.to_string(),
                position: MarkupPosition::locate(markup, position(&reader)),
            })?;
            let end = position(&reader).min(markup.len());

            match event {
                Event::Eof => break,
                Event::Start(_)
                | Event::End(_)
                | Event::Empty(_)
                | Event::Comment(_)
                | Event::CData(_)
                | Event::Decl(_)
                | Event::PI(_)
                | Event::DocType(_) => {}
                _ => continue,
            }

            let start = tag_start(markup, before, end);
            structure.push_run(&stack, last_end, start);
            last_end = end;

            match event {
                Event::Start(tag) => {
                    let kind = dialect.unit_of(tag.name().as_ref());
                    stack.push(OpenElement {
                        id: next_id,
                        start,
                        kind,
                        parent: stack.last().map(|open| open.id),
                    });
                    next_id += 1;
                }
                Event::End(_) => {
                    let Some(open) = stack.pop() else {
                        return Err(ReportError::MalformedMarkup {
                            message: "end tag without a matching start tag".to_string(),
                            position: MarkupPosition::locate(markup, start),
                        });
                    };
                    if let Some(kind) = open.kind {
                        structure.units.insert(
                            open.id,
                            Unit {
                                kind,
                                start: open.start,
                                end,
                                parent: open.parent,
                                row: innermost(&stack, UnitKind::Row),
                            },
                        );
                    }
                }
                Event::Empty(tag) => {
                    let id = next_id;
                    next_id += 1;
                    if let Some(kind) = dialect.unit_of(tag.name().as_ref()) {
                        structure.units.insert(
                            id,
                            Unit {
                                kind,
                                start,
                                end,
                                parent: stack.last().map(|open| open.id),
                                row: innermost(&stack, UnitKind::Row),
                            },
                        );
                    }
                }
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ReportError::MalformedMarkup {
                message: "element is never closed".to_string(),
                position: MarkupPosition::locate(markup, open.start),
            });
        }
        structure.push_run(&stack, last_end, markup.len());

        Ok(structure)
    }

    fn push_run(&mut self, stack: &[OpenElement], start: usize, end: usize) {
        if start < end {
            self.runs.push(TextRun {
                range: start..end,
                row: innermost(stack, UnitKind::Row),
                cell: innermost(stack, UnitKind::Cell),
            });
        }
    }

    pub(crate) fn unit(&self, id: Option<usize>) -> Option<&Unit> {
        id.and_then(|id| self.units.get(&id))
    }
}
