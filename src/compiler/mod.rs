//! Structural compiler for loop markers in table markup
//!
//! Template authors mark repeated table rows and cells with loop markers (see
//! [`markers`] for the syntax). A template engine cannot use those markers
//! directly: the markers live inside cell text, but the loop has to wrap whole
//! `<row>` or `<cell>` elements or the rendered markup would no longer be
//! well-formed. The compiler moves every loop construct outward to the
//! boundaries of the rows or cells it belongs to.
//!
//! # Pipeline
//!
//! 1. Tokenize the markup into rows, cells and text runs, each with its exact
//!    byte span ([`TableDialect`] decides which elements are rows and cells)
//! 2. Scan text runs for markers and pair them with a stack in document order
//! 3. Anchor each pair: a row loop to the first and last row it touches, a
//!    column loop to the first and last cell. A marker outside every row (or
//!    outside every cell for column loops) anchors at its own position
//! 4. Validate the anchored ranges: children inside their parent, siblings
//!    disjoint
//! 5. Express the result as index-range edits (inserts plus marker deletions)
//!    and materialize the output in a single pass
//!
//! Everything that is not a loop marker, including variable blocks such as
//! `{{ name }}`, is forwarded verbatim for the template engine.
//!
//! # Examples
//!
//! ```rust
//! use reportloom::compiler::{Compiler, JinjaLoopSyntax, TableDialect};
//!
//! let markup = "<Table><Row><Cell><Data>[[#row c in chars]]{{ c }}[[/row]]</Data></Cell></Row></Table>";
//! let compilation = Compiler::new(TableDialect::SpreadsheetMl2003)
//!     .compile(markup, &JinjaLoopSyntax)
//!     .unwrap();
//!
//! assert_eq!(
//!     compilation.markup,
//!     "<Table>{% for c in chars %}<Row><Cell><Data>{{ c }}</Data></Cell></Row>{% endfor %}</Table>"
//! );
//! assert_eq!(compilation.regions.len(), 1);
//! ```

mod dialect;
pub mod markers;
mod structure;

pub use dialect::TableDialect;
pub use markers::{LoopKind, MARKER_SYNTAX_VERSION, Marker, MarkerRole};

use std::ops::Range;

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::{MarkupPosition, ReportError, Result};
use structure::{Structure, TextRun};

/// Loop constructs of a template language.
///
/// The compiler only needs to open and close loops; it never evaluates the
/// expressions it passes through.
pub trait LoopSyntax: Send + Sync {
    /// Construct that starts iterating `expression`, binding each element to `item`.
    fn loop_open(&self, item: &str, expression: &str) -> String;

    /// Construct that ends the innermost open loop.
    fn loop_close(&self) -> String;
}

/// `{% for item in expression %}` / `{% endfor %}`, as used by Tera and Jinja.
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaLoopSyntax;

impl LoopSyntax for JinjaLoopSyntax {
    fn loop_open(&self, item: &str, expression: &str) -> String {
        format!("{{% for {item} in {expression} %}}")
    }

    fn loop_close(&self) -> String {
        "{% endfor %}".to_string()
    }
}

/// A loop found and relocated by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralRegion {
    /// Row or column loop
    pub kind: LoopKind,
    /// Loop variable
    pub item: String,
    /// Iterable expression
    pub expression: String,
    /// Source range wrapped by the loop, marker text included
    pub span: Range<usize>,
    /// 0 for top-level loops
    pub depth: usize,
    /// Position of the start marker
    pub position: MarkupPosition,
}

/// Output of [`Compiler::compile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// Markup with every loop marker replaced by engine loop constructs
    pub markup: String,
    /// Every loop, ordered by start marker
    pub regions: Vec<StructuralRegion>,
}

/// Rewrites loop markers into engine loop constructs.
#[derive(Debug, Clone, Copy)]
pub struct Compiler {
    dialect: TableDialect,
}

struct Located {
    marker: Marker,
    row: Option<usize>,
    cell: Option<usize>,
}

struct Pair {
    start: usize,
    end: usize,
    depth: usize,
    parent: Option<usize>,
}

struct Insert {
    at: usize,
    phase: u8,
    order: usize,
    text: String,
}

impl Compiler {
    /// Create a compiler for the given table vocabulary.
    #[must_use]
    pub const fn new(dialect: TableDialect) -> Self {
        Self { dialect }
    }

    /// The table vocabulary this compiler recognizes.
    #[must_use]
    pub const fn dialect(&self) -> TableDialect {
        self.dialect
    }

    /// Compile `markup`, emitting loop constructs from `syntax`.
    ///
    /// # Errors
    ///
    /// - [`ReportError::MalformedMarkup`] if the markup is not well-formed XML
    /// - [`ReportError::MalformedLoopStructure`] for unbalanced, crossing or
    ///   misplaced markers
    ///
    /// On error nothing is produced.
    pub fn compile(&self, markup: &str, syntax: &dyn LoopSyntax) -> Result<Compilation> {
        let structure = Structure::parse(markup, self.dialect)?;
        let located = locate_markers(markup, &structure.runs)?;
        if located.is_empty() {
            debug!("No loop markers found");
            return Ok(Compilation {
                markup: markup.to_string(),
                regions: Vec::new(),
            });
        }

        let pairs = pair_markers(markup, &located)?;
        let mut spans = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            spans.push(anchor(markup, &structure, &located[pair.start], &located[pair.end])?);
        }
        validate_nesting(markup, &located, &pairs, &spans)?;

        let mut inserts = Vec::with_capacity(pairs.len() * 2);
        let mut regions = Vec::with_capacity(pairs.len());
        for (pair, span) in pairs.iter().zip(&spans) {
            let start = &located[pair.start].marker;
            let MarkerRole::Start { item, expression } = &start.role else {
                continue;
            };
            let position = MarkupPosition::locate(markup, start.span.start);
            if located[pair.end].marker.span.start == start.span.end {
                warn!("Empty {} loop over '{}' at {}", start.kind, expression, position);
            }
            debug!(
                "Relocating {} loop '{} in {}' to {}..{}",
                start.kind, item, expression, span.start, span.end
            );

            inserts.push(Insert {
                at: span.start,
                phase: 1,
                order: pair.depth,
                text: syntax.loop_open(item, expression),
            });
            inserts.push(Insert {
                at: span.end,
                phase: 0,
                order: usize::MAX - pair.depth,
                text: syntax.loop_close(),
            });
            regions.push(StructuralRegion {
                kind: start.kind,
                item: item.clone(),
                expression: expression.clone(),
                span: span.clone(),
                depth: pair.depth,
                position,
            });
        }

        let deletions: Vec<Range<usize>> =
            located.iter().map(|loc| loc.marker.span.clone()).collect();
        let markup = materialize(markup, inserts, &deletions);

        debug!("Compiled {} loop(s)", regions.len());
        Ok(Compilation { markup, regions })
    }
}

fn locate_markers(markup: &str, runs: &[TextRun]) -> Result<Vec<Located>> {
    let mut located = Vec::new();
    for run in runs {
        for marker in markers::scan(markup, run.range.clone())? {
            located.push(Located {
                marker,
                row: run.row,
                cell: run.cell,
            });
        }
    }
    Ok(located)
}

fn pair_markers(markup: &str, located: &[Located]) -> Result<Vec<Pair>> {
    let at = |index: usize| MarkupPosition::locate(markup, located[index].marker.span.start);

    let mut pairs: Vec<Pair> = Vec::new();
    let mut open: Vec<usize> = Vec::new();

    for (index, loc) in located.iter().enumerate() {
        if loc.marker.is_start() {
            pairs.push(Pair {
                start: index,
                end: index,
                depth: open.len(),
                parent: open.last().copied(),
            });
            open.push(pairs.len() - 1);
            continue;
        }

        let kind = loc.marker.kind;
        let Some(pair_index) = open.pop() else {
            return Err(ReportError::malformed_loop(
                format!("[[/{kind}]] has no matching [[#{kind} ...]]"),
                at(index),
            ));
        };
        let opened = &located[pairs[pair_index].start].marker;
        if opened.kind != kind {
            return Err(ReportError::malformed_loop(
                format!(
                    "[[/{kind}]] closes the {} loop opened at {}",
                    opened.kind,
                    at(pairs[pair_index].start)
                ),
                at(index),
            ));
        }
        pairs[pair_index].end = index;
    }

    if let Some(&pair_index) = open.last() {
        let start = pairs[pair_index].start;
        return Err(ReportError::malformed_loop(
            format!("{} loop is never closed", located[start].marker.kind),
            at(start),
        ));
    }

    Ok(pairs)
}

/// Source range wrapped by the loop between `start` and `end`.
fn anchor(
    markup: &str,
    structure: &Structure,
    start: &Located,
    end: &Located,
) -> Result<Range<usize>> {
    let at = |loc: &Located| MarkupPosition::locate(markup, loc.marker.span.start);

    match start.marker.kind {
        LoopKind::Row => match (structure.unit(start.row), structure.unit(end.row)) {
            (Some(first), Some(last)) => {
                if first.parent != last.parent {
                    return Err(ReportError::malformed_loop(
                        "row loop must end in a row of the table where it starts",
                        at(end),
                    ));
                }
                Ok(first.start..last.end)
            }
            (None, None) => Ok(start.marker.span.start..end.marker.span.start),
            (Some(_), None) => Err(ReportError::malformed_loop(
                "row loop starts inside a table row but ends outside of any row",
                at(end),
            )),
            (None, Some(_)) => Err(ReportError::malformed_loop(
                "row loop starts outside of any table row but ends inside one",
                at(start),
            )),
        },
        LoopKind::Column => {
            if start.row.is_none() {
                return Err(ReportError::malformed_loop(
                    "column loop must be inside a table row",
                    at(start),
                ));
            }
            if start.row != end.row {
                return Err(ReportError::malformed_loop(
                    "column loop must end in the row where it starts",
                    at(end),
                ));
            }
            let in_row = |cell: Option<usize>| {
                structure
                    .unit(cell)
                    .filter(|unit| unit.row == start.row)
            };
            let open_at = in_row(start.cell).map_or(start.marker.span.start, |cell| cell.start);
            let close_at = in_row(end.cell).map_or(end.marker.span.start, |cell| cell.end);
            Ok(open_at..close_at)
        }
    }
}

fn validate_nesting(
    markup: &str,
    located: &[Located],
    pairs: &[Pair],
    spans: &[Range<usize>],
) -> Result<()> {
    let at = |pair: &Pair| MarkupPosition::locate(markup, located[pair.start].marker.span.start);
    let kind = |pair: &Pair| located[pair.start].marker.kind;

    for (index, pair) in pairs.iter().enumerate() {
        let span = &spans[index];
        if let Some(parent) = pair.parent {
            let outer = &spans[parent];
            if span.start < outer.start || span.end > outer.end {
                return Err(ReportError::malformed_loop(
                    format!(
                        "{} loop extends outside the enclosing {} loop started at {}",
                        kind(pair),
                        kind(&pairs[parent]),
                        at(&pairs[parent])
                    ),
                    at(pair),
                ));
            }
        }

        let previous_sibling = pairs[..index]
            .iter()
            .enumerate()
            .rev()
            .find(|(_, other)| other.parent == pair.parent && other.depth == pair.depth);
        if let Some((sibling, other)) = previous_sibling {
            if spans[sibling].end > span.start {
                return Err(ReportError::malformed_loop(
                    format!(
                        "{} loop overlaps the {} loop started at {}",
                        kind(pair),
                        kind(other),
                        at(other)
                    ),
                    at(pair),
                ));
            }
        }
    }
    Ok(())
}

/// Apply inserts and deletions to `source` in one pass.
///
/// Inserts at the same offset are ordered by `(phase, order)`. No insert may
/// fall strictly inside a deletion, and deletions must not overlap.
fn materialize(source: &str, mut inserts: Vec<Insert>, deletions: &[Range<usize>]) -> String {
    inserts.sort_by_key(|insert| (insert.at, insert.phase, insert.order));

    let extra: usize = inserts.iter().map(|insert| insert.text.len()).sum();
    let mut out = String::with_capacity(source.len() + extra);
    let mut cursor = 0;
    let mut pending = deletions.iter().peekable();

    let mut copy_until = |out: &mut String, cursor: &mut usize, target: usize| {
        while *cursor < target {
            match pending.peek() {
                Some(deletion) if deletion.start < target => {
                    out.push_str(&source[*cursor..deletion.start.max(*cursor)]);
                    *cursor = (*cursor).max(deletion.end);
                    pending.next();
                }
                _ => {
                    out.push_str(&source[*cursor..target]);
                    *cursor = target;
                }
            }
        }
    };

    for insert in &inserts {
        copy_until(&mut out, &mut cursor, insert.at);
        out.push_str(&insert.text);
    }
    copy_until(&mut out, &mut cursor, source.len());

    out
}
