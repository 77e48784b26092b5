//! Rewriting of compiled markup so Tera routes every value through the
//! interceptor chain.
//!
//! Tera has no hook that sees each printed value, so every variable block is
//! rewritten to evaluate its expression into a scratch variable and print
//! that through the insertion filter: `{{ a == b }}` becomes
//! `{% set __reportloom_value = a == b %}{{ __reportloom_value | __reportloom_insert }}`.
//! Applying the filter to the expression itself would bind it to the last
//! operand only. The scan understands the rest of the Tera syntax well enough
//! not to touch comments, `{% raw %}` blocks, or delimiters that appear inside
//! string literals.
//!
//! Template text inside the document is XML character data, so office
//! applications store `a > b` as `a &gt; b`. Entity references inside
//! `{{ }}` and `{% %}` are decoded here before Tera sees them.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::MarkupPosition;

/// Name of the filter that hands values to the interceptor chain.
pub const INSERT_FILTER: &str = "__reportloom_insert";

/// Scratch variable holding the value of the variable block being printed.
pub const INSERT_VALUE: &str = "__reportloom_value";

static END_RAW: LazyLock<Regex> =
    LazyLock::new(|| {
        Regex::new(r"\{%-?\s*endraw\s*-?%\}").expect("endraw pattern is a valid regex")
    });

/// Instrumented source plus every problem found while scanning.
#[derive(Debug, Default)]
pub(crate) struct Instrumented {
    pub source: String,
    pub diagnostics: Vec<String>,
}

/// Index just past the delimiter `close` that ends the block whose body
/// starts at `from`, skipping string literals.
fn find_close(source: &str, from: usize, close: &str) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = from;
    while i < bytes.len() {
        let byte = bytes[i];
        match quote {
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None if matches!(byte, b'"' | b'\'' | b'`') => quote = Some(byte),
            None if bytes[i..].starts_with(close.as_bytes()) => return Some(i + close.len()),
            None => {}
        }
        i += 1;
    }
    None
}

fn decode(text: &str) -> String {
    quick_xml::escape::unescape(text)
        .map_or_else(|_| text.to_string(), |decoded| decoded.into_owned())
}

/// Rewrite every `{{ expr }}` of `source` to print through [`INSERT_FILTER`].
pub(crate) fn instrument(source: &str) -> Instrumented {
    let mut out = Instrumented {
        source: String::with_capacity(source.len() + source.len() / 8),
        diagnostics: Vec::new(),
    };
    let mut cursor = 0;

    while let Some(found) = source[cursor..].find('{') {
        let open = cursor + found;
        let rest = &source[open..];

        if rest.starts_with("{#") {
            let Some(end) = source[open + 2..].find("#}").map(|i| open + 2 + i + 2) else {
                out.unclosed(source, cursor, open, "comment");
                cursor = source.len();
                break;
            };
            out.source.push_str(&source[cursor..end]);
            cursor = end;
        } else if rest.starts_with("{%") {
            let Some(end) = find_close(source, open + 2, "%}") else {
                out.unclosed(source, cursor, open, "tag");
                cursor = source.len();
                break;
            };
            out.source.push_str(&source[cursor..open]);
            out.source.push_str(&decode(&source[open..end]));
            cursor = end;

            let keyword =
                source[open + 2..end - 2].trim_matches(|c: char| c == '-' || c.is_whitespace());
            if keyword == "raw" {
                let Some(raw_end) = END_RAW.find(&source[cursor..]).map(|m| cursor + m.end()) else {
                    out.unclosed(source, cursor, open, "raw block");
                    cursor = source.len();
                    break;
                };
                out.source.push_str(&source[cursor..raw_end]);
                cursor = raw_end;
            }
        } else if rest.starts_with("{{") {
            let Some(end) = find_close(source, open + 2, "}}") else {
                out.unclosed(source, cursor, open, "variable block");
                cursor = source.len();
                break;
            };
            out.source.push_str(&source[cursor..open]);
            out.push_variable(&source[open + 2..end - 2]);
            cursor = end;
        } else {
            out.source.push_str(&source[cursor..=open]);
            cursor = open + 1;
        }
    }

    out.source.push_str(&source[cursor..]);
    out
}

impl Instrumented {
    /// Report the block opened at `open` and copy the rest of the source.
    fn unclosed(&mut self, source: &str, cursor: usize, open: usize, what: &str) {
        self.diagnostics.push(format!(
            "unclosed {what} starting at {}",
            MarkupPosition::locate(source, open)
        ));
        self.source.push_str(&source[cursor..]);
    }

    fn push_variable(&mut self, body: &str) {
        let trim_left = body.starts_with('-');
        let trim_right = body.len() > usize::from(trim_left) && body.ends_with('-');
        let start = usize::from(trim_left);
        let end = body.len() - usize::from(trim_right);
        let expression = decode(body[start..end.max(start)].trim());

        if expression.is_empty() {
            // Left for Tera to report
            self.source.push_str(if trim_left { "{{- " } else { "{{ " });
            self.source.push_str(if trim_right { "-}}" } else { "}}" });
            return;
        }

        self.source.push_str(if trim_left { "{%- set " } else { "{% set " });
        self.source.push_str(INSERT_VALUE);
        self.source.push_str(" = ");
        self.source.push_str(&expression);
        self.source.push_str(" %}{{ ");
        self.source.push_str(INSERT_VALUE);
        self.source.push_str(" | ");
        self.source.push_str(INSERT_FILTER);
        self.source.push_str(if trim_right { " -}}" } else { " }}" });
    }
}
