//! Row, column and nested loops in OpenDocument spreadsheets.

use anyhow::Result;
use reportloom::compiler::LoopKind;
use reportloom::test_utils::{OdsBuilder, row_texts};
use serde_json::json;

use crate::common::{compile, render_main_content};

fn texts(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|cells| cells.iter().map(|cell| (*cell).to_string()).collect())
        .collect()
}

/// A row loop over N items produces N copies of its body rows
#[test]
fn test_row_loop_repeats_body_rows() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["Item", "Qty"])
        .row(&["[[#row line in lines]]{{ line.item }}", "{{ line.qty }}[[/row]]"])
        .row(&["Total", "{{ total }}"])
        .build();
    let data = json!({
        "lines": [
            {"item": "Tea", "qty": 2},
            {"item": "Rice", "qty": 5},
            {"item": "Salt", "qty": 1},
        ],
        "total": 8,
    });

    let rows = row_texts(&render_main_content(&bytes, data)?);
    assert_eq!(
        rows,
        texts(&[
            &["Item", "Qty"],
            &["Tea", "2"],
            &["Rice", "5"],
            &["Salt", "1"],
            &["Total", "8"],
        ])
    );
    Ok(())
}

/// A row loop may span several template rows
#[test]
fn test_multi_row_body() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["[[#row p in people]]{{ p.name }}"])
        .row(&["{{ p.mail }}[[/row]]"])
        .build();
    let data = json!({"people": [
        {"name": "Ada", "mail": "ada@example.com"},
        {"name": "Alan", "mail": "alan@example.com"},
    ]});

    let rows = row_texts(&render_main_content(&bytes, data)?);
    assert_eq!(
        rows,
        texts(&[&["Ada"], &["ada@example.com"], &["Alan"], &["alan@example.com"]])
    );
    Ok(())
}

/// An empty iterable removes the body rows entirely
#[test]
fn test_row_loop_over_empty_list() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["head"])
        .row(&["[[#row r in rows]]{{ r }}[[/row]]"])
        .row(&["foot"])
        .build();

    let rows = row_texts(&render_main_content(&bytes, json!({"rows": []}))?);
    assert_eq!(rows, texts(&[&["head"], &["foot"]]));
    Ok(())
}

/// A column loop repeats its cells and leaves the cells around it alone
#[test]
fn test_column_loop_is_flanked_by_literal_cells() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["first", "[[#col m in months]]{{ m }}[[/col]]", "last"])
        .build();
    let data = json!({"months": ["Jan", "Feb", "Mar", "Apr"]});

    let rows = row_texts(&render_main_content(&bytes, data)?);
    assert_eq!(rows, texts(&[&["first", "Jan", "Feb", "Mar", "Apr", "last"]]));
    Ok(())
}

/// A column loop nested in a row loop yields the cross product
#[test]
fn test_nested_loops_cross_product() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&[
            "[[#row r in rows]]{{ r }}",
            "[[#col c in cols]]{{ r }}{{ c }}[[/col]]",
            "end[[/row]]",
        ])
        .build();
    let template = compile(&bytes)?;
    let kinds: Vec<_> = template.regions().iter().map(|r| (r.kind, r.depth)).collect();
    assert_eq!(kinds, vec![(LoopKind::Row, 0), (LoopKind::Column, 1)]);

    let data = json!({"rows": [1, 2], "cols": ["a", "b", "c"]});
    let rows = row_texts(&render_main_content(&bytes, data)?);
    assert_eq!(
        rows,
        texts(&[
            &["1", "1a", "1b", "1c", "end"],
            &["2", "2a", "2b", "2c", "end"],
        ])
    );
    Ok(())
}

/// Loop expressions are full engine expressions, entities decoded
#[test]
fn test_loop_expression_with_filter_and_comparison() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["[[#row n in numbers | sort]]{% if n > 2 %}big{% else %}{{ n }}{% endif %}[[/row]]"])
        .build();

    let rows = row_texts(&render_main_content(&bytes, json!({"numbers": [3, 1, 2]}))?);
    assert_eq!(rows, texts(&[&["1"], &["2"], &["big"]]));
    Ok(())
}

/// Plain template expressions outside loops are rendered in place
#[test]
fn test_expressions_outside_loops() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["{{ title | upper }}", "{{ count }}"])
        .build();

    let rows = row_texts(&render_main_content(&bytes, json!({"title": "stock", "count": 42}))?);
    assert_eq!(rows, texts(&[&["STOCK", "42"]]));
    Ok(())
}
