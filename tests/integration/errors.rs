//! Malformed templates fail at compile time with a location; failed renders
//! leave nothing behind.

use anyhow::Result;
use reportloom::core::ReportError;
use reportloom::document::{Document, DocumentTemplate};
use reportloom::templating::RenderContext;
use reportloom::test_utils::{OdsBuilder, spreadsheet_ml};
use serde_json::json;

fn compile_error(bytes: &[u8]) -> ReportError {
    let document = Document::load(bytes).expect("fixture loads");
    match DocumentTemplate::compile(document) {
        Ok(template) => panic!("expected a compile error, got {}", template.compiled_markup()),
        Err(e) => e,
    }
}

#[test]
fn test_unclosed_row_loop_reports_position() {
    let bytes = OdsBuilder::new()
        .row(&["head"])
        .row(&["[[#row r in rows]]{{ r }}"])
        .build();

    match compile_error(&bytes) {
        ReportError::MalformedLoopStructure { message, position } => {
            assert!(message.contains("row"), "{message}");
            assert_eq!(position.line, 1);
            assert!(position.column > 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_end_marker_without_start() {
    let bytes = OdsBuilder::new().row(&["{{ x }}[[/col]]"]).build();
    assert!(matches!(
        compile_error(&bytes),
        ReportError::MalformedLoopStructure { .. }
    ));
}

#[test]
fn test_column_loop_across_rows_is_rejected() {
    let bytes = OdsBuilder::new()
        .row(&["[[#col c in cols]]{{ c }}"])
        .row(&["{{ c }}[[/col]]"])
        .build();
    assert!(matches!(
        compile_error(&bytes),
        ReportError::MalformedLoopStructure { .. }
    ));
}

#[test]
fn test_crossing_loops_are_rejected() {
    let bytes = OdsBuilder::new()
        .row(&["[[#row a in as]]", "[[#col b in bs]]x"])
        .row(&["[[/row]]", "y[[/col]]"])
        .build();
    assert!(matches!(
        compile_error(&bytes),
        ReportError::MalformedLoopStructure { .. }
    ));
}

#[test]
fn test_syntax_errors_are_aggregated() {
    let bytes = OdsBuilder::new()
        .row(&["{% if %}", "{{ unclosed"])
        .build();

    match compile_error(&bytes) {
        ReportError::TemplateSyntax { diagnostics } => {
            assert!(!diagnostics.is_empty());
            assert!(
                diagnostics.iter().any(|d| d.contains("unclosed variable block")),
                "{diagnostics:?}"
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_broken_package_and_unknown_formats() {
    assert!(matches!(
        Document::load(b"PK\x03\x04 truncated"),
        Err(ReportError::ContainerFormat { .. })
    ));
    assert!(matches!(
        Document::load(b"<?xml version=\"1.0\"?><svg/>"),
        Err(ReportError::UnsupportedDocument { .. })
    ));

    let bytes = OdsBuilder::new().row(&["x"]).build();
    let mut document = Document::load(&bytes).unwrap();
    document.container_mut().remove_entry("content.xml");
    let err = Document::load(&document.to_bytes().unwrap()).unwrap_err();
    assert!(matches!(err, ReportError::EntryNotFound { .. }));
}

/// A failed render returns an error and no document; the template stays
/// usable
#[test]
fn test_failed_render_has_no_output() -> Result<()> {
    let xml = spreadsheet_ml(&[&["[[#row r in rows]]{{ r.name }}[[/row]]"]]);
    let template = DocumentTemplate::compile(Document::load(xml.as_bytes())?)?;

    let err = template
        .render(&RenderContext::from_json(json!({"rows": [{"nmae": "x"}]}))?)
        .unwrap_err();
    assert!(matches!(err, ReportError::Render { .. }), "{err}");

    let ok = template.render(&RenderContext::from_json(json!({"rows": [{"name": "x"}]}))?)?;
    assert!(ok.main_content()?.contains(">x</Data>"));
    Ok(())
}

#[test]
fn test_undefined_variable_suggests_similar_name() -> Result<()> {
    let bytes = OdsBuilder::new().row(&["{{ custmer }}"]).build();
    let template = DocumentTemplate::compile(Document::load(&bytes)?)?;

    match template.render(&RenderContext::from_json(json!({"customer": "Ada"}))?) {
        Err(ReportError::Render { suggestions, .. }) => {
            assert_eq!(suggestions, vec!["customer".to_string()]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn test_render_data_must_be_an_object() {
    let err = RenderContext::from_json(json!(["not", "an", "object"])).unwrap_err();
    assert!(matches!(err, ReportError::Context { .. }));
}
