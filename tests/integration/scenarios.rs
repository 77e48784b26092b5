//! The reference workbooks: a five-cell row loop and a column loop between
//! literal rows.

use anyhow::Result;
use reportloom::test_utils::{OdsBuilder, spreadsheet_ml, table_text};
use serde_json::json;

use crate::common::render_main_content;

const ROW_LOOP: [&str; 5] = [
    "[[#row c in chars]]{{ c }}",
    "{{ c }}",
    "{{ c }}",
    "{{ c }}",
    "{{ c }}[[/row]]",
];

const COLUMN_LOOP: [&str; 3] = ["XY", "[[#col c in chars]]{{ c }}[[/col]]", "Z"];

fn chars() -> serde_json::Value {
    json!({"chars": ["A", "B", "C", "D", "E", "F"]})
}

#[test]
fn test_spreadsheet_ml_row_loop() -> Result<()> {
    let xml = spreadsheet_ml(&[&ROW_LOOP]);
    let rows = table_text(&render_main_content(xml.as_bytes(), chars())?);

    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0], "AAAAA");
    assert_eq!(rows[5], "FFFFF");
    Ok(())
}

#[test]
fn test_spreadsheet_ml_column_loop() -> Result<()> {
    let xml = spreadsheet_ml(&[&["JJJ"], &COLUMN_LOOP, &["KKK"]]);
    let rows = table_text(&render_main_content(xml.as_bytes(), chars())?);

    assert_eq!(rows.concat(), "JJJXYABCDEFZKKK");
    assert_eq!(rows, vec!["JJJ", "XYABCDEFZ", "KKK"]);
    Ok(())
}

#[test]
fn test_ods_row_loop() -> Result<()> {
    let bytes = OdsBuilder::new().row(&ROW_LOOP).build();
    let rows = table_text(&render_main_content(&bytes, chars())?);

    assert_eq!(
        rows,
        vec!["AAAAA", "BBBBB", "CCCCC", "DDDDD", "EEEEE", "FFFFF"]
    );
    Ok(())
}

#[test]
fn test_ods_column_loop() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["JJJ"])
        .row(&COLUMN_LOOP)
        .row(&["KKK"])
        .build();
    let rows = table_text(&render_main_content(&bytes, chars())?);

    assert_eq!(rows, vec!["JJJ", "XYABCDEFZ", "KKK"]);
    Ok(())
}
