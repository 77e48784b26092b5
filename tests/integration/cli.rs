//! The `reportloom` binary.

use anyhow::Result;
use predicates::prelude::*;
use reportloom::document::Document;
use reportloom::test_utils::{OdsBuilder, row_texts, spreadsheet_ml, tiny_png};

use crate::common::TestProject;

fn invoice() -> Vec<u8> {
    OdsBuilder::new()
        .row(&["{{ customer }}", "{{ logo }}"])
        .row(&["[[#row line in lines]]{{ line.item }}", "{{ line.qty }}[[/row]]"])
        .build()
}

#[test]
fn test_render_command() -> Result<()> {
    let project = TestProject::new()?;
    project.write("invoice.ods", invoice())?;
    project.write("assets/logo.png", tiny_png())?;
    project.write(
        "data.json",
        r#"{
            "customer": "Ada & Co",
            "logo": {"$image_file": "assets/logo.png"},
            "lines": [{"item": "Tea", "qty": 2}, {"item": "Rice", "qty": 5}]
        }"#,
    )?;

    project
        .command()
        .args(["render", "invoice.ods", "--data", "data.json", "--output", "out.ods"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered"));

    let output = Document::open(project.path().join("out.ods"))?;
    let rows = row_texts(&output.main_content()?);
    assert_eq!(rows[0][0], "Ada & Co");
    assert_eq!(rows[1], vec!["Tea".to_string(), "2".to_string()]);
    assert_eq!(rows[2], vec!["Rice".to_string(), "5".to_string()]);
    assert!(
        output
            .container()
            .entry_paths()
            .any(|path| path.starts_with("Pictures/"))
    );
    Ok(())
}

#[test]
fn test_render_reads_data_from_stdin() -> Result<()> {
    let project = TestProject::new()?;
    project.write("book.xml", spreadsheet_ml(&[&["{{ title }}"]]))?;

    project
        .command()
        .args(["--quiet", "render", "book.xml", "-d", "-", "-o", "out.xml"])
        .write_stdin(r#"{"title": "<Q3>"}"#)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(project.path().join("out.xml"))?;
    assert!(written.contains("&lt;Q3&gt;"));
    Ok(())
}

#[test]
fn test_compile_command_prints_markup_and_regions() -> Result<()> {
    let project = TestProject::new()?;
    project.write("invoice.ods", invoice())?;

    project
        .command()
        .args(["compile", "invoice.ods"])
        .assert()
        .success()
        .stdout(predicate::str::contains("{% for line in lines %}<table:table-row>"))
        .stdout(predicate::str::contains("[[#row").not());

    project
        .command()
        .args(["compile", "invoice.ods", "--regions"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""kind": "row""#))
        .stdout(predicate::str::contains(r#""expression": "lines""#));
    Ok(())
}

#[test]
fn test_failed_render_keeps_previous_output() -> Result<()> {
    let project = TestProject::new()?;
    project.write("invoice.ods", invoice())?;
    project.write("data.json", r#"{"lines": []}"#)?;
    let out = project.write("out.ods", "previous")?;

    project
        .command()
        .args(["render", "invoice.ods", "--data", "data.json", "--output", "out.ods"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"))
        .stderr(predicate::str::contains("customer"));

    assert_eq!(std::fs::read_to_string(out)?, "previous");
    Ok(())
}

#[test]
fn test_malformed_template_reports_location() -> Result<()> {
    let project = TestProject::new()?;
    project.write(
        "broken.ods",
        OdsBuilder::new().row(&["[[#row r in rows]]{{ r }}"]).build(),
    )?;

    project
        .command()
        .args(["compile", "broken.ods"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1, column"));
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() -> Result<()> {
    let project = TestProject::new()?;
    project.write("invoice.ods", invoice())?;
    project.write("bad.toml", "[container]\ndeflate_level = 42\n")?;

    project
        .command()
        .args(["--config", "bad.toml", "compile", "invoice.ods"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deflate_level"));
    Ok(())
}

#[test]
fn test_missing_template() -> Result<()> {
    let project = TestProject::new()?;
    project
        .command()
        .args(["compile", "nope.ods"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.ods").or(predicate::str::contains("not found")));
    Ok(())
}
