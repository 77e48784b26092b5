//! Package round-trips: entries, order and compression survive load/save and
//! rendering.

use std::io::Cursor;

use anyhow::Result;
use reportloom::config::RenderConfig;
use reportloom::container::Container;
use reportloom::document::{Document, DocumentTemplate};
use reportloom::templating::{RenderContext, TeraEngine};
use reportloom::test_utils::{OdsBuilder, tiny_png};
use serde_json::json;
use zip::{CompressionMethod, ZipArchive};

fn compression_of(bytes: &[u8], path: &str) -> Result<CompressionMethod> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let file = archive.by_name(path)?;
    Ok(file.compression())
}

fn first_entry(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let file = archive.by_index(0)?;
    Ok(file.name().to_string())
}

fn fixture() -> OdsBuilder {
    OdsBuilder::new()
        .row(&["{{ title }}"])
        .entry("Thumbnails/thumbnail.png", tiny_png())
        .entry("settings.xml", b"<office:document-settings/>".to_vec())
}

#[test]
fn test_load_save_preserves_every_entry() -> Result<()> {
    let bytes = fixture().build();
    let container = Container::load(&bytes)?;
    let saved = container.save()?;
    let reloaded = Container::load(&saved)?;

    let before: Vec<&str> = container.entry_paths().collect();
    let after: Vec<&str> = reloaded.entry_paths().collect();
    assert_eq!(before, after);
    for path in before {
        assert_eq!(container.entry(path), reloaded.entry(path), "{path}");
    }
    Ok(())
}

#[test]
fn test_mimetype_first_and_stored() -> Result<()> {
    let saved = Container::load(&fixture().build())?.save()?;

    assert_eq!(first_entry(&saved)?, "mimetype");
    assert_eq!(compression_of(&saved, "mimetype")?, CompressionMethod::Stored);
    assert_eq!(compression_of(&saved, "Thumbnails/thumbnail.png")?, CompressionMethod::Stored);
    assert_eq!(compression_of(&saved, "content.xml")?, CompressionMethod::Deflated);
    Ok(())
}

/// Rendering replaces the main content and nothing else
#[test]
fn test_render_keeps_untouched_entries() -> Result<()> {
    let bytes = fixture().build();
    let source = Container::load(&bytes)?;
    let template = DocumentTemplate::compile(Document::load(&bytes)?)?;

    let output = template.render(&RenderContext::from_json(json!({"title": "Q3"}))?)?;
    let rendered = Container::load(&output.to_bytes()?)?;

    let paths: Vec<&str> = source.entry_paths().collect();
    assert_eq!(rendered.entry_paths().collect::<Vec<_>>(), paths);
    for path in paths.iter().filter(|path| **path != "content.xml") {
        assert_eq!(rendered.entry(path), source.entry(path), "{path}");
    }
    assert!(rendered.read_text_entry("content.xml")?.contains("<text:p>Q3</text:p>"));
    Ok(())
}

#[test]
fn test_configured_stored_extensions() -> Result<()> {
    let bytes = fixture().entry("data/table.csv", b"a,b\n1,2\n".to_vec()).build();
    let config = RenderConfig::from_toml(
        "[container]\ndeflate_level = 9\nstored_extensions = [\".CSV\"]",
    )?;
    let template = DocumentTemplate::compile_with(Document::load(&bytes)?, TeraEngine, &config)?;

    let output = template.render(&RenderContext::from_json(json!({"title": "x"}))?)?;
    let saved = output.to_bytes()?;
    assert_eq!(compression_of(&saved, "data/table.csv")?, CompressionMethod::Stored);
    assert_eq!(compression_of(&saved, "content.xml")?, CompressionMethod::Deflated);
    Ok(())
}
