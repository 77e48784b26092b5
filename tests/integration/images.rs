//! Image embedding: one entry per distinct image, identical references.

use anyhow::Result;
use reportloom::document::{Document, MANIFEST_PATH};
use reportloom::resources::Image;
use reportloom::templating::RenderContext;
use reportloom::test_utils::{OdsBuilder, tiny_gif, tiny_png};
use serde_json::json;

use crate::common::compile;

fn picture_entries(document: &Document) -> Vec<String> {
    document
        .container()
        .entry_paths()
        .filter(|path| path.starts_with("Pictures/"))
        .map(str::to_string)
        .collect()
}

/// The same image referenced several times is stored once and every
/// reference points at that one entry
#[test]
fn test_repeated_image_is_embedded_once() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["{{ logo }}", "{{ logo }}"])
        .row(&["[[#row r in rows]]{{ r.icon }}[[/row]]"])
        .build();
    let template = compile(&bytes)?;

    let mut context = RenderContext::new();
    let logo = context.insert_image("logo", Image::from_bytes(tiny_png())?)?;
    // Same bytes loaded twice still count as one image
    let again = context.register_image(Image::from_bytes(tiny_png())?);
    assert_eq!(logo, again);
    context.insert("rows", &json!([{"icon": again}, {"icon": logo}]))?;

    let output = template.render(&context)?;
    let pictures = picture_entries(&output);
    assert_eq!(pictures.len(), 1);
    assert!(pictures[0].ends_with(".png"));
    assert_eq!(output.container().entry(&pictures[0]), Some(tiny_png().as_slice()));

    let content = output.main_content()?;
    let fragment = format!(r#"xlink:href="{}""#, pictures[0]);
    assert_eq!(content.matches(&fragment).count(), 4);
    Ok(())
}

/// Distinct images get distinct entries, each listed in the manifest
#[test]
fn test_distinct_images_and_manifest() -> Result<()> {
    let bytes = OdsBuilder::new().row(&["{{ a }}", "{{ b }}"]).build();
    let template = compile(&bytes)?;

    let mut context = RenderContext::new();
    context.insert_image("a", Image::from_bytes(tiny_png())?)?;
    context.insert_image("b", Image::from_bytes(tiny_gif())?)?;

    let output = template.render(&context)?;
    let pictures = picture_entries(&output);
    assert_eq!(pictures.len(), 2);

    let manifest = output.container().read_text_entry(MANIFEST_PATH)?;
    for path in &pictures {
        assert!(manifest.contains(&format!(r#"manifest:full-path="{path}""#)), "{manifest}");
    }
    assert!(manifest.contains(r#"manifest:media-type="image/gif""#));
    Ok(())
}

/// Each render starts from the template package, not from earlier outputs
#[test]
fn test_renders_do_not_share_embedded_images() -> Result<()> {
    let bytes = OdsBuilder::new().row(&["{{ logo }}"]).build();
    let template = compile(&bytes)?;

    let mut with_image = RenderContext::new();
    with_image.insert_image("logo", Image::from_bytes(tiny_png())?)?;
    let first = template.render(&with_image)?;
    let second = template.render(&RenderContext::from_json(json!({"logo": "none"}))?)?;

    assert_eq!(picture_entries(&first).len(), 1);
    assert!(picture_entries(&second).is_empty());
    Ok(())
}

/// Rendered packages with images survive a save/load round trip
#[test]
fn test_embedded_images_survive_saving() -> Result<()> {
    let bytes = OdsBuilder::new().row(&["{{ logo }}"]).build();
    let template = compile(&bytes)?;
    let mut context = RenderContext::new();
    context.insert_image("logo", Image::from_bytes(tiny_png())?)?;

    let output = template.render(&context)?;
    let reloaded = Document::load(&output.to_bytes()?)?;

    assert_eq!(picture_entries(&reloaded), picture_entries(&output));
    assert_eq!(reloaded.main_content()?, output.main_content()?);
    Ok(())
}

/// Image files referenced from JSON data are loaded relative to a base
/// directory
#[test]
fn test_image_files_from_json() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir(dir.path().join("img"))?;
    std::fs::write(dir.path().join("img/logo.png"), tiny_png())?;

    let bytes = OdsBuilder::new().row(&["{{ company.logo }}"]).build();
    let template = compile(&bytes)?;
    let context = RenderContext::from_json_with_files(
        json!({"company": {"logo": {"$image_file": "img/logo.png"}}}),
        dir.path(),
    )?;

    let output = template.render(&context)?;
    assert_eq!(picture_entries(&output).len(), 1);
    assert!(output.main_content()?.contains("<draw:image "));
    Ok(())
}
