//! One compiled template serving many threads.

use std::thread;

use anyhow::Result;
use reportloom::resources::Image;
use reportloom::templating::RenderContext;
use reportloom::test_utils::{OdsBuilder, row_texts, tiny_gif, tiny_png};
use serde_json::json;

use crate::common::compile;

#[test]
fn test_parallel_renders_are_independent() -> Result<()> {
    let bytes = OdsBuilder::new()
        .row(&["{{ worker }}", "{{ logo }}"])
        .row(&["[[#row n in numbers]]{{ n }}[[/row]]"])
        .build();
    let template = compile(&bytes)?;

    let results: Vec<Result<(usize, Vec<Vec<String>>, usize)>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let template = &template;
                scope.spawn(move || -> Result<(usize, Vec<Vec<String>>, usize)> {
                    let mut context = RenderContext::from_json(json!({
                        "worker": worker,
                        "numbers": (0..worker).collect::<Vec<_>>(),
                    }))?;
                    let image = if worker % 2 == 0 { tiny_png() } else { tiny_gif() };
                    context.insert_image("logo", Image::from_bytes(image)?)?;

                    let output = template.render(&context)?;
                    let pictures = output
                        .container()
                        .entry_paths()
                        .filter(|path| path.starts_with("Pictures/"))
                        .count();
                    Ok((worker, row_texts(&output.main_content()?), pictures))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("render thread panicked"))
            .collect()
    });

    for result in results {
        let (worker, rows, pictures) = result?;
        assert_eq!(rows.len(), 1 + worker, "worker {worker}");
        assert_eq!(rows[0][0], worker.to_string());
        for (i, row) in rows[1..].iter().enumerate() {
            assert_eq!(row, &vec![i.to_string()]);
        }
        assert_eq!(pictures, 1, "worker {worker}");
    }
    Ok(())
}
