//! Property tests: inserted text always reads back verbatim, and markup
//! without loop markers compiles to itself.

use proptest::prelude::*;
use reportloom::document::{Document, DocumentTemplate};
use reportloom::templating::RenderContext;
use reportloom::test_utils::{OdsBuilder, row_texts};
use serde_json::json;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever text is inserted, the rendered cell holds exactly that text
    /// and the markup stays well-formed
    #[test]
    fn inserted_text_reads_back_verbatim(value in "\\PC{0,40}") {
        let bytes = OdsBuilder::new().row(&["{{ value }}", "after"]).build();
        let template = DocumentTemplate::compile(Document::load(&bytes).unwrap()).unwrap();

        let context = RenderContext::from_json(json!({"value": value.clone()})).unwrap();
        let content = template.render(&context).unwrap().main_content().unwrap();

        prop_assert_eq!(row_texts(&content), vec![vec![value, "after".to_string()]]);
    }

    /// Values inside loops are escaped the same way
    #[test]
    fn looped_text_reads_back_verbatim(
        values in prop::collection::vec("[<>&\"' a-z]{0,12}", 0..6),
    ) {
        let bytes = OdsBuilder::new()
            .row(&["[[#row v in values]]{{ v }}[[/row]]"])
            .build();
        let template = DocumentTemplate::compile(Document::load(&bytes).unwrap()).unwrap();

        let context = RenderContext::from_json(json!({"values": values.clone()})).unwrap();
        let content = template.render(&context).unwrap().main_content().unwrap();

        let expected: Vec<Vec<String>> = values.into_iter().map(|v| vec![v]).collect();
        prop_assert_eq!(row_texts(&content), expected);
    }

    /// Templates without markers or template syntax compile to themselves
    #[test]
    fn markup_without_markers_passes_through(
        cells in prop::collection::vec("[A-Za-z0-9 <>&.,;:!?]{0,16}", 1..5),
    ) {
        let cells: Vec<&str> = cells.iter().map(String::as_str).collect();
        let bytes = OdsBuilder::new().row(&cells).row(&["footer"]).build();
        let document = Document::load(&bytes).unwrap();
        let source = document.main_content().unwrap();

        let template = DocumentTemplate::compile(document).unwrap();
        prop_assert_eq!(template.compiled_markup(), source.as_str());
        prop_assert!(template.regions().is_empty());

        let rendered = template.render(&RenderContext::new()).unwrap();
        prop_assert_eq!(rendered.main_content().unwrap(), source);
    }
}
