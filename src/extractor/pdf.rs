// file: src/extractor/pdf.rs
// description: PDF text extraction
// reference: https://docs.rs/pdf-extract

use super::{ExtractedText, FileKind};
use crate::error::{PipelineError, Result};
use std::any::Any;
use std::panic;
use tracing::{debug, warn};

pub fn extract(bytes: &[u8]) -> Result<ExtractedText> {
    // pdf-extract panics on some structurally valid but incomplete files
    let text = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|payload| {
            let reason = panic_reason(payload.as_ref());
            warn!("PDF parser panicked: {}", reason);
            PipelineError::Extraction(format!("PDF extraction failed: {}", reason))
        })?
        .map_err(|e| PipelineError::Extraction(format!("PDF extraction failed: {}", e)))?;

    debug!("Extracted {} chars from PDF", text.len());
    Ok(ExtractedText::whole(FileKind::Pdf, text))
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(reason) = payload.downcast_ref::<&str>() {
        reason.to_string()
    } else if let Some(reason) = payload.downcast_ref::<String>() {
        reason.clone()
    } else {
        "malformed document".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    /// One-page PDF that draws `text` with font `/F1`. Without `with_font`
    /// the page has no font resources, which the parser cannot resolve.
    fn build_pdf(text: &str, with_font: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let resources_id = if with_font {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Courier",
            });
            doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            })
        } else {
            doc.add_object(dictionary! {})
        };

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_well_formed_pdf_has_text() {
        let extracted = extract(&build_pdf("Hello PDF", true)).unwrap();
        assert_eq!(extracted.kind, FileKind::Pdf);
        assert!(!extracted.is_empty());
        assert!(extracted.text.contains("Hello PDF"));
    }

    #[test]
    fn test_missing_font_is_an_extraction_error() {
        let result = extract(&build_pdf("Hello PDF", false));
        assert!(matches!(result, Err(PipelineError::Extraction(_))));
    }

    #[test]
    fn test_garbage_is_an_extraction_error() {
        let result = extract(b"this is not a pdf");
        assert!(matches!(result, Err(PipelineError::Extraction(_))));
    }
}
