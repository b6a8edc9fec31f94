//! PDF text extraction
//!
//! Extracts per-page text from in-memory PDF bytes using lopdf.

use crate::errors::ResearchError;
use tracing::{debug, warn};

/// Extract the text of every page, in page order.
///
/// Whitespace is collapsed and pages without text are dropped. A document
/// that yields no text at all is an error.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>, ResearchError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ResearchError::PdfParse {
        message: format!("Failed to load PDF: {}", e),
    })?;

    let pages = doc.get_pages();
    debug!(page_count = pages.len(), "Extracting text from PDF");

    let mut texts = Vec::with_capacity(pages.len());
    for page_num in pages.keys() {
        match doc.extract_text(&[*page_num]) {
            Ok(raw) => {
                let cleaned = clean_text(&raw);
                if !cleaned.is_empty() {
                    texts.push(cleaned);
                }
            }
            Err(e) => {
                warn!(page = page_num, error = %e, "Failed to extract text from page, skipping");
            }
        }
    }

    if texts.is_empty() {
        return Err(ResearchError::PdfParse {
            message: "No text content extracted from PDF".to_string(),
        });
    }

    Ok(texts)
}

/// Collapse whitespace and normalize typographic quotes
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in page_texts {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
            ];
            if !text.is_empty() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            }
            operations.push(Operation::new("ET", vec![]));

            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Attention   is\nall you\tneed"), "Attention is all you need");
        assert_eq!(clean_text("\u{201C}BERT\u{201D}"), "\"BERT\"");
    }

    #[test]
    fn test_extract_pages() {
        let bytes = build_pdf(&["Attention Is All You Need", "", "We propose the Transformer"]);
        let pages = extract_pages(&bytes).unwrap();
        assert_eq!(pages, vec!["Attention Is All You Need", "We propose the Transformer"]);
    }

    #[test]
    fn test_no_text_is_error() {
        let bytes = build_pdf(&[""]);
        assert!(matches!(extract_pages(&bytes), Err(ResearchError::PdfParse { .. })));
    }

    #[test]
    fn test_not_a_pdf() {
        let err = extract_pages(b"<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, ResearchError::PdfParse { .. }));
    }
}
