// file: src/extractor/docx.rs
// description: DOCX paragraph extraction from word/document.xml
// reference: https://docs.rs/quick-xml

use super::{ExtractedText, FileKind};
use crate::error::{PipelineError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract(bytes: &[u8]) -> Result<ExtractedText> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PipelineError::Extraction(format!("DOCX is not a valid archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| PipelineError::Extraction(format!("DOCX has no {}: {}", DOCUMENT_PART, e)))?
        .read_to_string(&mut xml)
        .map_err(|e| PipelineError::Extraction(format!("Failed to read {}: {}", DOCUMENT_PART, e)))?;

    let paragraphs = parse_paragraphs(&xml)?;
    debug!("Extracted {} paragraphs from DOCX", paragraphs.len());

    let text = paragraphs.join("\n");
    let segments = paragraphs
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .collect();

    Ok(ExtractedText {
        kind: FileKind::Docx,
        text,
        segments,
    })
}

/// Collects the text runs of every `w:p`, in document order.
pub fn parse_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    // paragraphs nest inside text boxes
    let mut open: Vec<String> = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => open.push(String::new()),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => {
                    if let Some(p) = open.last_mut() {
                        p.push('\t');
                    }
                }
                b"w:br" | b"w:cr" => {
                    if let Some(p) = open.last_mut() {
                        p.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| PipelineError::Extraction(format!("Bad DOCX text: {}", e)))?;
                if let Some(p) = open.last_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if let Some(p) = open.pop() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PipelineError::Extraction(format!(
                    "Malformed DOCX XML at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn build_docx(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
            body
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(DOCUMENT_PART, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_paragraphs_joined_with_newlines() {
        let bytes = build_docx(
            "<w:p><w:r><w:t>First</w:t></w:r><w:r><w:t xml:space=\"preserve\"> line</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Tom &amp; Jerry</w:t></w:r></w:p>",
        );

        let extracted = extract(&bytes).unwrap();
        assert_eq!(extracted.kind, FileKind::Docx);
        assert_eq!(extracted.text, "First line\n\nTom & Jerry");
        assert_eq!(extracted.segments, vec!["First line", "Tom & Jerry"]);
    }

    #[test]
    fn test_tabs_and_breaks() {
        let paragraphs = parse_paragraphs(
            "<w:document><w:body><w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t></w:r></w:p></w:body></w:document>",
        )
        .unwrap();
        assert_eq!(paragraphs, vec!["a\tb\nc"]);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            extract(b"plain bytes"),
            Err(PipelineError::Extraction(_))
        ));
    }

    #[test]
    fn test_zip_without_document_part() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("other.xml", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"<x/>").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert!(matches!(extract(&bytes), Err(PipelineError::Extraction(_))));
    }
}
