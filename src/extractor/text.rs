// file: src/extractor/text.rs
// description: plain text extraction

use super::{ExtractedText, FileKind};
use tracing::warn;

pub fn extract(bytes: &[u8]) -> ExtractedText {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!("Text upload is not valid UTF-8 ({}), decoding lossily", e);
            String::from_utf8_lossy(bytes).into_owned()
        }
    };

    // A leading byte-order mark is not content.
    let text = text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text);

    ExtractedText::whole(FileKind::Txt, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_text() {
        let extracted = extract("Grüße aus Köln".as_bytes());
        assert_eq!(extracted.text, "Grüße aus Köln");
    }

    #[test]
    fn test_bom_is_stripped() {
        let extracted = extract("\u{feff}hello".as_bytes());
        assert_eq!(extracted.text, "hello");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let extracted = extract(&[b'o', b'k', 0xff, b'!']);
        assert!(extracted.text.starts_with("ok"));
        assert!(extracted.text.ends_with('!'));
    }

    #[test]
    fn test_whitespace_only_has_no_segments() {
        let extracted = extract(b"   \n\t ");
        assert!(extracted.is_empty());
        assert!(extracted.segments.is_empty());
    }
}
