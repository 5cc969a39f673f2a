// file: src/parser/normalizer.rs
// description: text preprocessing and document id sanitization
// reference: https://docs.rs/regex

use crate::extractor::UploadRoute;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex =
        Regex::new(r"\s+").expect("WHITESPACE_RUN regex is valid");

    static ref NON_WORD: Regex =
        Regex::new(r"[^\w\s]").expect("NON_WORD regex is valid");
}

pub struct TextNormalizer;

impl TextNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Lowercases, collapses whitespace runs to a single space and drops
    /// punctuation. Applied to text before it is embedded.
    pub fn preprocess(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let collapsed = WHITESPACE_RUN.replace_all(&lowered, " ");
        NON_WORD.replace_all(&collapsed, "").into_owned()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

pub fn preprocess_text(text: &str) -> String {
    TextNormalizer::new().preprocess(text)
}

/// Replaces anything that is not a word character or whitespace with `_`.
pub fn sanitize_id(raw: &str) -> String {
    NON_WORD.replace_all(raw, "_").into_owned()
}

pub fn document_id(route: UploadRoute, file_name: &str) -> String {
    sanitize_id(&format!("{}_{}", route.label(), file_name))
}
