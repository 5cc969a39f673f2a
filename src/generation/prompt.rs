// file: src/generation/prompt.rs
// description: prompt templates with named placeholders
// reference: internal prompt conventions

use lazy_static::lazy_static;
use regex::{Captures, Regex};

pub const RAG_TEMPLATE: &str =
    "{context}\nFrom the above context, answer the user query [{question}] in the best possible way.";

lazy_static! {
    static ref PLACEHOLDER_REGEX: Regex =
        Regex::new(r"\{(context|question)\}").expect("Invalid placeholder regex");
}

pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new() -> Self {
        Self {
            template: RAG_TEMPLATE.to_string(),
        }
    }

    /// Fills `{context}` and `{question}` in one pass over the template, so
    /// braces inside either value are never expanded.
    pub fn render(&self, context: &str, question: &str) -> String {
        PLACEHOLDER_REGEX
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "context" => context.to_string(),
                _ => question.to_string(),
            })
            .into_owned()
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new()
    }
}
