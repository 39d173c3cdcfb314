//! Free-text sanitization for custom text fields.

use once_cell::sync::Lazy;
use regex::Regex;

/// Strips disallowed content from free-text input.
pub trait Sanitizer {
    fn clean(&self, input: &str) -> String;
}

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|iframe|object)\b[^>]*>.*?</(script|style|iframe|object)\s*>")
        .expect("script block regex")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)</?[a-zA-Z!][^>]*>").expect("tag regex"));

/// Default filter: removes executable blocks together with their content,
/// then every remaining markup tag. Text between tags is kept verbatim,
/// whitespace included.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputFilter;

impl Sanitizer for InputFilter {
    fn clean(&self, input: &str) -> String {
        let without_blocks = SCRIPT_BLOCK.replace_all(input, "");
        TAG.replace_all(&without_blocks, "").into_owned()
    }
}

/// Pass-through filter for trusted input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSanitizer;

impl Sanitizer for NoopSanitizer {
    fn clean(&self, input: &str) -> String {
        input.to_string()
    }
}
