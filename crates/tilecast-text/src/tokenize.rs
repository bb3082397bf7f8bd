//! Word/punctuation tokenizer

use regex::Regex;
use std::sync::OnceLock;

static TOKENIZE_RE: OnceLock<Regex> = OnceLock::new();

/// Split text into runs of word characters and runs of punctuation,
/// dropping whitespace
pub fn tokenize(text: &str) -> Vec<&str> {
    let re = TOKENIZE_RE.get_or_init(|| Regex::new(r"\w+|[^\w\s]+").unwrap());
    re.find_iter(text).map(|m| m.as_str()).collect()
}

/// Case-folded tokens joined with single spaces; the lookup key for phrases
pub fn normalize_phrase(text: &str) -> String {
    tokenize(&text.to_lowercase()).join(" ")
}
