//! Text enrichment: tokenizing, lexicon sentiment, keyword matching

mod keywords;
mod language;
mod lexicon;
mod tokenize;

pub use keywords::{
    keyword_regex, load_keywords, KeywordDefinition, KeywordMatcher, KeywordSource, NoiseFilter,
    PatternError, StaticKeywords,
};
pub use language::{FixedLanguage, LanguageIdentifier, ScriptLanguageIdentifier};
pub use lexicon::{LexiconEntry, LexiconScorer, NEUTRAL};
pub use tokenize::{normalize_phrase, tokenize};
