//! Canonical keyword matching and conjunctive noise filtering

use crate::tokenize::tokenize;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("term '{0}' has no tokens")]
    EmptyTerm(String),
    #[error("failed to compile pattern for '{term}': {source}")]
    Invalid {
        term: String,
        #[source]
        source: regex::Error,
    },
}

/// A canonical keyword and its surface term per language
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordDefinition {
    /// Lowercase English form used as the aggregation dimension
    pub canonical: String,
    /// language -> term
    pub terms: BTreeMap<String, String>,
}

impl KeywordDefinition {
    /// Definition with an English term and optional Arabic term, the shape
    /// the keyword table stores
    pub fn bilingual(en_term: &str, ar_term: Option<&str>) -> Self {
        let mut terms = BTreeMap::new();
        terms.insert("en".to_string(), en_term.to_string());
        if let Some(ar) = ar_term.filter(|t| !t.trim().is_empty()) {
            terms.insert("ar".to_string(), ar.to_string());
        }
        Self {
            canonical: en_term.to_lowercase(),
            terms,
        }
    }
}

/// Where keyword definitions and filter groups come from; refreshed once per run
pub trait KeywordSource {
    fn keyword_definitions(&self) -> anyhow::Result<Vec<KeywordDefinition>>;

    /// Each group is a list of terms that must all match for a record to be
    /// rejected as noise
    fn filter_groups(&self) -> anyhow::Result<Vec<Vec<String>>>;
}

/// In-memory keyword source
#[derive(Debug, Clone, Default)]
pub struct StaticKeywords {
    pub definitions: Vec<KeywordDefinition>,
    pub filters: Vec<Vec<String>>,
}

impl KeywordSource for StaticKeywords {
    fn keyword_definitions(&self) -> anyhow::Result<Vec<KeywordDefinition>> {
        Ok(self.definitions.clone())
    }

    fn filter_groups(&self) -> anyhow::Result<Vec<Vec<String>>> {
        Ok(self.filters.clone())
    }
}

/// Whole-word, case-insensitive pattern for a term. Tokens may be separated
/// by any run of whitespace.
pub fn keyword_regex(term: &str) -> Result<Regex, PatternError> {
    let tokens = tokenize(term);
    if tokens.is_empty() {
        return Err(PatternError::EmptyTerm(term.to_string()));
    }

    let body = tokens
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join(r"\s+");
    let pattern = format!(r"(?i)\b{}\b", body);

    Regex::new(&pattern).map_err(|source| PatternError::Invalid {
        term: term.to_string(),
        source,
    })
}

/// Per-language canonical keyword patterns
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    // BTreeMap keeps canonical keywords in sort order
    languages: HashMap<String, BTreeMap<String, Regex>>,
}

impl KeywordMatcher {
    pub fn new(definitions: &[KeywordDefinition]) -> Result<Self, PatternError> {
        let mut languages: HashMap<String, BTreeMap<String, Regex>> = HashMap::new();
        for definition in definitions {
            for (language, term) in &definition.terms {
                let regex = keyword_regex(term)?;
                languages
                    .entry(language.clone())
                    .or_default()
                    .insert(definition.canonical.clone(), regex);
            }
        }
        Ok(Self { languages })
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.languages.keys().map(|l| l.as_str()).collect();
        languages.sort_unstable();
        languages
    }

    pub fn keyword_count(&self, language: &str) -> usize {
        self.languages.get(language).map_or(0, |k| k.len())
    }

    /// Canonical keywords whose pattern matches `text`, sorted and unique.
    /// Empty when the language has no pattern set.
    pub fn extract_keywords(&self, language: Option<&str>, text: &str) -> Vec<String> {
        let Some(patterns) = language.and_then(|l| self.languages.get(l)) else {
            return Vec::new();
        };

        patterns
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(canonical, _)| canonical.clone())
            .collect()
    }
}

/// Rejects records where every pattern of some group matches
#[derive(Debug, Clone, Default)]
pub struct NoiseFilter {
    groups: Vec<Vec<Regex>>,
}

impl NoiseFilter {
    pub fn new(groups: &[Vec<String>]) -> Result<Self, PatternError> {
        let groups = groups
            .iter()
            .map(|group| group.iter().map(|t| keyword_regex(t)).collect())
            .collect::<Result<Vec<Vec<Regex>>, _>>()?;
        Ok(Self { groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn passes(&self, text: &str) -> bool {
        !self
            .groups
            .iter()
            .any(|group| !group.is_empty() && group.iter().all(|r| r.is_match(text)))
    }
}

/// Build both tables from a source
pub fn load_keywords(source: &dyn KeywordSource) -> anyhow::Result<(KeywordMatcher, NoiseFilter)> {
    let definitions = source.keyword_definitions()?;
    let matcher = KeywordMatcher::new(&definitions)?;
    let filter = NoiseFilter::new(&source.filter_groups()?)?;
    tracing::info!(
        keywords = definitions.len(),
        filters = filter.len(),
        "loaded keyword tables"
    );
    Ok((matcher, filter))
}
