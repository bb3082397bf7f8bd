//! Lexicon-based sentiment scoring

use crate::tokenize::{normalize_phrase, tokenize};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub const NEUTRAL: f64 = 0.5;

/// One lexicon line. Script variants share the score pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub word: String,
    pub pos: f64,
    pub neg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_ar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_ur: Option<String>,
}

impl LexiconEntry {
    pub fn new(word: &str, pos: f64, neg: f64) -> Self {
        Self {
            word: word.to_string(),
            pos,
            neg,
            word_ar: None,
            word_ur: None,
        }
    }

    /// Both sides must lie in `[0, 1]` for scores to stay in range
    pub fn in_range(&self) -> bool {
        (0.0..=1.0).contains(&self.pos) && (0.0..=1.0).contains(&self.neg)
    }

    fn terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.word.as_str())
            .chain(self.word_ar.as_deref())
            .chain(self.word_ur.as_deref())
    }
}

/// Longest-match-first phrase scorer, built once per run
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer {
    lookup: HashMap<String, (f64, f64)>,
    max_phrase_len: usize,
}

impl LexiconScorer {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = LexiconEntry>,
    {
        let mut scorer = Self::default();
        let skipped = entries
            .into_iter()
            .filter(|entry| !scorer.insert(entry))
            .count();
        if skipped > 0 {
            tracing::warn!(skipped, "skipped lexicon entries with scores outside [0, 1]");
        }
        scorer
    }

    /// Build from JSON lines, skipping malformed and out-of-range ones
    pub fn from_lines<'a, I>(lines: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut scorer = Self::default();
        let mut skipped = 0usize;
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let inserted = serde_json::from_str::<LexiconEntry>(line)
                .map(|entry| scorer.insert(&entry))
                .unwrap_or(false);
            if !inserted {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "skipped malformed or out-of-range lexicon lines");
        }
        scorer
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_lines(content.lines()))
    }

    fn insert(&mut self, entry: &LexiconEntry) -> bool {
        if !entry.in_range() {
            return false;
        }
        for term in entry.terms() {
            let key = normalize_phrase(term);
            if key.is_empty() {
                continue;
            }
            let phrase_len = key.split(' ').count();

            // Duplicates keep the least neutral score on each side
            let scores = self.lookup.entry(key).or_insert((0.0, 0.0));
            scores.0 = scores.0.max(entry.pos);
            scores.1 = scores.1.max(entry.neg);

            self.max_phrase_len = self.max_phrase_len.max(phrase_len);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn max_phrase_len(&self) -> usize {
        self.max_phrase_len
    }

    /// Sentiment in `[0, 1]`; `0.5` when nothing matched or the sides tie
    pub fn score(&self, text: &str) -> f64 {
        let folded = text.to_lowercase();
        let tokens = tokenize(&folded);

        let mut pos = 0.0;
        let mut neg = 0.0;
        let mut matched_terms = 0usize;

        let mut i = 0;
        while i < tokens.len() {
            let longest = self.max_phrase_len.min(tokens.len() - i);
            let matched = (1..=longest).rev().find_map(|len| {
                let phrase = tokens[i..i + len].join(" ");
                self.lookup.get(&phrase).map(|scores| (len, *scores))
            });

            match matched {
                Some((len, (p, n))) => {
                    pos += p;
                    neg += n;
                    matched_terms += 1;
                    i += len;
                }
                None => i += 1,
            }
        }

        if pos == neg {
            NEUTRAL
        } else if pos > neg {
            NEUTRAL + pos / matched_terms as f64 / 2.0
        } else {
            NEUTRAL - neg / matched_terms as f64 / 2.0
        }
    }
}
