#![allow(dead_code)]

use std::path::Path;
use tilecast_core::{Config, TimespanKind};
use tilecast_text::{
    load_keywords, KeywordDefinition, KeywordMatcher, LexiconEntry, LexiconScorer, NoiseFilter,
    ScriptLanguageIdentifier, StaticKeywords,
};

pub const BAGHDAD: [f64; 2] = [44.36, 33.31];

/// Keyword tables, lexicon and language identifier shared by a test
pub struct Tables {
    pub language: ScriptLanguageIdentifier,
    pub lexicon: LexiconScorer,
    pub matcher: KeywordMatcher,
    pub filter: NoiseFilter,
}

pub fn sample_tables() -> Tables {
    let source = StaticKeywords {
        definitions: vec![
            KeywordDefinition::bilingual("flood", Some("فيضان")),
            KeywordDefinition::bilingual("bridge", Some("جسر")),
            KeywordDefinition::bilingual("power outage", None),
        ],
        filters: vec![vec!["flood".to_string(), "movie".to_string()]],
    };
    let (matcher, filter) = load_keywords(&source).unwrap();

    Tables {
        language: ScriptLanguageIdentifier,
        lexicon: LexiconScorer::new(vec![
            LexiconEntry::new("good", 1.0, 0.0),
            LexiconEntry::new("bad", 0.0, 1.0),
        ]),
        matcher,
        filter,
    }
}

pub fn sample_config() -> Config {
    Config {
        timespans: vec![TimespanKind::Alltime, TimespanKind::Day],
        ..Config::default()
    }
}

pub fn record_line(sentence: &str, created: &str, locations: serde_json::Value) -> String {
    serde_json::json!({
        "Created": created,
        "Locations": locations,
        "MessageId": format!("{}-{}", created, sentence),
        "Sentence": sentence,
        "Source": "twitter"
    })
    .to_string()
}

pub fn at(point: [f64; 2]) -> serde_json::Value {
    serde_json::json!([{ "coordinates": point }])
}

/// Replace the input container's contents with one file
pub fn write_input(root: &Path, lines: &[String]) {
    let dir = root.join("input");
    if dir.exists() {
        std::fs::remove_dir_all(&dir).unwrap();
    }
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("batch.json"), lines.join("\n")).unwrap();
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| l.to_string())
        .collect()
}
