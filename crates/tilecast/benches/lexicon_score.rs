use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tilecast_text::{KeywordDefinition, KeywordMatcher, LexiconEntry, LexiconScorer};

fn sample_scorer() -> LexiconScorer {
    let mut entries = Vec::new();
    for i in 0..2000 {
        entries.push(LexiconEntry::new(&format!("word{}", i), 0.4, 0.1));
    }
    entries.push(LexiconEntry::new("not good", 0.0, 0.6));
    entries.push(LexiconEntry::new("good", 0.7, 0.0));
    LexiconScorer::new(entries)
}

const SENTENCE: &str = "The bridge is not good after the flood, but word17 crews say the \
                        power outage should end soon and word1999 looks good";

fn bench_score(c: &mut Criterion) {
    let scorer = sample_scorer();
    c.bench_function("lexicon_score_sentence", |b| {
        b.iter(|| scorer.score(black_box(SENTENCE)));
    });
}

fn bench_keywords(c: &mut Criterion) {
    let definitions: Vec<KeywordDefinition> = ["flood", "bridge", "power outage", "army", "dam"]
        .iter()
        .map(|term| KeywordDefinition::bilingual(term, None))
        .collect();
    let matcher = KeywordMatcher::new(&definitions).unwrap();

    c.bench_function("extract_keywords_sentence", |b| {
        b.iter(|| matcher.extract_keywords(Some("en"), black_box(SENTENCE)));
    });
}

criterion_group!(benches, bench_score, bench_keywords);
criterion_main!(benches);
