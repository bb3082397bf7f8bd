use anyhow::Context;
use std::path::Path;
use tilecast_text::LexiconScorer;

pub fn run(lexicon: &Path, text: &str) -> anyhow::Result<()> {
    let scorer = LexiconScorer::from_file(lexicon)
        .with_context(|| format!("failed to read lexicon {}", lexicon.display()))?;
    if scorer.is_empty() {
        tracing::warn!(path = %lexicon.display(), "lexicon has no entries");
    }
    println!("{}", scorer.score(text));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_command() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("lexicon.jsonl");
        std::fs::write(&path, r#"{"word": "calm", "pos": 0.5, "neg": 0.0}"#).unwrap();

        assert!(run(&path, "all calm today").is_ok());
        assert!(run(&temp.path().join("missing.jsonl"), "x").is_err());
    }
}
