use std::path::Path;
use tilecast_storage::MetadataStore;
use tilecast_text::{keyword_regex, NoiseFilter};

pub fn run_add(metadata: &Path, en_term: &str, ar_term: Option<&str>) -> anyhow::Result<()> {
    // Reject terms that can never match before storing them
    keyword_regex(en_term)?;
    if let Some(ar) = ar_term.filter(|t| !t.trim().is_empty()) {
        keyword_regex(ar)?;
    }

    let store = MetadataStore::open(metadata)?;
    store.add_keyword(en_term, ar_term)?;
    println!("Added keyword '{}'", en_term.to_lowercase());
    Ok(())
}

pub fn run_remove(metadata: &Path, en_term: &str) -> anyhow::Result<()> {
    let store = MetadataStore::open(metadata)?;
    if store.remove_keyword(en_term)? {
        println!("Removed keyword '{}'", en_term);
    } else {
        anyhow::bail!("keyword '{}' not found", en_term);
    }
    Ok(())
}

pub fn run_filter(metadata: &Path, terms: &[String]) -> anyhow::Result<()> {
    NoiseFilter::new(&[terms.to_vec()])?;

    let store = MetadataStore::open(metadata)?;
    let id = store.add_filter(terms)?;
    println!("Added filter {}: {}", id, terms.join(" + "));
    Ok(())
}

pub fn run_list(metadata: &Path) -> anyhow::Result<()> {
    let store = MetadataStore::open(metadata)?;

    let keywords = store.keywords()?;
    println!("Keywords ({}):", keywords.len());
    for row in &keywords {
        match &row.ar_term {
            Some(ar) => println!("  {} / {}", row.en_term, ar),
            None => println!("  {}", row.en_term),
        }
    }

    let filters = store.filters()?;
    println!("Filters ({}):", filters.len());
    for (id, terms) in &filters {
        println!("  {}: {}", id, terms.join(" + "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_commands() {
        let temp = tempfile::TempDir::new().unwrap();
        let db = temp.path().join("meta.db");

        run_add(&db, "Flood", Some("فيضان")).unwrap();
        run_add(&db, "bridge", None).unwrap();
        run_filter(&db, &["flood".to_string(), "movie".to_string()]).unwrap();
        assert!(run_list(&db).is_ok());

        let store = MetadataStore::open(&db).unwrap();
        assert_eq!(store.keywords().unwrap().len(), 2);
        assert_eq!(store.filters().unwrap().len(), 1);
        drop(store);

        run_remove(&db, "bridge").unwrap();
        assert!(run_remove(&db, "bridge").is_err());
    }

    #[test]
    fn test_rejects_empty_terms() {
        let temp = tempfile::TempDir::new().unwrap();
        let db = temp.path().join("meta.db");
        assert!(run_add(&db, "   ", None).is_err());
        assert!(run_filter(&db, &["".to_string()]).is_err());
    }
}
