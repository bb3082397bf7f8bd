//! SQLite-backed keyword and noise-filter tables

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tilecast_text::{KeywordDefinition, KeywordSource};

/// A stored keyword row
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordRow {
    pub en_term: String,
    pub ar_term: Option<String>,
}

pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS keywords (
                en_term TEXT PRIMARY KEY,
                ar_term TEXT
            );
            CREATE TABLE IF NOT EXISTS filters (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filtered_terms TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    pub fn add_keyword(&self, en_term: &str, ar_term: Option<&str>) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO keywords (en_term, ar_term) VALUES (?1, ?2)",
            params![en_term, ar_term],
        )?;
        Ok(())
    }

    pub fn remove_keyword(&self, en_term: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM keywords WHERE en_term = ?1", params![en_term])?;
        Ok(removed > 0)
    }

    pub fn keywords(&self) -> Result<Vec<KeywordRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT en_term, ar_term FROM keywords ORDER BY en_term")?;
        let rows = stmt.query_map([], |row| {
            Ok(KeywordRow {
                en_term: row.get(0)?,
                ar_term: row.get(1)?,
            })
        })?;

        let mut keywords = Vec::new();
        for row in rows {
            keywords.push(row?);
        }
        Ok(keywords)
    }

    /// Store a conjunctive filter group; returns its id
    pub fn add_filter(&self, terms: &[String]) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO filters (filtered_terms) VALUES (?1)",
            params![serde_json::to_string(terms)?],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn filters(&self) -> Result<Vec<(i64, Vec<String>)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, filtered_terms FROM filters ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut filters = Vec::new();
        for row in rows {
            let (id, terms) = row?;
            let terms: Vec<String> = serde_json::from_str(&terms)
                .with_context(|| format!("filter {} has malformed terms", id))?;
            filters.push((id, terms));
        }
        Ok(filters)
    }
}

impl KeywordSource for MetadataStore {
    fn keyword_definitions(&self) -> Result<Vec<KeywordDefinition>> {
        Ok(self
            .keywords()?
            .iter()
            .map(|row| KeywordDefinition::bilingual(&row.en_term, row.ar_term.as_deref()))
            .collect())
    }

    fn filter_groups(&self) -> Result<Vec<Vec<String>>> {
        Ok(self.filters()?.into_iter().map(|(_, terms)| terms).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_roundtrip() {
        let store = MetadataStore::in_memory().unwrap();
        store.add_keyword("Flood", Some("فيضان")).unwrap();
        store.add_keyword("bridge", None).unwrap();
        store.add_keyword("bridge", Some("جسر")).unwrap();

        let rows = store.keywords().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].en_term, "bridge");
        assert_eq!(rows[1].ar_term.as_deref(), Some("جسر"));

        assert!(store.remove_keyword("bridge").unwrap());
        assert!(!store.remove_keyword("bridge").unwrap());
    }

    #[test]
    fn test_keyword_source_definitions() {
        let store = MetadataStore::in_memory().unwrap();
        store.add_keyword("Flood", Some("فيضان")).unwrap();

        let definitions = store.keyword_definitions().unwrap();
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].canonical, "flood");
        assert_eq!(definitions[0].terms["en"], "Flood");
        assert_eq!(definitions[0].terms["ar"], "فيضان");
    }

    #[test]
    fn test_filters() {
        let store = MetadataStore::in_memory().unwrap();
        let id = store
            .add_filter(&["flood".to_string(), "movie".to_string()])
            .unwrap();
        assert!(id > 0);

        let groups = store.filter_groups().unwrap();
        assert_eq!(groups, vec![vec!["flood".to_string(), "movie".to_string()]]);
    }

    #[test]
    fn test_open_on_disk() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("meta/keywords.db");
        {
            let store = MetadataStore::open(&path).unwrap();
            store.add_keyword("army", None).unwrap();
        }
        let reopened = MetadataStore::open(&path).unwrap();
        assert_eq!(reopened.keywords().unwrap().len(), 1);
    }
}
