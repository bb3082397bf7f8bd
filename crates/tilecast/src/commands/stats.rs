use chrono::{DateTime, Utc};
use std::path::Path;
use tilecast_storage::{FileStore, RunStats, Storage, STATS_FILE};

pub fn run(root: &Path, container: &str) -> anyhow::Result<()> {
    let Some(stats) = load(root, container)? else {
        println!("No runs recorded in {}", root.join(container).display());
        return Ok(());
    };

    println!("Run:      {}", stats.run_id);
    println!("Started:  {}", format_millis(stats.start));
    match stats.end {
        Some(end) => println!(
            "Finished: {} ({} ms)",
            format_millis(end),
            end - stats.start
        ),
        None => println!("Finished: -"),
    }
    if let Some(exception) = &stats.exception {
        println!("Failed:   {}", exception);
    }
    for (key, value) in &stats.counts {
        println!("  {:<24} {}", key, value);
    }
    Ok(())
}

fn load(root: &Path, container: &str) -> anyhow::Result<Option<RunStats>> {
    let storage = FileStore::new(root);
    let mut document = String::new();
    for line in storage.load(container, STATS_FILE)? {
        document.push_str(&line?);
    }
    if document.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(&document)?))
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_saved_stats() {
        let temp = tempfile::TempDir::new().unwrap();
        let storage = FileStore::new(temp.path());
        let mut stats = RunStats::start("2016-05-11_00-00-00");
        stats.add("valid_tile", 7);
        stats.finish();
        assert!(stats.save(&storage, "tiles"));

        let loaded = load(temp.path(), "tiles").unwrap().unwrap();
        assert_eq!(loaded.get("valid_tile"), 7);
        assert!(run(temp.path(), "tiles").is_ok());
    }

    #[test]
    fn test_no_stats_yet() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(load(temp.path(), "tiles").unwrap().is_none());
        assert!(run(temp.path(), "tiles").is_ok());
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00+00:00");
    }
}
