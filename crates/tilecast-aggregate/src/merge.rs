//! Incremental snapshot/delta merge and snapshot persistence
//!
//! A run writes its snapshot to `<snapshots>/<run_id>/part-00000`, then
//! switches `<snapshots>/CURRENT` to it. Readers only follow `CURRENT`, so a
//! run that fails before the switch leaves the previous snapshot in place.

use crate::key::{merge_sentiment, AggregationKey, AggregationValue, Aggregates, KEYWORD_TAG};
use serde::{Deserialize, Serialize};
use tilecast_storage::{Storage, StorageError};

pub const PART_FILE: &str = "part-00000";
pub const CURRENT_FILE: &str = "CURRENT";

/// Contents of the `CURRENT` pointer document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPointer {
    pub run_id: String,
}

type TaggedTuple = (String, String, String, Option<String>, String, String);

/// A persisted key, with or without the leading `"keyword"` tag
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum StoredKey {
    Tagged(TaggedTuple),
    Plain(AggregationKey),
}

impl From<StoredKey> for AggregationKey {
    fn from(stored: StoredKey) -> Self {
        match stored {
            StoredKey::Tagged((_tag, source, first_keyword, second_keyword, timespan, tile_id)) => {
                AggregationKey {
                    source,
                    first_keyword,
                    second_keyword,
                    timespan,
                    tile_id,
                }
            }
            StoredKey::Plain(key) => key,
        }
    }
}

/// `[["keyword", source, kw1, kw2|null, timespan, tile], [count, avg]]`
pub fn snapshot_line(
    key: &AggregationKey,
    value: &AggregationValue,
) -> Result<String, serde_json::Error> {
    let tagged = (
        KEYWORD_TAG,
        &key.source,
        &key.first_keyword,
        &key.second_keyword,
        &key.timespan,
        &key.tile_id,
    );
    serde_json::to_string(&(tagged, value))
}

/// `[[source, kw1, kw2|null, timespan, tile], [count, avg]]`
pub fn delta_line(
    key: &AggregationKey,
    value: &AggregationValue,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&(key, value))
}

/// Parse a snapshot or delta line; the tag is optional and ignored
pub fn parse_line(line: &str) -> Result<(AggregationKey, AggregationValue), serde_json::Error> {
    let (key, value): (StoredKey, AggregationValue) = serde_json::from_str(line)?;
    Ok((key.into(), value))
}

/// Serialize a keyed map lazily, dropping entries that fail to serialize
pub fn encode_lines<'a>(
    aggregates: &'a Aggregates,
    encode: fn(&AggregationKey, &AggregationValue) -> Result<String, serde_json::Error>,
) -> impl Iterator<Item = String> + 'a {
    aggregates
        .iter()
        .filter_map(move |(key, value)| match encode(key, value) {
            Ok(line) => Some(line),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "failed to encode aggregate");
                None
            }
        })
}

/// Result of merging this run's aggregates into the previous snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Union of old and new keys
    pub snapshot: Aggregates,
    /// Keys touched by this run, with their merged values
    pub delta: Aggregates,
}

/// Full outer merge of `fresh` into `previous`
pub fn merge(fresh: Aggregates, previous: Aggregates) -> MergeOutcome {
    let mut snapshot = previous;
    let mut delta = Aggregates::new();

    for (key, value) in fresh {
        let merged = match snapshot.get(&key) {
            Some(old) => merge_sentiment(old, &value),
            None => value,
        };
        delta.insert(key.clone(), merged);
        snapshot.insert(key, merged);
    }

    MergeOutcome { snapshot, delta }
}

/// A snapshot read back from storage
#[derive(Debug, Clone, Default)]
pub struct LoadedSnapshot {
    pub run_id: Option<String>,
    pub aggregates: Aggregates,
    /// Lines that could not be parsed and were skipped
    pub parse_errors: u64,
}

/// Snapshot persistence over a storage container
pub struct SnapshotStore<'a> {
    storage: &'a dyn Storage,
    container: &'a str,
}

impl<'a> SnapshotStore<'a> {
    pub fn new(storage: &'a dyn Storage, container: &'a str) -> Self {
        Self { storage, container }
    }

    /// Run id `CURRENT` points at, if any
    pub fn current_run_id(&self) -> Result<Option<String>, StorageError> {
        let mut document = String::new();
        for line in self.storage.load(self.container, CURRENT_FILE)? {
            document.push_str(&line?);
        }
        if document.trim().is_empty() {
            return Ok(None);
        }

        let pointer: SnapshotPointer = serde_json::from_str(&document)?;
        Ok(Some(pointer.run_id))
    }

    /// Load the current snapshot; empty when none has been switched to yet
    pub fn load(&self) -> Result<LoadedSnapshot, StorageError> {
        let Some(run_id) = self.current_run_id()? else {
            tracing::info!(container = self.container, "no previous snapshot");
            return Ok(LoadedSnapshot::default());
        };

        let pattern = format!("{}/part-*", run_id);
        let mut aggregates = Aggregates::new();
        let mut parse_errors = 0;
        for line in self.storage.load(self.container, &pattern)? {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(&line) {
                Ok((key, value)) => {
                    aggregates.insert(key, value);
                }
                Err(err) => {
                    tracing::warn!(run_id = %run_id, error = %err, "skipping snapshot line");
                    parse_errors += 1;
                }
            }
        }

        tracing::info!(run_id = %run_id, keys = aggregates.len(), "loaded snapshot");
        Ok(LoadedSnapshot {
            run_id: Some(run_id),
            aggregates,
            parse_errors,
        })
    }

    /// Write the snapshot for `run_id` without making it current
    pub fn save(&self, run_id: &str, aggregates: &Aggregates) -> Result<usize, StorageError> {
        let mut lines = encode_lines(aggregates, snapshot_line);
        self.storage
            .save_lines(&mut lines, self.container, &format!("{}/{}", run_id, PART_FILE))
    }

    /// Point `CURRENT` at `run_id`
    pub fn switch(&self, run_id: &str) -> Result<(), StorageError> {
        let pointer = serde_json::to_value(SnapshotPointer {
            run_id: run_id.to_string(),
        })?;
        self.storage.save_json(&pointer, self.container, CURRENT_FILE)
    }

    /// Delete every other run's snapshot. Best-effort: failures are logged.
    pub fn retain_only(&self, run_id: &str) -> u64 {
        match self.storage.delete_all_except(self.container, run_id) {
            Ok(deleted) => deleted as u64,
            Err(err) => {
                tracing::warn!(container = self.container, error = %err, "snapshot retention failed");
                0
            }
        }
    }
}
