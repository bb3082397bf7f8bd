//! Run statistics document

use crate::store::Storage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATS_FILE: &str = "stats.json";

/// Start/end timestamps, per-stage record counts and error counts for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    #[serde(rename = "RunId")]
    pub run_id: String,
    /// Milliseconds since the Unix epoch
    #[serde(rename = "Start")]
    pub start: i64,
    #[serde(rename = "End", default)]
    pub end: Option<i64>,
    #[serde(rename = "Exception", default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
    #[serde(flatten)]
    pub counts: BTreeMap<String, u64>,
}

impl RunStats {
    pub fn start(run_id: &str) -> Self {
        Self::started_at(run_id, Utc::now())
    }

    pub fn started_at(run_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.to_string(),
            start: at.timestamp_millis(),
            end: None,
            exception: None,
            counts: BTreeMap::new(),
        }
    }

    pub fn incr(&mut self, key: &str) {
        self.add(key, 1);
    }

    pub fn add(&mut self, key: &str, value: u64) {
        *self.counts.entry(key.to_string()).or_insert(0) += value;
    }

    pub fn set(&mut self, key: &str, value: u64) {
        self.counts.insert(key.to_string(), value);
    }

    pub fn add_all(&mut self, counts: &BTreeMap<String, u64>) {
        for (key, value) in counts {
            self.add(key, *value);
        }
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn record_failure(&mut self, error: &dyn std::fmt::Display) {
        self.exception = Some(error.to_string());
    }

    pub fn finish(&mut self) {
        self.end = Some(Utc::now().timestamp_millis());
    }

    /// Persist to `container/stats.json`. Failure is logged, never raised.
    pub fn save(&self, storage: &dyn Storage, container: &str) -> bool {
        let payload = match serde_json::to_value(self) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize run stats");
                return false;
            }
        };
        match storage.save_json(&payload, container, STATS_FILE) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, payload = %payload, "failed to save run stats");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_counters() {
        let mut stats = RunStats::start("run");
        stats.incr("valid_tile");
        stats.incr("valid_tile");
        stats.add("segment_errors", 3);
        stats.set("delta_keys", 9);
        stats.set("delta_keys", 4);

        assert_eq!(stats.get("valid_tile"), 2);
        assert_eq!(stats.get("segment_errors"), 3);
        assert_eq!(stats.get("delta_keys"), 4);
        assert_eq!(stats.get("absent"), 0);
    }

    #[test]
    fn test_flat_document_shape() {
        let at = Utc.with_ymd_and_hms(2016, 5, 11, 0, 0, 0).unwrap();
        let mut stats = RunStats::started_at("2016-05-11_00-00-00", at);
        stats.incr("valid_tile");
        stats.record_failure(&"disk full");

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["Start"], at.timestamp_millis());
        assert_eq!(json["valid_tile"], 1);
        assert_eq!(json["Exception"], "disk full");
        assert_eq!(json["RunId"], "2016-05-11_00-00-00");

        let parsed: RunStats = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, stats);
    }

    #[test]
    fn test_finish_sets_end() {
        let mut stats = RunStats::start("run");
        assert!(stats.end.is_none());
        stats.finish();
        assert!(stats.end.unwrap() >= stats.start);
    }
}
