//! Configuration for aggregation runs

use crate::timespan::TimespanKind;
use crate::tile::MAX_ZOOM;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage container names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Containers {
    /// Raw input lines
    pub input: String,
    /// Enriched record dumps
    pub messages: String,
    /// Full snapshots carried between runs
    pub snapshots: String,
    /// Deltas, rollups and run statistics
    pub tiles: String,
}

impl Containers {
    pub fn new() -> Self {
        Self {
            input: "input".to_string(),
            messages: "messages".to_string(),
            snapshots: "snapshots".to_string(),
            tiles: "tiles".to_string(),
        }
    }
}

impl Default for Containers {
    fn default() -> Self {
        Self::new()
    }
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Zoom level raw aggregates are geocoded at
    pub target_zoom: u8,

    /// Finest zoom level tracked
    pub max_zoom: u8,

    /// Rollup covers zoom levels from `zoom - max_detail_limit`...
    pub max_detail_limit: u8,

    /// ...up to, not including, `zoom - min_detail_limit`
    pub min_detail_limit: u8,

    /// Time windows every record is bucketed into
    pub timespans: Vec<TimespanKind>,

    /// Merge with the previous snapshot instead of replacing it
    pub incremental: bool,

    /// Write coarse-tile rollups of the delta
    pub rollup: bool,

    /// Glob of input files inside the input container
    pub input_pattern: String,

    /// Suffix for validation statistics keys
    pub stats_suffix: String,

    pub containers: Containers,
}

impl Config {
    pub fn new() -> Self {
        Self {
            target_zoom: 15,
            max_zoom: MAX_ZOOM,
            max_detail_limit: 5,
            min_detail_limit: 3,
            timespans: TimespanKind::ALL.to_vec(),
            incremental: true,
            rollup: true,
            input_pattern: "*.json".to_string(),
            stats_suffix: "tile".to_string(),
            containers: Containers::new(),
        }
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::new();
        assert_eq!(config.target_zoom, 15);
        assert_eq!(config.max_zoom, 16);
        assert_eq!(config.max_detail_limit, 5);
        assert_eq!(config.min_detail_limit, 3);
        assert_eq!(config.timespans.len(), 6);
        assert!(config.incremental);
    }

    #[test]
    fn test_partial_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"target_zoom": 14, "timespans": ["alltime", "day"], "containers": {"tiles": "out"}}"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.target_zoom, 14);
        assert_eq!(
            config.timespans,
            vec![TimespanKind::Alltime, TimespanKind::Day]
        );
        assert_eq!(config.containers.tiles, "out");
        assert_eq!(config.containers.input, "input");
        assert_eq!(config.max_detail_limit, 5);
    }
}
