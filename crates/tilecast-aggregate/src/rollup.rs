//! Multi-resolution rollup of fine-tile aggregates into coarser buckets

use crate::key::{merge_sentiment, AggregationKey, AggregationValue, Aggregates};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tilecast_core::{tile_id_from_lat_long, Config, GeometryError, Tile};

/// Child tile aggregates gathered under one coarse tile.
/// Serialized as `{child_tile_id: [count, avg], ...}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollupBucket {
    pub children: BTreeMap<String, AggregationValue>,
}

impl RollupBucket {
    pub fn single(tile_id: &str, value: AggregationValue) -> Self {
        let mut children = BTreeMap::new();
        children.insert(tile_id.to_string(), value);
        Self { children }
    }

    /// Union of both child maps; a child in both is merged
    pub fn merge(&mut self, other: RollupBucket) {
        for (tile_id, value) in other.children {
            self.children
                .entry(tile_id)
                .and_modify(|existing| *existing = merge_sentiment(existing, &value))
                .or_insert(value);
        }
    }

    /// Weighted merge of every child
    pub fn total(&self) -> AggregationValue {
        self.children
            .values()
            .fold(AggregationValue::EMPTY, |acc, v| merge_sentiment(&acc, v))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Buckets keyed by the coarse tile
pub type Rollups = BTreeMap<AggregationKey, RollupBucket>;

fn combine_rollups(mut left: Rollups, mut right: Rollups) -> Rollups {
    if left.len() < right.len() {
        std::mem::swap(&mut left, &mut right);
    }
    for (key, bucket) in right {
        match left.get_mut(&key) {
            Some(existing) => existing.merge(bucket),
            None => {
                left.insert(key, bucket);
            }
        }
    }
    left
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollupEngine {
    max_zoom: u8,
    max_detail_limit: u8,
    min_detail_limit: u8,
}

impl RollupEngine {
    pub fn new(max_zoom: u8, max_detail_limit: u8, min_detail_limit: u8) -> Self {
        Self {
            max_zoom,
            max_detail_limit,
            min_detail_limit,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_zoom,
            config.max_detail_limit,
            config.min_detail_limit,
        )
    }

    /// Zoom levels a tile at `zoom` is rolled up into. The two finest levels
    /// extend the range up to, not including, their own zoom.
    pub fn zoom_range(&self, zoom: u8) -> Range<u8> {
        let zoom_i = i32::from(zoom);
        let low = zoom_i - i32::from(self.max_detail_limit);
        let high = if zoom + 1 == self.max_zoom || zoom == self.max_zoom {
            zoom_i
        } else {
            zoom_i - i32::from(self.min_detail_limit)
        };

        let low = low.max(0);
        let high = high.max(low);
        (low as u8)..(high as u8)
    }

    /// Buckets one fine aggregate contributes to, coarsest first
    pub fn buckets_for(
        &self,
        key: &AggregationKey,
        value: &AggregationValue,
    ) -> Result<Vec<(AggregationKey, RollupBucket)>, GeometryError> {
        let tile = Tile::from_id(&key.tile_id)
            .ok_or_else(|| GeometryError::InvalidTileId(key.tile_id.clone()))?;
        let (latitude, longitude) = tile.center();

        self.zoom_range(tile.zoom)
            .map(|zoom| {
                let bucket_tile = tile_id_from_lat_long(latitude, longitude, zoom)?;
                Ok((
                    key.with_tile(&bucket_tile),
                    RollupBucket::single(&key.tile_id, *value),
                ))
            })
            .collect()
    }

    /// Roll every aggregate up; keys with undecodable tiles are skipped and
    /// counted in the returned error total
    pub fn rollup_all(&self, aggregates: &Aggregates) -> (Rollups, u64) {
        aggregates
            .par_iter()
            .fold(
                || (Rollups::new(), 0u64),
                |(mut rollups, mut errors), (key, value)| {
                    match self.buckets_for(key, value) {
                        Ok(buckets) => {
                            for (bucket_key, bucket) in buckets {
                                match rollups.get_mut(&bucket_key) {
                                    Some(existing) => existing.merge(bucket),
                                    None => {
                                        rollups.insert(bucket_key, bucket);
                                    }
                                }
                            }
                        }
                        Err(err) => {
                            tracing::warn!(key = %key, error = %err, "skipping rollup");
                            errors += 1;
                        }
                    }
                    (rollups, errors)
                },
            )
            .reduce(
                || (Rollups::new(), 0),
                |(left, left_errors), (right, right_errors)| {
                    (combine_rollups(left, right), left_errors + right_errors)
                },
            )
    }
}

impl Default for RollupEngine {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// `[[source, kw1, kw2, timespan, bucket_tile], {child: [count, avg]}]`
pub fn rollup_line(
    key: &AggregationKey,
    bucket: &RollupBucket,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&(key, bucket))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAGHDAD: (f64, f64) = (33.31, 44.36);

    #[test]
    fn test_zoom_ranges() {
        let engine = RollupEngine::default();
        assert_eq!(engine.zoom_range(15), 10..15);
        assert_eq!(engine.zoom_range(16), 11..16);
        assert_eq!(engine.zoom_range(12), 7..9);
        assert_eq!(engine.zoom_range(4), 0..1);
        assert_eq!(engine.zoom_range(2), 0..0);
    }

    #[test]
    fn test_buckets_for_target_zoom() {
        let engine = RollupEngine::default();
        let tile = tile_id_from_lat_long(BAGHDAD.0, BAGHDAD.1, 15).unwrap();
        let key = AggregationKey::pair("twitter", "bridge", "flood", "alltime", &tile);
        let value = AggregationValue::new(2, 0.8);

        let buckets = engine.buckets_for(&key, &value).unwrap();
        assert_eq!(buckets.len(), 5);

        let zooms: Vec<u8> = buckets
            .iter()
            .map(|(k, _)| Tile::from_id(&k.tile_id).unwrap().zoom)
            .collect();
        assert_eq!(zooms, vec![10, 11, 12, 13, 14]);

        for (bucket_key, bucket) in &buckets {
            assert_eq!(bucket_key.timespan, "alltime");
            assert_eq!(bucket_key.second_keyword.as_deref(), Some("flood"));
            assert_eq!(bucket.children[&tile], value);
        }
    }

    #[test]
    fn test_invalid_tile_is_an_error() {
        let engine = RollupEngine::default();
        let key = AggregationKey::single("s", "a", "alltime", "not-a-tile");
        assert!(matches!(
            engine.buckets_for(&key, &AggregationValue::observation(0.5)),
            Err(GeometryError::InvalidTileId(_))
        ));
    }

    #[test]
    fn test_bucket_merge_and_total() {
        let mut bucket = RollupBucket::single("15_1_1", AggregationValue::new(2, 0.8));
        bucket.merge(RollupBucket::single("15_1_2", AggregationValue::new(2, 0.2)));
        bucket.merge(RollupBucket::single("15_1_1", AggregationValue::new(2, 0.4)));

        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.children["15_1_1"].count, 4);
        assert!((bucket.children["15_1_1"].avg_sentiment - 0.6).abs() < 1e-12);

        let total = bucket.total();
        assert_eq!(total.count, 6);
        assert!((total.avg_sentiment - (0.6 * 4.0 + 0.2 * 2.0) / 6.0).abs() < 1e-12);
        assert_eq!(RollupBucket::default().total(), AggregationValue::EMPTY);
    }

    #[test]
    fn test_rollup_all_groups_neighbours_and_keeps_timespans_apart() {
        let engine = RollupEngine::default();
        let first = tile_id_from_lat_long(BAGHDAD.0, BAGHDAD.1, 15).unwrap();
        let second = tile_id_from_lat_long(BAGHDAD.0 + 0.01, BAGHDAD.1 + 0.01, 15).unwrap();
        assert_ne!(first, second);

        let mut aggregates = Aggregates::new();
        aggregates.insert(
            AggregationKey::single("s", "flood", "alltime", &first),
            AggregationValue::new(1, 1.0),
        );
        aggregates.insert(
            AggregationKey::single("s", "flood", "alltime", &second),
            AggregationValue::new(3, 0.0),
        );
        aggregates.insert(
            AggregationKey::single("s", "flood", "year-2016", &first),
            AggregationValue::new(1, 1.0),
        );
        aggregates.insert(
            AggregationKey::single("s", "flood", "alltime", "bogus"),
            AggregationValue::new(1, 1.0),
        );

        let (rollups, errors) = engine.rollup_all(&aggregates);
        assert_eq!(errors, 1);

        let coarse = tile_id_from_lat_long(BAGHDAD.0, BAGHDAD.1, 10).unwrap();
        let alltime = &rollups[&AggregationKey::single("s", "flood", "alltime", &coarse)];
        assert_eq!(alltime.len(), 2);
        assert_eq!(alltime.total().count, 4);
        assert!((alltime.total().avg_sentiment - 0.25).abs() < 1e-12);

        let yearly = &rollups[&AggregationKey::single("s", "flood", "year-2016", &coarse)];
        assert_eq!(yearly.len(), 1);
    }

    #[test]
    fn test_rollup_line_shape() {
        let key = AggregationKey::single("s", "flood", "alltime", "10_1_2");
        let bucket = RollupBucket::single("15_40_70", AggregationValue::new(2, 0.5));
        assert_eq!(
            rollup_line(&key, &bucket).unwrap(),
            r#"[["s","flood",null,"alltime","10_1_2"],{"15_40_70":[2,0.5]}]"#
        );
    }
}
