//! Aggregation keys and values, and the weighted-mean merge

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tag carried by keys in persisted snapshot lines. Ignored when comparing.
pub const KEYWORD_TAG: &str = "keyword";

type KeyTuple = (String, String, Option<String>, String, String);

/// `(source, first_keyword, second_keyword, timespan, tile_id)`.
/// Pair keys always have `first_keyword <= second_keyword`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "KeyTuple", from = "KeyTuple")]
pub struct AggregationKey {
    pub source: String,
    pub first_keyword: String,
    pub second_keyword: Option<String>,
    pub timespan: String,
    pub tile_id: String,
}

impl AggregationKey {
    pub fn single(source: &str, keyword: &str, timespan: &str, tile_id: &str) -> Self {
        Self {
            source: source.to_string(),
            first_keyword: keyword.to_string(),
            second_keyword: None,
            timespan: timespan.to_string(),
            tile_id: tile_id.to_string(),
        }
    }

    pub fn pair(source: &str, first: &str, second: &str, timespan: &str, tile_id: &str) -> Self {
        Self {
            second_keyword: Some(second.to_string()),
            ..Self::single(source, first, timespan, tile_id)
        }
    }

    /// Same bucket dimensions, different tile
    pub fn with_tile(&self, tile_id: &str) -> Self {
        Self {
            tile_id: tile_id.to_string(),
            ..self.clone()
        }
    }
}

impl From<KeyTuple> for AggregationKey {
    fn from((source, first_keyword, second_keyword, timespan, tile_id): KeyTuple) -> Self {
        Self {
            source,
            first_keyword,
            second_keyword,
            timespan,
            tile_id,
        }
    }
}

impl From<AggregationKey> for KeyTuple {
    fn from(key: AggregationKey) -> Self {
        (
            key.source,
            key.first_keyword,
            key.second_keyword,
            key.timespan,
            key.tile_id,
        )
    }
}

impl fmt::Display for AggregationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.second_keyword {
            Some(second) => write!(
                f,
                "{}/{}+{}/{}/{}",
                self.source, self.first_keyword, second, self.timespan, self.tile_id
            ),
            None => write!(
                f,
                "{}/{}/{}/{}",
                self.source, self.first_keyword, self.timespan, self.tile_id
            ),
        }
    }
}

/// Count of contributing instances and their mean sentiment. Serialized as
/// `[count, avg_sentiment]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "(u64, f64)", from = "(u64, f64)")]
pub struct AggregationValue {
    pub count: u64,
    pub avg_sentiment: f64,
}

impl AggregationValue {
    /// Identity for `merge`
    pub const EMPTY: AggregationValue = AggregationValue {
        count: 0,
        avg_sentiment: 0.0,
    };

    pub fn new(count: u64, avg_sentiment: f64) -> Self {
        Self {
            count,
            avg_sentiment,
        }
    }

    /// A single observation
    pub fn observation(sentiment: f64) -> Self {
        Self::new(1, sentiment)
    }

    pub fn merge(&self, other: &AggregationValue) -> AggregationValue {
        merge_sentiment(self, other)
    }
}

impl From<(u64, f64)> for AggregationValue {
    fn from((count, avg_sentiment): (u64, f64)) -> Self {
        Self::new(count, avg_sentiment)
    }
}

impl From<AggregationValue> for (u64, f64) {
    fn from(value: AggregationValue) -> Self {
        (value.count, value.avg_sentiment)
    }
}

/// Merge running means weighted by their counts: each slot becomes
/// `(count_a * a[i] + count_b * b[i]) / (count_a + count_b)`.
/// A zero-count side is an identity and the other side is returned as is.
pub fn weighted_means<const N: usize>(
    count_a: u64,
    a: [f64; N],
    count_b: u64,
    b: [f64; N],
) -> (u64, [f64; N]) {
    if count_b == 0 {
        return (count_a, a);
    }
    if count_a == 0 {
        return (count_b, b);
    }

    let total = count_a + count_b;
    let (wa, wb, wt) = (count_a as f64, count_b as f64, total as f64);
    let mut merged = [0.0; N];
    for (slot, (x, y)) in merged.iter_mut().zip(a.iter().zip(b.iter())) {
        *slot = (wa * x + wb * y) / wt;
    }
    (total, merged)
}

/// Pairwise combiner used for every reduction: per-batch, against the
/// snapshot, and across rollup children
pub fn merge_sentiment(a: &AggregationValue, b: &AggregationValue) -> AggregationValue {
    let (count, [avg_sentiment]) =
        weighted_means(a.count, [a.avg_sentiment], b.count, [b.avg_sentiment]);
    AggregationValue {
        count,
        avg_sentiment,
    }
}

/// Keyed aggregates, sorted for deterministic output
pub type Aggregates = BTreeMap<AggregationKey, AggregationValue>;

/// Fold one value into a keyed map
pub fn accumulate(aggregates: &mut Aggregates, key: AggregationKey, value: AggregationValue) {
    aggregates
        .entry(key)
        .and_modify(|existing| *existing = merge_sentiment(existing, &value))
        .or_insert(value);
}

/// Union two keyed maps, merging shared keys
pub fn combine(mut left: Aggregates, mut right: Aggregates) -> Aggregates {
    if left.len() < right.len() {
        std::mem::swap(&mut left, &mut right);
    }
    for (key, value) in right {
        accumulate(&mut left, key, value);
    }
    left
}
