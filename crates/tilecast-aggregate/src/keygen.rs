//! Expansion of enriched records into aggregation keys
//!
//! A record with `n` keywords produces `n(n+1)/2` entries for every
//! timespan and valid location. The expansion is lazy so high-keyword
//! records never materialize their full fan-out.

use crate::key::{AggregationKey, AggregationValue};
use std::slice;
use thiserror::Error;
use tilecast_core::{
    tile_id_from_lat_long, Config, EnrichedRecord, GeometryError, Location, LocationShape,
    TimespanKind,
};

/// Per-location failures; the location is skipped, the record is not
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KeyError {
    #[error("unexpected location payload: {0}")]
    UnexpectedType(String),
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl KeyError {
    pub fn kind(&self) -> &'static str {
        match self {
            KeyError::UnexpectedType(_) => "TypeError",
            KeyError::Geometry(_) => "ValueError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Entry(AggregationKey, AggregationValue),
    Error(KeyError),
}

/// Index pairs over a sorted keyword list: `(i, None)` for each single
/// keyword followed by `(i, Some(j))` for every `j > i`
#[derive(Debug, Clone)]
pub struct KeywordPairs {
    n: usize,
    i: usize,
    j: usize,
}

pub fn keyword_pairs(n: usize) -> KeywordPairs {
    KeywordPairs { n, i: 0, j: 0 }
}

impl Iterator for KeywordPairs {
    type Item = (usize, Option<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.n {
            return None;
        }

        let item = if self.j == self.i {
            (self.i, None)
        } else {
            (self.i, Some(self.j))
        };

        self.j += 1;
        if self.j >= self.n {
            self.i += 1;
            self.j = self.i;
        }
        Some(item)
    }
}

#[derive(Debug, Clone)]
pub struct KeyGenerator {
    zoom: u8,
    timespans: Vec<TimespanKind>,
}

impl KeyGenerator {
    pub fn new(zoom: u8, timespans: Vec<TimespanKind>) -> Self {
        Self { zoom, timespans }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.target_zoom, config.timespans.clone())
    }

    /// Tile id for a location; `Ok(None)` when it carries no coordinates
    pub fn geocode(&self, location: &Location) -> Result<Option<String>, KeyError> {
        match location.shape() {
            LocationShape::Missing => Ok(None),
            LocationShape::Malformed(payload) => Err(KeyError::UnexpectedType(payload)),
            LocationShape::Point {
                longitude,
                latitude,
            } => Ok(Some(tile_id_from_lat_long(latitude, longitude, self.zoom)?)),
        }
    }

    pub fn emissions<'a>(&'a self, record: &'a EnrichedRecord) -> RecordEmissions<'a> {
        let labels = self
            .timespans
            .iter()
            .map(|kind| kind.label(&record.record.created_at))
            .collect();

        RecordEmissions {
            generator: self,
            record,
            labels,
            locations: record.record.locations.iter(),
            tile_id: None,
            label_idx: 0,
            pairs: keyword_pairs(0),
        }
    }
}

/// Lazy emission stream for one record
pub struct RecordEmissions<'a> {
    generator: &'a KeyGenerator,
    record: &'a EnrichedRecord,
    labels: Vec<String>,
    locations: slice::Iter<'a, Location>,
    tile_id: Option<String>,
    label_idx: usize,
    pairs: KeywordPairs,
}

impl<'a> Iterator for RecordEmissions<'a> {
    type Item = Emission;

    fn next(&mut self) -> Option<Emission> {
        let keywords = &self.record.keywords;

        loop {
            if let Some(tile_id) = &self.tile_id {
                if let Some(label) = self.labels.get(self.label_idx) {
                    if let Some((i, j)) = self.pairs.next() {
                        let key = AggregationKey {
                            source: self.record.record.source.clone(),
                            first_keyword: keywords[i].clone(),
                            second_keyword: j.map(|j| keywords[j].clone()),
                            timespan: label.clone(),
                            tile_id: tile_id.clone(),
                        };
                        let value = AggregationValue::observation(self.record.sentiment);
                        return Some(Emission::Entry(key, value));
                    }
                    self.label_idx += 1;
                    self.pairs = keyword_pairs(keywords.len());
                    continue;
                }
                self.tile_id = None;
            }

            let location = self.locations.next()?;
            match self.generator.geocode(location) {
                Ok(Some(tile_id)) => {
                    self.tile_id = Some(tile_id);
                    self.label_idx = 0;
                    self.pairs = keyword_pairs(keywords.len());
                }
                Ok(None) => continue,
                Err(err) => return Some(Emission::Error(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilecast_core::Record;

    fn record(locations: serde_json::Value, keywords: &[&str]) -> EnrichedRecord {
        let line = serde_json::json!({
            "Created": "2016-05-11T21:45:55Z",
            "Locations": locations,
            "MessageId": "m1",
            "Sentence": "text",
            "Source": "twitter"
        });
        EnrichedRecord {
            record: Record::parse_line(&line.to_string()).unwrap(),
            language: Some("en".to_string()),
            sentiment: 0.75,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn entries(emissions: impl Iterator<Item = Emission>) -> Vec<AggregationKey> {
        emissions
            .filter_map(|e| match e {
                Emission::Entry(key, _) => Some(key),
                Emission::Error(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_keyword_pairs_order() {
        let pairs: Vec<_> = keyword_pairs(3).collect();
        assert_eq!(
            pairs,
            vec![
                (0, None),
                (0, Some(1)),
                (0, Some(2)),
                (1, None),
                (1, Some(2)),
                (2, None)
            ]
        );
        assert_eq!(keyword_pairs(0).count(), 0);
        assert_eq!(keyword_pairs(1).count(), 1);
        assert_eq!(keyword_pairs(10).count(), 55);
    }

    #[test]
    fn test_three_keywords_single_timespan() {
        let generator = KeyGenerator::new(15, vec![TimespanKind::Alltime]);
        let record = record(serde_json::json!([{"coordinates": [44.36, 33.31]}]), &["a", "b", "c"]);

        let keys = entries(generator.emissions(&record));
        assert_eq!(keys.len(), 6);

        let tile = tile_id_from_lat_long(33.31, 44.36, 15).unwrap();
        let expected = vec![
            AggregationKey::single("twitter", "a", "alltime", &tile),
            AggregationKey::pair("twitter", "a", "b", "alltime", &tile),
            AggregationKey::pair("twitter", "a", "c", "alltime", &tile),
            AggregationKey::single("twitter", "b", "alltime", &tile),
            AggregationKey::pair("twitter", "b", "c", "alltime", &tile),
            AggregationKey::single("twitter", "c", "alltime", &tile),
        ];
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_pairs_never_descend() {
        let generator = KeyGenerator::new(15, TimespanKind::ALL.to_vec());
        let record = record(
            serde_json::json!([{"coordinates": [44.36, 33.31]}, {"coordinates": [-0.12, 51.5]}]),
            &["army", "bridge", "flood", "power outage"],
        );

        let keys = entries(generator.emissions(&record));
        // 10 entries x 6 timespans x 2 locations
        assert_eq!(keys.len(), 120);
        for key in keys {
            if let Some(second) = &key.second_keyword {
                assert!(key.first_keyword < *second);
            }
        }
    }

    #[test]
    fn test_values_carry_sentiment() {
        let generator = KeyGenerator::new(15, vec![TimespanKind::Day]);
        let record = record(serde_json::json!([{"coordinates": [44.36, 33.31]}]), &["a"]);

        let emissions: Vec<_> = generator.emissions(&record).collect();
        assert_eq!(emissions.len(), 1);
        match &emissions[0] {
            Emission::Entry(key, value) => {
                assert_eq!(key.timespan, "day-2016-05-11");
                assert_eq!(*value, AggregationValue::new(1, 0.75));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_location_without_coordinates_is_skipped() {
        let generator = KeyGenerator::new(15, vec![TimespanKind::Alltime]);
        let record = record(
            serde_json::json!([{"name": "somewhere"}, {"coordinates": [44.36, 33.31]}]),
            &["a", "b"],
        );

        let emissions: Vec<_> = generator.emissions(&record).collect();
        assert_eq!(emissions.len(), 3);
        assert!(emissions.iter().all(|e| matches!(e, Emission::Entry(..))));
    }

    #[test]
    fn test_bad_locations_yield_errors_and_siblings_survive() {
        let generator = KeyGenerator::new(15, vec![TimespanKind::Alltime, TimespanKind::Year]);
        let record = record(
            serde_json::json!([
                {"coordinates": ["east", "north"]},
                {"coordinates": [10.0, 90.0]},
                {"coordinates": [44.36, 33.31]}
            ]),
            &["a"],
        );

        let emissions: Vec<_> = generator.emissions(&record).collect();
        let errors: Vec<_> = emissions
            .iter()
            .filter_map(|e| match e {
                Emission::Error(err) => Some(err.kind()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["TypeError", "ValueError"]);
        assert_eq!(entries(emissions.into_iter()).len(), 2);
    }

    #[test]
    fn test_no_locations_no_emissions() {
        let generator = KeyGenerator::new(15, TimespanKind::ALL.to_vec());
        let record = record(serde_json::json!([]), &["a", "b"]);
        assert_eq!(generator.emissions(&record).count(), 0);
    }
}
