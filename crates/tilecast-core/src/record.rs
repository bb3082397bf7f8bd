//! Input records and their enriched form

use crate::error::RecordError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Fields every input line must carry, in validation order
pub const REQUIRED_FIELDS: [&str; 5] = ["Created", "Locations", "MessageId", "Sentence", "Source"];

/// One entry of a record's `Locations` array
#[derive(Debug, Clone, PartialEq)]
pub struct Location(pub Value);

/// Decoded shape of a location entry
#[derive(Debug, Clone, PartialEq)]
pub enum LocationShape {
    /// No `coordinates` member; the location is ignored
    Missing,
    Point { longitude: f64, latitude: f64 },
    /// `coordinates` is present but not a `[long, lat]` pair of numbers
    Malformed(String),
}

impl Location {
    pub fn shape(&self) -> LocationShape {
        let Some(coordinates) = self.0.get("coordinates") else {
            return LocationShape::Missing;
        };

        let pair = coordinates
            .as_array()
            .filter(|c| c.len() >= 2)
            .and_then(|c| Some((c[0].as_f64()?, c[1].as_f64()?)));

        match pair {
            Some((longitude, latitude)) => LocationShape::Point {
                longitude,
                latitude,
            },
            None => LocationShape::Malformed(coordinates.to_string()),
        }
    }
}

/// A validated input record
#[derive(Debug, Clone)]
pub struct Record {
    pub created_at: DateTime<Utc>,
    pub message_id: Value,
    pub source: String,
    pub text: String,
    pub locations: Vec<Location>,
    /// Language carried by the input line, if any
    pub language: Option<String>,
    /// The input JSON object, kept for the enriched dump
    pub fields: Map<String, Value>,
}

impl Record {
    /// Parse and validate one input line
    pub fn parse_line(line: &str) -> Result<Self, RecordError> {
        let value: Value = serde_json::from_str(line)?;
        let fields = match value {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidField("record")),
        };
        Self::from_fields(fields)
    }

    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, RecordError> {
        for field in REQUIRED_FIELDS {
            if !fields.contains_key(field) {
                return Err(RecordError::MissingField(field));
            }
        }

        let created = fields["Created"]
            .as_str()
            .ok_or(RecordError::InvalidField("Created"))?;
        let created_at =
            parse_timestamp(created).ok_or_else(|| RecordError::Timestamp(created.to_string()))?;

        let locations = fields["Locations"]
            .as_array()
            .ok_or(RecordError::InvalidField("Locations"))?
            .iter()
            .cloned()
            .map(Location)
            .collect();

        let text = fields["Sentence"]
            .as_str()
            .ok_or(RecordError::InvalidField("Sentence"))?
            .to_string();
        let source = fields["Source"]
            .as_str()
            .ok_or(RecordError::InvalidField("Source"))?
            .to_string();

        let language = fields
            .get("Language")
            .and_then(|l| l.as_str())
            .map(|l| l.to_string());

        Ok(Self {
            created_at,
            message_id: fields["MessageId"].clone(),
            source,
            text,
            locations,
            language,
            fields,
        })
    }
}

/// A record after language, sentiment and keyword enrichment
#[derive(Debug, Clone)]
pub struct EnrichedRecord {
    pub record: Record,
    pub language: Option<String>,
    pub sentiment: f64,
    /// Canonical keywords, sorted and unique
    pub keywords: Vec<String>,
}

impl EnrichedRecord {
    pub fn has_keywords(&self) -> bool {
        !self.keywords.is_empty()
    }

    /// Input fields plus `Language`, `Sentiment` and `Keywords`
    pub fn to_json(&self) -> Value {
        let mut fields = self.record.fields.clone();
        if let Some(language) = &self.language {
            fields.insert("Language".to_string(), Value::from(language.as_str()));
        }
        fields.insert("Sentiment".to_string(), Value::from(self.sentiment));
        fields.insert("Keywords".to_string(), Value::from(self.keywords.clone()));
        Value::Object(fields)
    }
}

const ZONED_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    // Twitter
    "%a %b %d %H:%M:%S %z %Y",
];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse a timestamp string; zone-less forms are taken as UTC and a bare
/// date as its midnight
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
