//! Error taxonomy for ingestion and geometry

use thiserror::Error;

/// Tile geocoding failures. Callers skip the affected location.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("coordinates ({latitude}, {longitude}) are outside the tile domain at zoom {zoom}")]
    OutOfDomain {
        latitude: f64,
        longitude: f64,
        zoom: u8,
    },
    #[error("zoom level {0} is outside the tile grid")]
    ZoomOutOfRange(i32),
    #[error("invalid tile id '{0}'")]
    InvalidTileId(String),
}

/// Reasons an input line is dropped at the ingestion boundary
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to parse record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("record is missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{0}' has an unexpected type")]
    InvalidField(&'static str),
    #[error("unparseable timestamp '{0}'")]
    Timestamp(String),
}

impl RecordError {
    /// Statistics bucket this error is counted under
    pub fn stat_key(&self, suffix: &str) -> String {
        match self {
            RecordError::Parse(_) => "parse_error".to_string(),
            RecordError::MissingField(field) => format!("missing_{}_{}", field, suffix),
            RecordError::InvalidField(field) => format!("invalid_{}_{}", field, suffix),
            RecordError::Timestamp(_) => format!("invalid_Created_{}", suffix),
        }
    }
}
