//! Timespan bucket labels

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Time window granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimespanKind {
    Alltime,
    Year,
    Month,
    Week,
    Day,
    Hour,
}

impl TimespanKind {
    pub const ALL: [TimespanKind; 6] = [
        TimespanKind::Alltime,
        TimespanKind::Year,
        TimespanKind::Month,
        TimespanKind::Week,
        TimespanKind::Day,
        TimespanKind::Hour,
    ];

    /// Bucket label for `timestamp`. Weeks use the ISO week number paired
    /// with the calendar year.
    pub fn label(&self, timestamp: &DateTime<Utc>) -> String {
        match self {
            TimespanKind::Alltime => "alltime".to_string(),
            TimespanKind::Year => format!("year-{}", timestamp.year()),
            TimespanKind::Month => format!("month-{}-{:02}", timestamp.year(), timestamp.month()),
            TimespanKind::Week => format!(
                "week-{}-{:02}",
                timestamp.year(),
                timestamp.iso_week().week()
            ),
            TimespanKind::Day => format!(
                "day-{}-{:02}-{:02}",
                timestamp.year(),
                timestamp.month(),
                timestamp.day()
            ),
            TimespanKind::Hour => format!(
                "hour-{}-{:02}-{:02}-{:02}:00",
                timestamp.year(),
                timestamp.month(),
                timestamp.day(),
                timestamp.hour()
            ),
        }
    }
}

/// Labels for every timespan kind, in `TimespanKind::ALL` order
pub fn timespan_labels(timestamp: &DateTime<Utc>) -> Vec<String> {
    TimespanKind::ALL.iter().map(|k| k.label(timestamp)).collect()
}
