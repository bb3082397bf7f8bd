//! Tile geometry, timespans, input records and run configuration

mod config;
mod error;
mod record;
pub mod tile;
mod timespan;

pub use config::{Config, Containers};
pub use error::{GeometryError, RecordError};
pub use record::{parse_timestamp, EnrichedRecord, Location, LocationShape, Record, REQUIRED_FIELDS};
pub use tile::{tile_id_from_lat_long, Tile, TileCoord};
pub use timespan::{timespan_labels, TimespanKind};
