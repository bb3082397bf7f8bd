//! Web-Mercator tile geometry
//!
//! Tiles are addressed by `"{zoom}_{row}_{column}"` ids. Parent and child
//! lookups re-geocode points inside the tile instead of walking a quad-tree,
//! so near tile edges they can disagree with strict containment. Rollup
//! bucketing depends on exactly this behavior.

use crate::error::GeometryError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

pub const MAX_ZOOM: u8 = 16;
pub const MIN_ZOOM: u8 = 0;

/// Lightweight decoded tile id without bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub row: u32,
    pub column: u32,
}

impl TileCoord {
    /// Decode a tile id into its three integer parts
    pub fn decode(tile_id: &str) -> Option<Self> {
        let parts: Vec<&str> = tile_id.split('_').collect();
        if parts.len() != 3 {
            return None;
        }

        let zoom: u8 = parts[0].parse().ok()?;
        let row: u32 = parts[1].parse().ok()?;
        let column: u32 = parts[2].parse().ok()?;

        let extent = grid_extent(zoom)?;
        if u64::from(row) >= extent || u64::from(column) >= extent {
            return None;
        }

        Some(Self { zoom, row, column })
    }

    pub fn id(&self) -> String {
        tile_id_from_row_column(self.row, self.column, self.zoom)
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.zoom, self.row, self.column)
    }
}

/// A tile with its geographic bounds, in decimal degrees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub id: String,
    pub zoom: u8,
    pub row: u32,
    pub column: u32,
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
    pub center_latitude: f64,
    pub center_longitude: f64,
}

impl Tile {
    /// Reconstruct a tile from its id. `None` if the id is not three
    /// `_`-separated integers inside the grid.
    pub fn from_id(tile_id: &str) -> Option<Self> {
        TileCoord::decode(tile_id).map(Self::from_coord)
    }

    /// Tile containing the given point
    pub fn from_lat_long(latitude: f64, longitude: f64, zoom: u8) -> Result<Self, GeometryError> {
        let id = tile_id_from_lat_long(latitude, longitude, zoom)?;
        Tile::from_id(&id).ok_or(GeometryError::InvalidTileId(id))
    }

    pub fn from_coord(coord: TileCoord) -> Self {
        let TileCoord { zoom, row, column } = coord;

        let north = latitude_from_row(f64::from(row), zoom);
        let south = latitude_from_row(f64::from(row) + 1.0, zoom);
        let west = longitude_from_column(f64::from(column), zoom);
        let east = longitude_from_column(f64::from(column) + 1.0, zoom);

        Self {
            id: coord.id(),
            zoom,
            row,
            column,
            north,
            south,
            east,
            west,
            center_latitude: (north + south) / 2.0,
            center_longitude: (east + west) / 2.0,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_latitude, self.center_longitude)
    }

    /// Id of the tile containing this tile's center one zoom level up
    pub fn parent_id(&self) -> Result<String, GeometryError> {
        let zoom = self
            .zoom
            .checked_sub(1)
            .ok_or(GeometryError::ZoomOutOfRange(-1))?;
        tile_id_from_lat_long(self.center_latitude, self.center_longitude, zoom)
    }

    pub fn parent(&self) -> Result<Tile, GeometryError> {
        let id = self.parent_id()?;
        Tile::from_id(&id).ok_or(GeometryError::InvalidTileId(id))
    }

    /// Ids of the four tiles one zoom level down, found by re-geocoding the
    /// quadrant midpoints. Order: NE, NW, SE, SW.
    pub fn children(&self) -> Result<[String; 4], GeometryError> {
        let zoom = self.zoom + 1;
        let mid_north = (self.center_latitude + self.north) / 2.0;
        let mid_south = (self.center_latitude + self.south) / 2.0;
        let mid_east = (self.center_longitude + self.east) / 2.0;
        let mid_west = (self.center_longitude + self.west) / 2.0;

        Ok([
            tile_id_from_lat_long(mid_north, mid_east, zoom)?,
            tile_id_from_lat_long(mid_north, mid_west, zoom)?,
            tile_id_from_lat_long(mid_south, mid_east, zoom)?,
            tile_id_from_lat_long(mid_south, mid_west, zoom)?,
        ])
    }

    /// Re-geocode the center at every zoom level from `MAX_ZOOM` down to 1
    pub fn ids_for_all_zoom_levels(&self) -> Result<Vec<String>, GeometryError> {
        (MIN_ZOOM + 1..=MAX_ZOOM)
            .rev()
            .map(|zoom| tile_id_from_lat_long(self.center_latitude, self.center_longitude, zoom))
            .collect()
    }
}

pub fn tile_id_from_row_column(row: u32, column: u32, zoom: u8) -> String {
    format!("{}_{}_{}", zoom, row, column)
}

/// Geocode a point to the id of its tile at `zoom`
pub fn tile_id_from_lat_long(latitude: f64, longitude: f64, zoom: u8) -> Result<String, GeometryError> {
    let extent = grid_extent(zoom).ok_or(GeometryError::ZoomOutOfRange(i32::from(zoom)))?;
    let row = row_from_latitude(latitude, zoom)?;
    let column = column_from_longitude(longitude, zoom)?;

    let in_grid = |v: f64| v >= 0.0 && v < extent as f64;
    if !in_grid(row) || !in_grid(column) {
        return Err(GeometryError::OutOfDomain {
            latitude,
            longitude,
            zoom,
        });
    }

    Ok(tile_id_from_row_column(row as u32, column as u32, zoom))
}

pub fn row_from_latitude(latitude: f64, zoom: u8) -> Result<f64, GeometryError> {
    if !latitude.is_finite() || latitude.abs() >= 90.0 {
        return Err(GeometryError::OutOfDomain {
            latitude,
            longitude: f64::NAN,
            zoom,
        });
    }

    let radians = latitude * PI / 180.0;
    let mercator = radians.tan() + 1.0 / radians.cos();
    if mercator <= 0.0 {
        return Err(GeometryError::OutOfDomain {
            latitude,
            longitude: f64::NAN,
            zoom,
        });
    }

    Ok(((1.0 - mercator.ln() / PI) / 2.0 * scale(zoom)).floor())
}

pub fn column_from_longitude(longitude: f64, zoom: u8) -> Result<f64, GeometryError> {
    if !longitude.is_finite() {
        return Err(GeometryError::OutOfDomain {
            latitude: f64::NAN,
            longitude,
            zoom,
        });
    }
    Ok(((longitude + 180.0) / 360.0 * scale(zoom)).floor())
}

pub fn latitude_from_row(row: f64, zoom: u8) -> f64 {
    let n = PI - 2.0 * PI * row / scale(zoom);
    180.0 / PI * (0.5 * (n.exp() - (-n).exp())).atan()
}

pub fn longitude_from_column(column: f64, zoom: u8) -> f64 {
    column / scale(zoom) * 360.0 - 180.0
}

fn scale(zoom: u8) -> f64 {
    2f64.powi(i32::from(zoom))
}

// Rows and columns are u32, which bounds the usable zoom
fn grid_extent(zoom: u8) -> Option<u64> {
    if zoom > 31 {
        return None;
    }
    Some(1u64 << zoom)
}
