use anyhow::Context;
use tilecast_core::{tile_id_from_lat_long, Tile};

pub fn run_id(latitude: f64, longitude: f64, zoom: u8) -> anyhow::Result<()> {
    let id = tile_id_from_lat_long(latitude, longitude, zoom)?;
    println!("{}", id);
    Ok(())
}

pub fn run_info(id: &str) -> anyhow::Result<()> {
    let info = tile_info(id)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Bounds and neighbours of a tile; zoom 0 has no parent
fn tile_info(id: &str) -> anyhow::Result<serde_json::Value> {
    let tile = Tile::from_id(id).with_context(|| format!("invalid tile id '{}'", id))?;

    let mut info = serde_json::to_value(&tile)?;
    info["parent"] = match tile.parent_id() {
        Ok(parent) => serde_json::Value::from(parent),
        Err(_) => serde_json::Value::Null,
    };
    info["children"] = match tile.children() {
        Ok(children) => serde_json::json!(children),
        Err(_) => serde_json::Value::Null,
    };
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_info() {
        let info = tile_info("15_10896_16372").unwrap();
        assert_eq!(info["zoom"], 15);
        assert_eq!(info["parent"], "14_5448_8186");
        assert_eq!(info["children"].as_array().unwrap().len(), 4);
        assert!(info["north"].as_f64().unwrap() > info["south"].as_f64().unwrap());
    }

    #[test]
    fn test_root_tile_has_no_parent() {
        let info = tile_info("0_0_0").unwrap();
        assert!(info["parent"].is_null());
    }

    #[test]
    fn test_invalid_ids() {
        assert!(tile_info("15_x_1").is_err());
        assert!(tile_info("1_2_0").is_err());
        assert!(run_id(90.0, 0.0, 15).is_err());
        assert!(run_id(51.5074, -0.1278, 15).is_ok());
    }
}
