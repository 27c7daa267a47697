//! Top-level engine configuration
//!
//! Options are plain serde structs so hosts can ship them as JSON alongside
//! their own settings.

use crate::Result;
use serde::{Deserialize, Serialize};

/// Options for constructing a [`crate::Map`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    /// Edge length of one tile in pixels
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Background color showing through where no tile renders, RGB in [0,1]
    pub background: [f32; 3],
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            min_zoom: 0,
            max_zoom: 18,
            background: [1.0, 1.0, 1.0],
        }
    }
}

impl MapOptions {
    /// Parses options from a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
