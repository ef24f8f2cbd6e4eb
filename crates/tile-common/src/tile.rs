//! Slippy-map tile coordinates and the Web Mercator point-to-tile mapping.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// Highest zoom level the tile pyramid supports.
pub const MAX_ZOOM: u32 = 22;

/// Web Mercator latitude limit. Latitudes beyond this clamp to the edge row.
pub const MERCATOR_LAT_LIMIT: f64 = 85.051_128_78;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Convert lon/lat to the containing Web Mercator tile at a zoom level.
///
/// Longitude is mapped linearly; latitude goes through the Mercator
/// projection (`asinh(tan(lat))`). Latitude is clamped to the Mercator
/// limit so polar records land in the edge rows instead of outside the
/// grid. A pure function of `(lon, lat, z)`.
pub fn tile_for_lonlat(lon: f64, lat: f64, zoom: u32) -> TileCoord {
    let n = (1u32 << zoom) as f64;

    let lat = lat.clamp(-MERCATOR_LAT_LIMIT, MERCATOR_LAT_LIMIT);
    let x = ((lon + 180.0) / 360.0 * n).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n).floor();

    // lon = 180 and lat = -limit land exactly on the far grid edge
    let max_index = (1u32 << zoom) - 1;
    TileCoord {
        z: zoom,
        x: (x as i64).clamp(0, max_index as i64) as u32,
        y: (y as i64).clamp(0, max_index as i64) as u32,
    }
}

/// Lat/lon bounds of a tile (inverse of [`tile_for_lonlat`]).
pub fn tile_bounds(coord: &TileCoord) -> BoundingBox {
    let n = (1u32 << coord.z) as f64;

    let lon_min = coord.x as f64 / n * 360.0 - 180.0;
    let lon_max = (coord.x + 1) as f64 / n * 360.0 - 180.0;

    let lat_max = (std::f64::consts::PI * (1.0 - 2.0 * coord.y as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    let lat_min = (std::f64::consts::PI * (1.0 - 2.0 * (coord.y + 1) as f64 / n))
        .sinh()
        .atan()
        .to_degrees();

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}
