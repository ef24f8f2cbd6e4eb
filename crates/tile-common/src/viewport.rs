//! Viewport-to-tile resolution.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::error::{TileError, TileResult};
use crate::tile::{TileCoord, MAX_ZOOM, MERCATOR_LAT_LIMIT};

/// The currently visible map region: a bounding box plus an integer zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub zoom: u32,
}

impl Viewport {
    pub fn new(bbox: BoundingBox, zoom: u32) -> TileResult<Self> {
        if zoom > MAX_ZOOM {
            return Err(TileError::InvalidZoom {
                zoom,
                max: MAX_ZOOM,
            });
        }
        Ok(Self { bbox, zoom })
    }

    /// Viewport from a centre point and a lon/lat span in degrees.
    pub fn centered(lon: f64, lat: f64, zoom: u32, lon_span: f64, lat_span: f64) -> TileResult<Self> {
        let mut min_lon = lon - lon_span / 2.0;
        let mut max_lon = lon + lon_span / 2.0;
        // Re-wrap into [-180, 180]; a span crossing the antimeridian comes
        // out as min_lon > max_lon, which BoundingBox interprets as a wrap.
        if min_lon < -180.0 {
            min_lon += 360.0;
        }
        if max_lon > 180.0 {
            max_lon -= 360.0;
        }
        let min_lat = (lat - lat_span / 2.0).max(-90.0);
        let max_lat = (lat + lat_span / 2.0).min(90.0);
        Self::new(BoundingBox::new(min_lon, min_lat, max_lon, max_lat), zoom)
    }

    /// The minimal set of tiles at `self.zoom` whose bounds intersect the
    /// viewport.
    ///
    /// Tile bounds are treated as closed, so a viewport edge lying exactly
    /// on a tile boundary includes the adjoining tile. A viewport crossing
    /// the antimeridian wraps its columns modulo 2^z; rows are clamped to
    /// the grid.
    pub fn tile_coverage(&self) -> BTreeSet<TileCoord> {
        let n = 1u64 << self.zoom;
        let nf = n as f64;

        // Continuous column coordinates. A crossing viewport is unwrapped
        // past 180° so the range stays monotonic; columns wrap below.
        let x_min = (self.bbox.min_lon + 180.0) / 360.0 * nf;
        let x_max = if self.bbox.crosses_antimeridian() {
            (self.bbox.max_lon + 360.0 + 180.0) / 360.0 * nf
        } else {
            (self.bbox.max_lon + 180.0) / 360.0 * nf
        };

        // Continuous row coordinates; north edge maps to the smaller row.
        let y_min = row_coordinate(self.bbox.max_lat, nf);
        let y_max = row_coordinate(self.bbox.min_lat, nf);

        let (col_lo, col_hi) = covered_range(x_min, x_max);
        let (row_lo, row_hi) = covered_range(y_min, y_max);

        let row_lo = row_lo.clamp(0, n as i64 - 1);
        let row_hi = row_hi.clamp(0, n as i64 - 1);

        let mut tiles = BTreeSet::new();
        for col in col_lo..=col_hi {
            let x = col.rem_euclid(n as i64) as u32;
            for row in row_lo..=row_hi {
                tiles.insert(TileCoord::new(self.zoom, x, row as u32));
            }
        }
        tiles
    }
}

/// Continuous Web Mercator row coordinate for a latitude.
fn row_coordinate(lat: f64, n: f64) -> f64 {
    let lat = lat.clamp(-MERCATOR_LAT_LIMIT, MERCATOR_LAT_LIMIT);
    let lat_rad = lat.to_radians();
    (1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * n
}

/// Indices of tiles `[k, k+1]` (closed) touched by the closed interval
/// `[a, b]` in continuous tile coordinates.
fn covered_range(a: f64, b: f64) -> (i64, i64) {
    let lo = a.ceil() as i64 - 1;
    let hi = b.floor() as i64;
    (lo, hi.max(lo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_tile_viewport() {
        // Interior of tile 10/536/358 (around Zurich)
        let vp = Viewport::new(BoundingBox::new(8.45, 47.30, 8.75, 47.40), 10).unwrap();
        let tiles = vp.tile_coverage();
        assert_eq!(tiles.len(), 1);
        assert!(tiles.contains(&TileCoord::new(10, 536, 358)));
    }

    #[test]
    fn test_coverage_matches_bbox_intersection() {
        let vp = Viewport::new(BoundingBox::new(-10.0, 40.0, 15.0, 55.0), 6).unwrap();
        let tiles = vp.tile_coverage();
        assert!(!tiles.is_empty());
        for coord in &tiles {
            let bounds = crate::tile::tile_bounds(coord);
            assert!(
                bounds.intersects(&vp.bbox),
                "tile {} does not intersect viewport",
                coord
            );
        }
    }

    #[test]
    fn test_exact_boundary_includes_adjoining_tile() {
        // At zoom 2 each column spans 90°. A viewport whose west edge sits
        // exactly on lon = 0 (column boundary 2) includes column 1 as well.
        let vp = Viewport::new(BoundingBox::new(0.0, 10.0, 10.0, 20.0), 2).unwrap();
        let tiles = vp.tile_coverage();
        let cols: BTreeSet<u32> = tiles.iter().map(|t| t.x).collect();
        assert!(cols.contains(&1));
        assert!(cols.contains(&2));
    }

    #[test]
    fn test_antimeridian_wrap() {
        // 170°E to 170°W at zoom 3: columns wrap 7 -> 0
        let vp = Viewport::new(BoundingBox::new(170.0, -10.0, -170.0, 10.0), 3).unwrap();
        let tiles = vp.tile_coverage();
        let cols: BTreeSet<u32> = tiles.iter().map(|t| t.x).collect();
        assert!(cols.contains(&7));
        assert!(cols.contains(&0));
        assert!(!cols.contains(&3));
    }

    #[test]
    fn test_west_edge_at_dateline_wraps() {
        // West edge exactly at -180 wraps to the last column
        let vp = Viewport::new(BoundingBox::new(-180.0, 0.0, -170.0, 10.0), 3).unwrap();
        let tiles = vp.tile_coverage();
        let cols: BTreeSet<u32> = tiles.iter().map(|t| t.x).collect();
        assert!(cols.contains(&0));
        assert!(cols.contains(&7));
    }

    #[test]
    fn test_polar_viewport_clamps_rows() {
        let vp = Viewport::new(BoundingBox::new(-10.0, 84.0, 10.0, 89.9), 3).unwrap();
        let tiles = vp.tile_coverage();
        assert!(tiles.iter().all(|t| t.y < 8));
        assert!(tiles.iter().any(|t| t.y == 0));
    }

    #[test]
    fn test_zoom_out_of_range_rejected() {
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert!(Viewport::new(bbox, 23).is_err());
        assert!(Viewport::new(bbox, MAX_ZOOM).is_ok());
    }

    #[test]
    fn test_centered_viewport() {
        let vp = Viewport::centered(8.5417, 47.3769, 10, 0.5, 0.3).unwrap();
        assert!(vp.bbox.contains_point(8.5417, 47.3769));
        assert!(vp.tile_coverage().contains(&TileCoord::new(10, 536, 358)));
    }

    #[test]
    fn test_centered_viewport_wraps() {
        let vp = Viewport::centered(179.5, 0.0, 4, 2.0, 2.0).unwrap();
        assert!(vp.bbox.crosses_antimeridian());
        let cols: BTreeSet<u32> = vp.tile_coverage().iter().map(|t| t.x).collect();
        assert!(cols.contains(&15));
        assert!(cols.contains(&0));
    }
}
