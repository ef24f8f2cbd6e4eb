//! Geographic bounding box operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in WGS84 degrees.
///
/// A box with `min_lon > max_lon` is interpreted as crossing the
/// antimeridian (e.g. a Pacific-centric view from 170° to -170°).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Width in degrees of longitude. Accounts for antimeridian crossing.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            (180.0 - self.min_lon) + (self.max_lon + 180.0)
        } else {
            self.max_lon - self.min_lon
        }
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Whether this box wraps across the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Check if this bbox intersects another (closed bounds: touching
    /// edges count as intersecting). Neither box may cross the antimeridian.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
            && self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
    }

    /// Check if a point is contained within this bbox (closed bounds).
    pub fn contains_point(&self, lon: f64, lat: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        if self.crosses_antimeridian() {
            lon >= self.min_lon || lon <= self.max_lon
        } else {
            lon >= self.min_lon && lon <= self.max_lon
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_intersects_touching_edge() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_antimeridian_contains() {
        let pacific = BoundingBox::new(170.0, -10.0, -170.0, 10.0);
        assert!(pacific.crosses_antimeridian());
        assert!(pacific.contains_point(175.0, 0.0));
        assert!(pacific.contains_point(-175.0, 0.0));
        assert!(!pacific.contains_point(0.0, 0.0));
        assert!((pacific.width() - 20.0).abs() < 1e-9);
    }
}
