//! Minimal GeoJSON feature model for point tiles.
//!
//! Only the subset the tile pipeline produces is modelled: a
//! FeatureCollection of Point features with flat property maps.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// An empty collection. Used both for empty tiles and for degraded
    /// (missing or malformed) tiles on the client side.
    pub fn empty() -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features: Vec::new(),
        }
    }

    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            collection_type: "FeatureCollection".to_string(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A GeoJSON Feature with Point geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub feature_type: String,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Build a Point feature. GeoJSON coordinate order is [lon, lat].
    pub fn point(lon: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self {
            feature_type: "Feature".to_string(),
            geometry: Geometry {
                geometry_type: "Point".to_string(),
                coordinates: [lon, lat],
            },
            properties,
        }
    }

    pub fn lon(&self) -> f64 {
        self.geometry.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.geometry.coordinates[1]
    }
}

/// Point geometry, coordinates as [lon, lat].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub geometry_type: String,
    pub coordinates: [f64; 2],
}
