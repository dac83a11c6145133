//! Features: identified shapes with string properties.

pub mod geometry;
pub mod raster;

use std::collections::HashMap;

use slotmap::new_key_type;

use crate::geometry::Point;
use crate::layer::LayerId;

pub use geometry::{
    Geometry, LineGeometry, MultiPolygonGeometry, PolygonGeometry, RasterGeometry,
};
pub use raster::{Raster, RasterCodec, RasterError};

new_key_type! {
    /// Identifier of a feature within its owning layer.
    pub struct FeatureId;
}

/// Addresses a feature anywhere in a layer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureKey {
    pub layer: LayerId,
    pub feature: FeatureId,
}

impl FeatureKey {
    pub fn new(layer: LayerId, feature: FeatureId) -> Self {
        Self { layer, feature }
    }
}

/// A shape plus arbitrary string properties.
///
/// The `id` is assigned by the layer that takes ownership of the feature;
/// a freshly constructed feature carries the null key.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub properties: HashMap<String, String>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            id: FeatureId::default(),
            geometry,
            properties: HashMap::new(),
        }
    }

    /// Add a property (builder).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// The anchor point of the geometry.
    pub fn position(&self) -> Point {
        self.geometry.anchor()
    }

    /// Move the feature so its anchor sits at `position`.
    ///
    /// Points are replaced outright; other shapes are translated as a whole.
    pub fn set_position(&mut self, position: Point) {
        match &mut self.geometry {
            Geometry::Point(p) => *p = position,
            other => {
                let delta = position - other.anchor();
                other.translate(delta);
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
