//! Query context and layer gating.
//!
//! A [`FeatureQuery`] is built once per operation and passed by reference down
//! the layer tree. [`is_active_for_query`] is the single gate every tree
//! operation consults before touching a layer or its subtree.

pub mod crs;
pub mod enumerator;

pub use crs::Crs;
pub use enumerator::{CompositeEnumerator, FeatureEnumerator};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Rectangle;
use crate::layer::{LayerError, LayerSettings};

// ---------------------------------------------------------------------------
// FeatureQuery
// ---------------------------------------------------------------------------

/// The view context a layer operation runs against.
///
/// `scale` is world units per screen pixel; larger values are further out.
/// `quick_update` is set while the view is moving and expensive layers may
/// opt out.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureQuery {
    pub scale: f64,
    pub bounds: Rectangle,
    pub quick_update: bool,
}

impl FeatureQuery {
    pub fn new(scale: f64, bounds: Rectangle) -> Self {
        Self {
            scale,
            bounds,
            quick_update: false,
        }
    }

    /// Mark the query as issued during a quick update (builder).
    pub fn quick(mut self, quick_update: bool) -> Self {
        self.quick_update = quick_update;
        self
    }
}

// ---------------------------------------------------------------------------
// ScaleRange
// ---------------------------------------------------------------------------

/// Closed interval of scales at which a layer is active.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRange {
    min: f64,
    max: f64,
}

impl ScaleRange {
    /// Every non-negative scale.
    pub const FULL: ScaleRange = ScaleRange {
        min: 0.0,
        max: f64::INFINITY,
    };

    /// Create a range, rejecting `min > max` and NaN bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, LayerError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(LayerError::InvalidScaleRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Whether `scale` lies within the range, inclusive. NaN is never inside.
    #[inline]
    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min && scale <= self.max
    }
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self::FULL
    }
}

// ---------------------------------------------------------------------------
// Gating
// ---------------------------------------------------------------------------

/// Whether a layer with `settings` takes part in `query`.
///
/// False when the layer is disabled, when the scale falls outside its range,
/// or when the query is a quick update the layer opted out of.
pub fn is_active_for_query(settings: &LayerSettings, query: &FeatureQuery) -> bool {
    settings.enabled
        && settings.scale_range.contains(query.scale)
        && (!query.quick_update || settings.enabled_during_quick_updates)
}

// ===========================================================================
// Tests
// ===========================================================================
