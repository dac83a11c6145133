//! Leaf layers: the `Layer` capability and the feature-owning leaf.

use slotmap::SlotMap;

use super::node::{AsAny, LayerId};
use super::spatial::SpatialIndex;
use crate::camera::Camera;
use crate::feature::{Feature, FeatureId, FeatureKey};
use crate::geometry::Rectangle;
use crate::query::{Crs, FeatureEnumerator, FeatureQuery};

// ---------------------------------------------------------------------------
// View and hit-test context
// ---------------------------------------------------------------------------

/// Per-frame view state pushed into layers on update and hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub camera: Camera,
    pub crs: Crs,
    /// Whether the view is currently moving.
    pub quick_update: bool,
}

impl MapView {
    pub fn new(camera: Camera, crs: Crs) -> Self {
        Self {
            camera,
            crs,
            quick_update: false,
        }
    }

    /// The query describing this view.
    pub fn query(&self) -> FeatureQuery {
        self.camera.query(self.quick_update)
    }
}

/// Everything a leaf needs to answer a hit test.
#[derive(Debug, Clone, Copy)]
pub struct HitTestContext<'v> {
    /// The id of the layer being asked.
    pub layer: LayerId,
    pub view: &'v MapView,
    /// World-space region to test against.
    pub bounds: Rectangle,
}

/// A hit-test result: one matched feature in one layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PresentationObject {
    pub layer: LayerId,
    pub feature: FeatureId,
    /// World bounds of the matched feature.
    pub bounds: Rectangle,
}

impl PresentationObject {
    pub fn key(&self) -> FeatureKey {
        FeatureKey::new(self.layer, self.feature)
    }
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// The capability a leaf layer provides to the tree.
///
/// The tree gates every call; implementations never check their own settings.
pub trait Layer: AsAny {
    /// Warm caches ahead of a query. Only called while active.
    fn prepare(&mut self, _crs: Crs, _query: &FeatureQuery) {}

    /// Refresh per-frame derived state. Only called while enabled.
    fn update(&mut self, _view: &MapView) {}

    /// Append matches for `ctx.bounds` to `out`.
    fn hit_test(&self, _ctx: &HitTestContext<'_>, _out: &mut Vec<PresentationObject>) {}

    /// Lazily enumerate the features relevant to `query`.
    fn features<'a>(&'a self, crs: Crs, query: &FeatureQuery) -> FeatureEnumerator<'a>;

    fn feature(&self, _id: FeatureId) -> Option<&Feature> {
        None
    }

    fn feature_mut(&mut self, _id: FeatureId) -> Option<&mut Feature> {
        None
    }
}

// ---------------------------------------------------------------------------
// FeatureLayer
// ---------------------------------------------------------------------------

/// A leaf that owns features and indexes their bounds.
///
/// The index is rebuilt on `update` after any mutation. Until then queries
/// fall back to a linear scan so results are never stale.
#[derive(Debug)]
pub struct FeatureLayer {
    features: SlotMap<FeatureId, Feature>,
    order: Vec<FeatureId>,
    index: SpatialIndex,
    dirty: bool,
}

impl FeatureLayer {
    pub fn new() -> Self {
        Self {
            features: SlotMap::with_key(),
            order: Vec::new(),
            index: SpatialIndex::new(),
            dirty: false,
        }
    }

    /// Build a layer holding `features`, in order.
    pub fn from_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let mut layer = Self::new();
        for feature in features {
            layer.insert(feature);
        }
        layer
    }

    /// Take ownership of `feature`, assigning its id.
    ///
    /// A clean index takes the new bounds directly, on top of everything else.
    pub fn insert(&mut self, feature: Feature) -> FeatureId {
        let bounds = feature.geometry.bounding_rectangle();
        let id = self.features.insert_with_key(|id| Feature { id, ..feature });
        self.order.push(id);
        if !self.dirty {
            self.index.push(id, bounds);
        }
        id
    }

    pub fn remove(&mut self, id: FeatureId) -> Option<Feature> {
        let removed = self.features.remove(id)?;
        self.order.retain(|&f| f != id);
        self.dirty = true;
        Some(removed)
    }

    pub fn get(&self, id: FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    /// Mutable access. Marks the index dirty since the geometry may change.
    pub fn get_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        let feature = self.features.get_mut(id)?;
        self.dirty = true;
        Some(feature)
    }

    /// Features in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.order.iter().filter_map(|&id| self.features.get(id))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Whether the spatial index is waiting for the next `update`.
    pub fn is_index_dirty(&self) -> bool {
        self.dirty
    }

    fn rebuild_index(&mut self) {
        let features = &self.features;
        self.index.rebuild(
            self.order
                .iter()
                .filter_map(|&id| features.get(id).map(|f| (id, f.geometry.bounding_rectangle()))),
        );
        self.dirty = false;
    }

    /// Features touching `region`, in insertion order.
    ///
    /// Nothing is looked up until the first item is pulled.
    fn matching<'a>(&'a self, region: Rectangle) -> impl Iterator<Item = &'a Feature> + 'a {
        let candidates: Box<dyn Iterator<Item = FeatureId> + 'a> = if self.dirty {
            Box::new(self.order.iter().copied())
        } else {
            Box::new(std::iter::once(region).flat_map(move |r| self.index.query_region(&r)))
        };
        candidates
            .filter_map(move |id| self.features.get(id))
            .filter(move |f| f.geometry.intersects_rect(&region))
    }
}

impl Default for FeatureLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer for FeatureLayer {
    fn update(&mut self, _view: &MapView) {
        if self.dirty {
            self.rebuild_index();
        }
    }

    fn hit_test(&self, ctx: &HitTestContext<'_>, out: &mut Vec<PresentationObject>) {
        out.extend(self.matching(ctx.bounds).map(|feature| PresentationObject {
            layer: ctx.layer,
            feature: feature.id,
            bounds: feature.geometry.bounding_rectangle(),
        }));
    }

    fn features<'a>(&'a self, _crs: Crs, query: &FeatureQuery) -> FeatureEnumerator<'a> {
        FeatureEnumerator::new(self.matching(query.bounds))
    }

    fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.get(id)
    }

    fn feature_mut(&mut self, id: FeatureId) -> Option<&mut Feature> {
        self.get_mut(id)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
