//! Spatial index over feature bounds.
//!
//! [`SpatialIndex`] keeps feature bounds in an R-tree. Every entry carries
//! the sequence number it was inserted with, and region queries come back
//! sorted by it, so results follow insertion (paint) order no matter how the
//! tree arranged them.

use rstar::{RTree, RTreeObject, AABB};

use crate::feature::FeatureId;
use crate::geometry::Rectangle;

// ---------------------------------------------------------------------------
// IndexedFeature
// ---------------------------------------------------------------------------

/// One R-tree entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedFeature {
    pub id: FeatureId,
    /// Insertion sequence; lower is further back.
    pub seq: u64,
    pub bounds: Rectangle,
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min.x, self.bounds.min.y],
            [self.bounds.max.x, self.bounds.max.y],
        )
    }
}

fn is_finite(bounds: &Rectangle) -> bool {
    bounds.min.x.is_finite() && bounds.min.y.is_finite() && bounds.max.x.is_finite() && bounds.max.y.is_finite()
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// Feature bounds in an R-tree, queried in insertion order.
///
/// Bounds with a NaN or infinite coordinate cannot be placed in the tree.
/// They are kept aside and checked linearly on every query.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedFeature>,
    unbounded: Vec<IndexedFeature>,
    next_seq: u64,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            unbounded: Vec::new(),
            next_seq: 0,
        }
    }

    /// Replace every entry. The iteration order becomes paint order.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = (FeatureId, Rectangle)>) {
        self.unbounded.clear();
        self.next_seq = 0;
        let mut indexed = Vec::new();
        for (id, bounds) in entries {
            let entry = IndexedFeature {
                id,
                seq: self.next_seq,
                bounds,
            };
            self.next_seq += 1;
            if is_finite(&bounds) {
                indexed.push(entry);
            } else {
                self.unbounded.push(entry);
            }
        }
        self.tree = RTree::bulk_load(indexed);
    }

    /// Add one entry on top of the existing ones.
    pub fn push(&mut self, id: FeatureId, bounds: Rectangle) {
        let entry = IndexedFeature {
            id,
            seq: self.next_seq,
            bounds,
        };
        self.next_seq += 1;
        if is_finite(&bounds) {
            self.tree.insert(entry);
        } else {
            self.unbounded.push(entry);
        }
    }

    /// Ids whose bounds overlap `region`, in insertion order.
    pub fn query_region(&self, region: &Rectangle) -> Vec<FeatureId> {
        let envelope = AABB::from_corners([region.min.x, region.min.y], [region.max.x, region.max.y]);
        let mut hits: Vec<&IndexedFeature> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .chain(self.unbounded.iter().filter(|e| e.bounds.intersects(region)))
            .collect();
        hits.sort_unstable_by_key(|e| e.seq);
        hits.into_iter().map(|e| e.id).collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size() + self.unbounded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
