//! The layer tree: leaves, composites, and tiled composites.
//!
//! Layers live in a slotmap arena owned by [`LayerTree`]. A composite owns its
//! children's ids exclusively; removing a composite removes its subtree.
//! Specialised composites (tiling) plug in a [`CompositeBehavior`] instead of
//! overriding traversal.

pub mod composite;
pub mod leaf;
pub mod node;
pub mod spatial;
pub mod tile;
pub mod tree;
pub mod worker;

pub use composite::{Children, CompositeBehavior};
pub use leaf::{FeatureLayer, HitTestContext, Layer, MapView, PresentationObject};
pub use node::{AsAny, Drawable, LayerId, LayerKind, LayerNode, LayerSettings};
pub use spatial::{IndexedFeature, SpatialIndex};
pub use tile::{TileCoord, TileError, TileLayer, TileScheme, TileSource, TileState};
pub use tree::LayerTree;
pub use worker::{TileCompletion, TileWorker};

/// Errors from layer tree construction and mutation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayerError {
    #[error("no layer with id {0:?}")]
    UnknownLayer(LayerId),
    #[error("layer {0:?} is a leaf and cannot own children")]
    NotComposite(LayerId),
    #[error("invalid scale range: min {min} must not exceed max {max}")]
    InvalidScaleRange { min: f64, max: f64 },
    #[error("layer {child:?} is not a child of {parent:?}")]
    NotAChild { parent: LayerId, child: LayerId },
    #[error("the root layer cannot be removed")]
    RootRemoval,
}
