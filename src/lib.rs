//! # strata
//!
//! Layer composition, gating, and hit-testing core for 2D map engines.
//!
//! A map is a tree of heterogeneous layers (feature leaves, plain sets, and
//! behaviour-driven composites such as tiled layers) queried against a view.
//! Every operation gates each layer on its enabled flag and scale range
//! before touching it, and feature enumeration is lazy across the tree.
//!
//! ## Core Systems
//!
//! - **[`layer`]**: Slotmap-backed layer tree, gating, hit testing, tiles
//! - **[`query`]**: `FeatureQuery`, scale ranges, CRS, lazy enumerators
//! - **[`feature`]**: Features, geometry with cached bounds, rasters
//! - **[`event`]**: Input events, weak-subscriber dispatch, key bindings
//! - **[`tool`]**: Navigation tools as event handlers
//! - **[`camera`]**: Camera math, status flags, controllers
//! - **[`animation`]**: Easing and looping feature animations
//! - **[`map`]**: `MapControl` tying everything together
//! - **[`testing`]**: Headless `MapPilot`
//! - **[`geometry`]**: Point, Size, Rectangle primitives

// Foundation
pub mod geometry;

// Data model
pub mod feature;
pub mod query;
pub mod layer;

// Interaction
pub mod event;
pub mod tool;
pub mod camera;
pub mod animation;

// Map
pub mod map;
pub mod testing;

pub use map::{FrameStatus, MapConfig, MapControl};
