//! Tiled composites.
//!
//! A [`TileLayer`] is a [`CompositeBehavior`]: on prepare it works out which
//! tiles the query needs, drops tiles that fell out of view and requests the
//! missing ones; on update it installs finished tiles as child
//! [`FeatureLayer`]s. Hit testing and enumeration are the plain composite
//! traversal over those children.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::composite::{Children, CompositeBehavior};
use super::leaf::{FeatureLayer, MapView};
use super::node::{LayerId, LayerNode, LayerSettings};
use super::worker::{TileCompletion, TileWorker};
use crate::feature::Feature;
use crate::geometry::{Point, Rectangle};
use crate::query::{is_active_for_query, Crs, FeatureQuery};

/// Highest zoom level a scheme accepts; keeps tile counts within `u32`.
pub const MAX_ZOOM: u8 = 30;

/// Default cap on tiles wanted by one prepare.
pub const DEFAULT_MAX_TILES: u64 = 1024;

/// Errors from tile fetching and the tile worker.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TileError {
    #[error("tile worker needs a running tokio runtime")]
    NoRuntime,
    #[error("tile worker has shut down")]
    WorkerClosed,
    #[error("failed to fetch tile {coord}: {message}")]
    Fetch { coord: TileCoord, message: String },
}

// ---------------------------------------------------------------------------
// TileCoord / TileScheme
// ---------------------------------------------------------------------------

/// Address of one tile. Row 0 sits at the world's minimum y.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// A quadtree pyramid of square tiles over a world rectangle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileScheme {
    pub world: Rectangle,
    /// Tile edge length in screen pixels.
    pub tile_size: u32,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Most tiles one prepare may want; larger views fall back to coarser
    /// zoom levels.
    pub max_tiles: u64,
}

impl TileScheme {
    pub fn new(world: Rectangle, tile_size: u32) -> Self {
        Self {
            world,
            tile_size: tile_size.max(1),
            min_zoom: 0,
            max_zoom: 18,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }

    /// Cap the tiles one prepare may want (builder). At least one.
    pub fn with_max_tiles(mut self, max_tiles: u64) -> Self {
        self.max_tiles = max_tiles.max(1);
        self
    }

    /// Restrict the zoom levels (builder). Bounds are ordered and capped.
    pub fn with_zoom_range(mut self, min: u8, max: u8) -> Self {
        let max = max.min(MAX_ZOOM);
        self.min_zoom = min.min(max);
        self.max_zoom = max;
        self
    }

    /// Number of tiles along each axis at `zoom`.
    pub fn tiles_per_axis(&self, zoom: u8) -> u32 {
        1u32 << zoom.min(MAX_ZOOM)
    }

    /// The scale at which tiles of `zoom` are shown one screen pixel per tile
    /// pixel.
    pub fn native_scale(&self, zoom: u8) -> f64 {
        self.world.width() / (f64::from(self.tile_size) * f64::from(self.tiles_per_axis(zoom)))
    }

    /// The coarsest zoom whose tiles are at least as detailed as `scale`.
    ///
    /// `None` for scales that are not positive (including NaN).
    pub fn zoom_for_scale(&self, scale: f64) -> Option<u8> {
        if scale.is_nan() || scale <= 0.0 {
            return None;
        }
        let ideal = (self.world.width() / (f64::from(self.tile_size) * scale)).log2();
        if ideal <= f64::from(self.min_zoom) {
            return Some(self.min_zoom);
        }
        if ideal >= f64::from(self.max_zoom) {
            return Some(self.max_zoom);
        }
        // Tolerance absorbs rounding at exact powers of two.
        Some((ideal - 1e-9).ceil() as u8)
    }

    /// World bounds of one tile.
    pub fn tile_bounds(&self, coord: TileCoord) -> Rectangle {
        let n = f64::from(self.tiles_per_axis(coord.zoom));
        let (tw, th) = (self.world.width() / n, self.world.height() / n);
        let min = self.world.min + Point::new(f64::from(coord.x) * tw, f64::from(coord.y) * th);
        Rectangle {
            min,
            max: min + Point::new(tw, th),
        }
    }

    /// Inclusive column and row ranges at `zoom` overlapping `bounds`.
    fn span(&self, bounds: &Rectangle, zoom: u8) -> Option<((u32, u32), (u32, u32))> {
        let area = bounds.intersection(&self.world)?;
        let n = self.tiles_per_axis(zoom);
        let (tw, th) = (self.world.width() / f64::from(n), self.world.height() / f64::from(n));
        if tw.is_nan() || th.is_nan() || tw <= 0.0 || th <= 0.0 {
            return None;
        }
        let axis = |lo: f64, hi: f64, origin: f64, step: f64| {
            let first = (((lo - origin) / step).floor() as i64).clamp(0, i64::from(n) - 1);
            let last = ((((hi - origin) / step).ceil() as i64) - 1).clamp(first, i64::from(n) - 1);
            (first as u32, last as u32)
        };
        Some((
            axis(area.min.x, area.max.x, self.world.min.x, tw),
            axis(area.min.y, area.max.y, self.world.min.y, th),
        ))
    }

    /// Number of tiles at `zoom` overlapping `bounds`.
    pub fn tile_count(&self, bounds: &Rectangle, zoom: u8) -> u64 {
        self.span(bounds, zoom).map_or(0, |((x0, x1), (y0, y1))| {
            (u64::from(x1 - x0) + 1) * (u64::from(y1 - y0) + 1)
        })
    }

    /// Tiles at `zoom` overlapping `bounds`, row by row.
    ///
    /// Produced on demand; check [`tile_count`](Self::tile_count) before
    /// collecting a large view.
    pub fn tiles_covering(&self, bounds: &Rectangle, zoom: u8) -> impl Iterator<Item = TileCoord> {
        self.span(bounds, zoom)
            .into_iter()
            .flat_map(move |((x0, x1), (y0, y1))| {
                (y0..=y1).flat_map(move |y| (x0..=x1).map(move |x| TileCoord::new(zoom, x, y)))
            })
    }

    /// The finest zoom at or below `zoom` whose cover of `bounds` fits
    /// `max_tiles`. `None` when even `min_zoom` needs too many.
    pub fn zoom_within_budget(&self, bounds: &Rectangle, zoom: u8) -> Option<u8> {
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        (self.min_zoom..=zoom)
            .rev()
            .find(|&z| self.tile_count(bounds, z) <= self.max_tiles)
    }
}

// ---------------------------------------------------------------------------
// TileSource
// ---------------------------------------------------------------------------

/// Produces the features of one tile. May block; the worker runs it off the
/// tree's thread.
pub trait TileSource: Send + Sync + 'static {
    fn fetch(&self, coord: TileCoord, bounds: Rectangle) -> Result<Vec<Feature>, TileError>;
}

impl<F> TileSource for F
where
    F: Fn(TileCoord, Rectangle) -> Result<Vec<Feature>, TileError> + Send + Sync + 'static,
{
    fn fetch(&self, coord: TileCoord, bounds: Rectangle) -> Result<Vec<Feature>, TileError> {
        self(coord, bounds)
    }
}

// ---------------------------------------------------------------------------
// TileLayer
// ---------------------------------------------------------------------------

/// Lifecycle of one wanted tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileState {
    /// Requested, not yet installed.
    Pending,
    /// Installed as the given child layer.
    Loaded(LayerId),
    /// The fetch failed; the tile is not retried while it stays wanted.
    Failed(String),
}

enum Loader {
    Inline(Arc<dyn TileSource>),
    Worker(TileWorker),
}

/// Tile selection, eviction, and installation for a composite layer.
pub struct TileLayer {
    scheme: TileScheme,
    loader: Loader,
    tiles: BTreeMap<TileCoord, TileState>,
    fetched: Vec<TileCompletion>,
}

impl TileLayer {
    /// Fetch tiles synchronously during prepare, installing them on update.
    pub fn new(scheme: TileScheme, source: impl TileSource) -> Self {
        Self::with_loader(scheme, Loader::Inline(Arc::new(source)))
    }

    /// Fetch tiles on a background [`TileWorker`].
    pub fn with_worker(scheme: TileScheme, worker: TileWorker) -> Self {
        Self::with_loader(scheme, Loader::Worker(worker))
    }

    fn with_loader(scheme: TileScheme, loader: Loader) -> Self {
        Self {
            scheme,
            loader,
            tiles: BTreeMap::new(),
            fetched: Vec::new(),
        }
    }

    pub fn scheme(&self) -> &TileScheme {
        &self.scheme
    }

    pub fn tile_state(&self, coord: TileCoord) -> Option<&TileState> {
        self.tiles.get(&coord)
    }

    /// Every tracked tile in coordinate order.
    pub fn tiles(&self) -> impl Iterator<Item = (TileCoord, &TileState)> + '_ {
        self.tiles.iter().map(|(c, s)| (*c, s))
    }

    pub fn loaded_count(&self) -> usize {
        self.tiles
            .values()
            .filter(|s| matches!(s, TileState::Loaded(_)))
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.tiles
            .values()
            .filter(|s| matches!(s, TileState::Pending))
            .count()
    }

    fn evict(&mut self, children: &mut Children<'_>, coord: TileCoord) {
        if let Some(TileState::Loaded(id)) = self.tiles.remove(&coord) {
            if let Err(err) = children.remove(id) {
                warn!(%coord, %err, "evicted tile layer was already gone");
            }
        }
        debug!(%coord, "tile evicted");
    }

    fn request(&mut self, coord: TileCoord) {
        let bounds = self.scheme.tile_bounds(coord);
        let state = match &self.loader {
            Loader::Inline(source) => {
                let result = source.fetch(coord, bounds);
                self.fetched.push(TileCompletion { coord, result });
                TileState::Pending
            }
            Loader::Worker(worker) => match worker.request(coord, bounds) {
                Ok(()) => TileState::Pending,
                Err(err) => {
                    warn!(%coord, %err, "tile request failed");
                    TileState::Failed(err.to_string())
                }
            },
        };
        debug!(%coord, "tile requested");
        self.tiles.insert(coord, state);
    }

    fn install(&mut self, children: &mut Children<'_>, completion: TileCompletion) {
        let TileCompletion { coord, result } = completion;
        if self.tiles.get(&coord) != Some(&TileState::Pending) {
            debug!(%coord, "discarding tile that is no longer wanted");
            return;
        }
        let state = match result {
            Ok(features) => {
                let count = features.len();
                let node = LayerNode::leaf(
                    LayerSettings::new(format!("tile {coord}")),
                    FeatureLayer::from_features(features),
                );
                match children.insert(node) {
                    Ok(id) => {
                        debug!(%coord, count, "tile installed");
                        TileState::Loaded(id)
                    }
                    Err(err) => TileState::Failed(err.to_string()),
                }
            }
            Err(err) => {
                warn!(%coord, %err, "tile fetch failed");
                TileState::Failed(err.to_string())
            }
        };
        self.tiles.insert(coord, state);
    }
}

impl CompositeBehavior for TileLayer {
    fn prepare(&mut self, children: &mut Children<'_>, _crs: Crs, query: &FeatureQuery) {
        let Some(ideal) = self.scheme.zoom_for_scale(query.scale) else {
            return;
        };
        let Some(zoom) = self.scheme.zoom_within_budget(&query.bounds, ideal) else {
            warn!(
                zoom = self.scheme.min_zoom,
                max_tiles = self.scheme.max_tiles,
                "view needs too many tiles even at the coarsest zoom"
            );
            return;
        };
        if zoom != ideal {
            debug!(ideal, zoom, "tile zoom lowered to fit the tile budget");
        }
        let wanted: BTreeSet<TileCoord> = self.scheme.tiles_covering(&query.bounds, zoom).collect();

        let stale: Vec<TileCoord> = self
            .tiles
            .keys()
            .filter(|c| !wanted.contains(c))
            .copied()
            .collect();
        for coord in stale {
            self.evict(children, coord);
        }

        for coord in wanted {
            if !self.tiles.contains_key(&coord) {
                self.request(coord);
            }
        }
    }

    /// Installs finished tiles, but only while the layer is active for the
    /// view. Out of range, completions wait until it comes back.
    fn update(&mut self, children: &mut Children<'_>, view: &MapView) {
        let query = view.query();
        if children.settings().is_some_and(|s| !is_active_for_query(s, &query)) {
            trace!(scale = query.scale, "tile update skipped inactive layer");
            return;
        }
        let mut done = std::mem::take(&mut self.fetched);
        if let Loader::Worker(worker) = &mut self.loader {
            while let Some(completion) = worker.try_completed() {
                done.push(completion);
            }
        }
        for completion in done {
            self.install(children, completion);
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::camera::Camera;
    use crate::feature::Geometry;
    use crate::geometry::Size;
    use crate::layer::LayerTree;
    use crate::query::ScaleRange;

    fn world() -> Rectangle {
        Rectangle::new(Point::ZERO, Point::new(256.0, 256.0))
    }

    fn scheme() -> TileScheme {
        TileScheme::new(world(), 256).with_zoom_range(0, 4)
    }

    /// One point feature at each tile's centre.
    fn centres(_coord: TileCoord, bounds: Rectangle) -> Result<Vec<Feature>, TileError> {
        Ok(vec![Feature::new(Geometry::Point(bounds.center()))])
    }

    fn area(x0: f64, y0: f64, x1: f64, y1: f64, scale: f64) -> FeatureQuery {
        FeatureQuery::new(scale, Rectangle::new(Point::new(x0, y0), Point::new(x1, y1)))
    }

    fn view() -> MapView {
        MapView::new(Camera::new(Point::new(128.0, 128.0), 1.0, Size::new(256.0, 256.0)), Crs::Cartesian)
    }

    // ── Scheme ───────────────────────────────────────────────────────

    #[test]
    fn zoom_for_scale_picks_coarsest_detailed_enough() {
        let s = scheme();
        assert_eq!(s.zoom_for_scale(1.0), Some(0));
        assert_eq!(s.zoom_for_scale(0.5), Some(1));
        assert_eq!(s.zoom_for_scale(0.3), Some(2));
        assert_eq!(s.zoom_for_scale(1e-9), Some(4));
        assert_eq!(s.zoom_for_scale(50.0), Some(0));
        assert_eq!(s.zoom_for_scale(f64::INFINITY), Some(0));
    }

    #[test]
    fn zoom_for_invalid_scale_is_none() {
        let s = scheme();
        assert_eq!(s.zoom_for_scale(0.0), None);
        assert_eq!(s.zoom_for_scale(-1.0), None);
        assert_eq!(s.zoom_for_scale(f64::NAN), None);
    }

    #[test]
    fn native_scale_halves_per_zoom() {
        let s = scheme();
        assert_eq!(s.native_scale(0), 1.0);
        assert_eq!(s.native_scale(2), 0.25);
    }

    #[test]
    fn tile_bounds_partition_world() {
        let s = scheme();
        assert_eq!(s.tile_bounds(TileCoord::new(0, 0, 0)), world());
        assert_eq!(
            s.tile_bounds(TileCoord::new(1, 1, 0)),
            Rectangle::new(Point::new(128.0, 0.0), Point::new(256.0, 128.0))
        );
    }

    #[test]
    fn tiles_covering_excludes_touching_neighbours() {
        let s = scheme();
        assert_eq!(
            s.tiles_covering(&Rectangle::new(Point::ZERO, Point::new(128.0, 128.0)), 1)
                .collect::<Vec<_>>(),
            vec![TileCoord::new(1, 0, 0)]
        );
        assert_eq!(
            s.tiles_covering(&Rectangle::new(Point::new(100.0, 10.0), Point::new(140.0, 20.0)), 1)
                .collect::<Vec<_>>(),
            vec![TileCoord::new(1, 0, 0), TileCoord::new(1, 1, 0)]
        );
    }

    #[test]
    fn tiles_covering_clips_to_world() {
        let s = scheme();
        let all = s.tiles_covering(&Rectangle::new(Point::new(-1e6, -1e6), Point::new(1e6, 1e6)), 2);
        assert_eq!(all.count(), 16);
        assert!(s
            .tiles_covering(&Rectangle::new(Point::new(300.0, 300.0), Point::new(400.0, 400.0)), 2)
            .next()
            .is_none());
    }

    #[test]
    fn deep_zoom_counts_do_not_overflow() {
        let s = TileScheme::new(world(), 256);
        let zoom = s.zoom_for_scale(1e-6).unwrap();
        assert_eq!(zoom, 18);
        assert_eq!(s.tile_count(&world(), zoom), 1u64 << 36);

        let first: Vec<TileCoord> = s.tiles_covering(&world(), zoom).take(2).collect();
        assert_eq!(first, vec![TileCoord::new(18, 0, 0), TileCoord::new(18, 1, 0)]);

        let max = s.with_zoom_range(0, MAX_ZOOM);
        assert_eq!(max.tile_count(&world(), MAX_ZOOM), 1u64 << 60);
    }

    #[test]
    fn budget_steps_down_to_coarser_zoom() {
        let s = TileScheme::new(world(), 256);
        assert_eq!(s.zoom_within_budget(&world(), 18), Some(5));
        assert_eq!(s.with_max_tiles(16).zoom_within_budget(&world(), 18), Some(2));

        // A small view keeps its full detail.
        let corner = Rectangle::new(Point::ZERO, Point::new(0.001, 0.001));
        assert_eq!(s.zoom_within_budget(&corner, 18), Some(18));

        let strict = s.with_zoom_range(3, 18).with_max_tiles(4);
        assert_eq!(strict.zoom_within_budget(&world(), 18), None);
    }

    #[test]
    fn nan_bounds_cover_nothing() {
        let s = scheme();
        let nan = Rectangle {
            min: Point::new(f64::NAN, 0.0),
            max: Point::new(f64::NAN, 1.0),
        };
        assert_eq!(s.tile_count(&nan, 2), 0);
        assert_eq!(s.tiles_covering(&nan, 2).count(), 0);
    }

    // ── Inline loading ───────────────────────────────────────────────

    #[test]
    fn prepare_then_update_installs_tiles() {
        let mut tree = LayerTree::new();
        let tiles = tree
            .add_composite(tree.root(), LayerSettings::new("tiles"), TileLayer::new(scheme(), centres))
            .unwrap();

        let q = area(0.0, 0.0, 256.0, 256.0, 0.5);
        tree.prepare(Crs::Cartesian, &q);
        assert_eq!(tree.behavior::<TileLayer>(tiles).unwrap().pending_count(), 4);
        assert!(tree.children(tiles).is_empty());

        tree.update(&view());
        let layer = tree.behavior::<TileLayer>(tiles).unwrap();
        assert_eq!(layer.loaded_count(), 4);
        assert_eq!(tree.children(tiles).len(), 4);
        assert_eq!(tree.features(Crs::Cartesian, &q, true).count(), 4);
    }

    #[test]
    fn moving_view_evicts_tiles() {
        let mut tree = LayerTree::new();
        let tiles = tree
            .add_composite(tree.root(), LayerSettings::new("tiles"), TileLayer::new(scheme(), centres))
            .unwrap();

        tree.prepare(Crs::Cartesian, &area(0.0, 0.0, 256.0, 256.0, 0.5));
        tree.update(&view());
        assert_eq!(tree.children(tiles).len(), 4);

        tree.prepare(Crs::Cartesian, &area(0.0, 0.0, 100.0, 100.0, 0.5));
        let layer = tree.behavior::<TileLayer>(tiles).unwrap();
        assert_eq!(layer.loaded_count(), 1);
        assert!(matches!(
            layer.tile_state(TileCoord::new(1, 0, 0)),
            Some(TileState::Loaded(_))
        ));
        assert_eq!(layer.tile_state(TileCoord::new(1, 1, 1)), None);
        assert_eq!(tree.children(tiles).len(), 1);
    }

    #[test]
    fn failed_fetch_is_recorded() {
        let mut tree = LayerTree::new();
        let source = |coord: TileCoord, _bounds: Rectangle| -> Result<Vec<Feature>, TileError> {
            Err(TileError::Fetch {
                coord,
                message: "offline".into(),
            })
        };
        let tiles = tree
            .add_composite(tree.root(), LayerSettings::new("tiles"), TileLayer::new(scheme(), source))
            .unwrap();

        tree.prepare(Crs::Cartesian, &area(0.0, 0.0, 10.0, 10.0, 1.0));
        tree.update(&view());
        let layer = tree.behavior::<TileLayer>(tiles).unwrap();
        assert_eq!(
            layer.tile_state(TileCoord::new(0, 0, 0)),
            Some(&TileState::Failed("failed to fetch tile 0/0/0: offline".into()))
        );
        assert!(tree.children(tiles).is_empty());
    }

    #[test]
    fn whole_world_at_tiny_scale_stays_within_budget() {
        let mut tree = LayerTree::new();
        let tiles = tree
            .add_composite(
                tree.root(),
                LayerSettings::new("tiles"),
                TileLayer::new(TileScheme::new(world(), 256), centres),
            )
            .unwrap();

        tree.prepare(Crs::Cartesian, &FeatureQuery::new(1e-6, world()));
        let layer = tree.behavior::<TileLayer>(tiles).unwrap();
        assert_eq!(layer.pending_count() as u64, DEFAULT_MAX_TILES);
        assert!(layer.tiles().all(|(coord, _)| coord.zoom == 5));
    }

    #[test]
    fn out_of_scale_tile_layer_holds_finished_tiles() {
        let mut tree = LayerTree::new();
        let settings = LayerSettings::new("tiles").with_scale_range(ScaleRange::new(0.0, 1.0).unwrap());
        let tiles = tree
            .add_composite(tree.root(), settings, TileLayer::new(scheme(), centres))
            .unwrap();

        // Requested while in range, then the view zooms out past max scale.
        tree.prepare(Crs::Cartesian, &area(0.0, 0.0, 256.0, 256.0, 0.5));
        assert_eq!(tree.behavior::<TileLayer>(tiles).unwrap().pending_count(), 4);

        let far = MapView::new(Camera::new(Point::new(128.0, 128.0), 50.0, Size::new(256.0, 256.0)), Crs::Cartesian);
        tree.update(&far);
        let layer = tree.behavior::<TileLayer>(tiles).unwrap();
        assert_eq!(layer.pending_count(), 4);
        assert_eq!(layer.loaded_count(), 0);
        assert!(tree.children(tiles).is_empty());

        // Back in range the held completions are installed.
        tree.update(&view());
        assert_eq!(tree.behavior::<TileLayer>(tiles).unwrap().loaded_count(), 4);
        assert_eq!(tree.children(tiles).len(), 4);
    }

    #[test]
    fn out_of_scale_tile_layer_does_no_work() {
        static FETCHES: AtomicUsize = AtomicUsize::new(0);
        let counting = |coord: TileCoord, bounds: Rectangle| -> Result<Vec<Feature>, TileError> {
            FETCHES.fetch_add(1, Ordering::SeqCst);
            centres(coord, bounds)
        };

        let mut tree = LayerTree::new();
        let settings = LayerSettings::new("tiles").with_scale_range(ScaleRange::new(100.0, 1000.0).unwrap());
        let tiles = tree
            .add_composite(tree.root(), settings, TileLayer::new(scheme(), counting))
            .unwrap();

        let q = area(0.0, 0.0, 256.0, 256.0, 50.0);
        assert!(!tree.is_active_for_query(tiles, &q));
        tree.prepare(Crs::Cartesian, &q);
        tree.update(&view());
        assert_eq!(tree.features(Crs::Cartesian, &q, true).count(), 0);
        assert_eq!(FETCHES.load(Ordering::SeqCst), 0);
        assert_eq!(tree.behavior::<TileLayer>(tiles).unwrap().tiles().count(), 0);
    }

    // ── Worker loading ───────────────────────────────────────────────

    #[tokio::test]
    async fn worker_tiles_arrive_on_later_update() {
        let worker = TileWorker::spawn(centres).unwrap();
        let mut tree = LayerTree::new();
        let tiles = tree
            .add_composite(tree.root(), LayerSettings::new("tiles"), TileLayer::with_worker(scheme(), worker))
            .unwrap();

        let q = area(0.0, 0.0, 256.0, 256.0, 0.5);
        tree.prepare(Crs::Cartesian, &q);

        for _ in 0..200 {
            tree.update(&view());
            if tree.behavior::<TileLayer>(tiles).unwrap().loaded_count() == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(tree.behavior::<TileLayer>(tiles).unwrap().loaded_count(), 4);
        assert_eq!(tree.features(Crs::Cartesian, &q, true).count(), 4);
    }
}
