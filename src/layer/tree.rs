//! Tree operations: insert, remove, walk, and the gated traversals.

use std::any::Any;
use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};
use tracing::{debug, trace};

use super::composite::{Children, CompositeBehavior};
use super::leaf::{HitTestContext, Layer, MapView, PresentationObject};
use super::node::{Drawable, LayerId, LayerKind, LayerNode, LayerSettings};
use super::LayerError;
use crate::feature::{Feature, FeatureKey};
use crate::geometry::Rectangle;
use crate::query::{self, CompositeEnumerator, Crs, FeatureEnumerator, FeatureQuery};

/// Empty slice constant for returning when a layer has no children.
const EMPTY_CHILDREN: &[LayerId] = &[];

/// The layer tree, backed by a slotmap arena.
///
/// The root is a plain layer set created with the tree and never removed.
/// Parent/child links live in secondary maps so removal is O(subtree size)
/// and lookup is O(1).
pub struct LayerTree {
    nodes: SlotMap<LayerId, LayerNode>,
    children: SecondaryMap<LayerId, Vec<LayerId>>,
    parent: SecondaryMap<LayerId, LayerId>,
    root: LayerId,
}

impl LayerTree {
    /// Create a tree holding only the root set.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(LayerNode::set(LayerSettings::new("root")));
        let mut children = SecondaryMap::new();
        children.insert(root, Vec::new());
        Self {
            nodes,
            children,
            parent: SecondaryMap::new(),
            root,
        }
    }

    pub fn root(&self) -> LayerId {
        self.root
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Append `node` as the last child of `parent`.
    pub fn insert(&mut self, parent: LayerId, node: LayerNode) -> Result<LayerId, LayerError> {
        let parent_node = self
            .nodes
            .get(parent)
            .ok_or(LayerError::UnknownLayer(parent))?;
        if !parent_node.kind.is_composite() {
            return Err(LayerError::NotComposite(parent));
        }

        let is_composite = node.kind.is_composite();
        let name = node.settings.name.clone();
        let id = self.nodes.insert(node);
        if is_composite {
            self.children.insert(id, Vec::new());
        }
        self.parent.insert(id, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
        }
        debug!(?id, ?parent, %name, "layer inserted");
        Ok(id)
    }

    /// Append a leaf layer.
    pub fn add_layer(
        &mut self,
        parent: LayerId,
        settings: LayerSettings,
        layer: impl Layer + 'static,
    ) -> Result<LayerId, LayerError> {
        self.insert(parent, LayerNode::leaf(settings, layer))
    }

    /// Append an empty layer set.
    pub fn add_set(&mut self, parent: LayerId, settings: LayerSettings) -> Result<LayerId, LayerError> {
        self.insert(parent, LayerNode::set(settings))
    }

    /// Append a composite driven by `behavior`.
    pub fn add_composite(
        &mut self,
        parent: LayerId,
        settings: LayerSettings,
        behavior: impl CompositeBehavior + 'static,
    ) -> Result<LayerId, LayerError> {
        self.insert(parent, LayerNode::composite(settings, behavior))
    }

    /// Remove a layer and all its descendants.
    ///
    /// Returns the removed node itself; descendants are dropped.
    pub fn remove(&mut self, id: LayerId) -> Result<LayerNode, LayerError> {
        if id == self.root {
            return Err(LayerError::RootRemoval);
        }
        if !self.nodes.contains_key(id) {
            return Err(LayerError::UnknownLayer(id));
        }

        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed = None;
        let mut count = 0usize;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            self.parent.remove(current);
            let node = self.nodes.remove(current);
            count += 1;
            if current == id {
                removed = node;
            }
        }

        debug!(?id, count, "layer subtree removed");
        removed.ok_or(LayerError::UnknownLayer(id))
    }

    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.parent.get(id).copied()
    }

    /// Children of a layer. Empty for leaves and unknown ids.
    pub fn children(&self, id: LayerId) -> &[LayerId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    pub fn get(&self, id: LayerId) -> Option<&LayerNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut LayerNode> {
        self.nodes.get_mut(id)
    }

    pub fn settings(&self, id: LayerId) -> Option<&LayerSettings> {
        self.nodes.get(id).map(|n| &n.settings)
    }

    pub fn settings_mut(&mut self, id: LayerId) -> Option<&mut LayerSettings> {
        self.nodes.get_mut(id).map(|n| &mut n.settings)
    }

    /// Downcast a leaf to its concrete layer type.
    pub fn layer<T: Layer>(&self, id: LayerId) -> Option<&T> {
        match &self.nodes.get(id)?.kind {
            LayerKind::Leaf(layer) => {
                let layer: &dyn Layer = &**layer;
                layer.as_any().downcast_ref::<T>()
            }
            LayerKind::Composite(_) => None,
        }
    }

    /// Downcast a leaf to its concrete layer type, mutably.
    pub fn layer_mut<T: Layer>(&mut self, id: LayerId) -> Option<&mut T> {
        match &mut self.nodes.get_mut(id)?.kind {
            LayerKind::Leaf(layer) => {
                let layer: &mut dyn Layer = &mut **layer;
                layer.as_any_mut().downcast_mut::<T>()
            }
            LayerKind::Composite(_) => None,
        }
    }

    /// Downcast a composite's behavior to its concrete type.
    pub fn behavior<T: CompositeBehavior>(&self, id: LayerId) -> Option<&T> {
        match &self.nodes.get(id)?.kind {
            LayerKind::Composite(Some(behavior)) => {
                let behavior: &dyn CompositeBehavior = &**behavior;
                let any: &dyn Any = behavior.as_any();
                any.downcast_ref::<T>()
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: LayerId) -> Vec<LayerId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Reverse so the first child is visited first.
            stack.extend(self.children(current).iter().rev());
        }
        result
    }

    // -----------------------------------------------------------------------
    // Gated traversals
    // -----------------------------------------------------------------------

    /// Whether layer `id` takes part in `query`. Unknown ids are inactive.
    pub fn is_active_for_query(&self, id: LayerId, query: &FeatureQuery) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|n| query::is_active_for_query(&n.settings, query))
    }

    /// Let active layers warm up for `query`, depth first.
    ///
    /// An inactive layer is skipped together with its whole subtree.
    pub fn prepare(&mut self, crs: Crs, query: &FeatureQuery) {
        self.prepare_node(self.root, crs, query);
    }

    fn prepare_node(&mut self, id: LayerId, crs: Crs, query: &FeatureQuery) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if !query::is_active_for_query(&node.settings, query) {
            trace!(?id, scale = query.scale, "prepare skipped inactive layer");
            return;
        }
        let behavior = match &mut node.kind {
            LayerKind::Leaf(layer) => {
                layer.prepare(crs, query);
                return;
            }
            LayerKind::Composite(slot) => slot.take(),
        };
        if let Some(mut behavior) = behavior {
            behavior.prepare(&mut Children::new(self, id), crs, query);
            self.restore_behavior(id, behavior);
        }
        for child in self.children(id).to_vec() {
            self.prepare_node(child, crs, query);
        }
    }

    /// Push view state into every enabled layer, depth first.
    pub fn update(&mut self, view: &MapView) {
        self.update_node(self.root, view);
    }

    fn update_node(&mut self, id: LayerId, view: &MapView) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if !node.settings.enabled {
            return;
        }
        let behavior = match &mut node.kind {
            LayerKind::Leaf(layer) => {
                layer.update(view);
                return;
            }
            LayerKind::Composite(slot) => slot.take(),
        };
        if let Some(mut behavior) = behavior {
            behavior.update(&mut Children::new(self, id), view);
            self.restore_behavior(id, behavior);
        }
        for child in self.children(id).to_vec() {
            self.update_node(child, view);
        }
    }

    fn restore_behavior(&mut self, id: LayerId, behavior: Box<dyn CompositeBehavior>) {
        if let Some(LayerNode {
            kind: LayerKind::Composite(slot),
            ..
        }) = self.nodes.get_mut(id)
        {
            *slot = Some(behavior);
        }
    }

    /// Collect hits for `bounds` from active, selectable layers.
    ///
    /// Results are appended to `out` in child order; a later entry belongs to
    /// a layer drawn above an earlier one.
    pub fn hit_test(&self, view: &MapView, bounds: Rectangle, out: &mut Vec<PresentationObject>) {
        let query = view.query();
        self.hit_test_node(self.root, view, &query, bounds, out);
    }

    fn hit_test_node(
        &self,
        id: LayerId,
        view: &MapView,
        query: &FeatureQuery,
        bounds: Rectangle,
        out: &mut Vec<PresentationObject>,
    ) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.settings.selectable || !query::is_active_for_query(&node.settings, query) {
            return;
        }
        match &node.kind {
            LayerKind::Leaf(layer) => {
                let ctx = HitTestContext {
                    layer: id,
                    view,
                    bounds,
                };
                layer.hit_test(&ctx, out);
            }
            LayerKind::Composite(_) => {
                for &child in self.children(id) {
                    self.hit_test_node(child, view, query, bounds, out);
                }
            }
        }
    }

    /// Lazily enumerate features under the root.
    ///
    /// With `active_only` every layer is gated by
    /// [`is_active_for_query`](Self::is_active_for_query); otherwise only by
    /// `enabled`. Child enumerators are built only when enumeration reaches
    /// them.
    pub fn features(&self, crs: Crs, query: &FeatureQuery, active_only: bool) -> FeatureEnumerator<'_> {
        self.features_of(self.root, crs, *query, active_only)
    }

    /// Like [`features`](Self::features) but rooted at `id`.
    pub fn features_of(
        &self,
        id: LayerId,
        crs: Crs,
        query: FeatureQuery,
        active_only: bool,
    ) -> FeatureEnumerator<'_> {
        let Some(node) = self.nodes.get(id) else {
            return FeatureEnumerator::empty();
        };
        let participates = if active_only {
            query::is_active_for_query(&node.settings, &query)
        } else {
            node.settings.enabled
        };
        if !participates {
            return FeatureEnumerator::empty();
        }
        match &node.kind {
            LayerKind::Leaf(layer) => layer.features(crs, &query),
            LayerKind::Composite(_) => {
                let mut composite = CompositeEnumerator::new();
                for &child in self.children(id) {
                    composite.add_deferred(move || self.features_of(child, crs, query, active_only));
                }
                composite.build()
            }
        }
    }

    /// Drawables of active, rendering-enabled layers in draw order.
    ///
    /// A layer with rendering disabled hides its whole subtree.
    pub fn drawables(&self, query: &FeatureQuery) -> Vec<(LayerId, &dyn Drawable)> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if !node.settings.rendering_enabled || !query::is_active_for_query(&node.settings, query) {
                continue;
            }
            if let Some(drawable) = node.drawable.as_deref() {
                out.push((id, drawable));
            }
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    pub fn feature(&self, key: FeatureKey) -> Option<&Feature> {
        match &self.nodes.get(key.layer)?.kind {
            LayerKind::Leaf(layer) => layer.feature(key.feature),
            LayerKind::Composite(_) => None,
        }
    }

    pub fn feature_mut(&mut self, key: FeatureKey) -> Option<&mut Feature> {
        match &mut self.nodes.get_mut(key.layer)?.kind {
            LayerKind::Leaf(layer) => layer.feature_mut(key.feature),
            LayerKind::Composite(_) => None,
        }
    }
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::camera::Camera;
    use crate::feature::Geometry;
    use crate::geometry::{Point, Size};
    use crate::layer::FeatureLayer;
    use crate::query::ScaleRange;

    type Log = Rc<RefCell<Vec<String>>>;

    /// Leaf that records every call made to it.
    struct Probe {
        name: &'static str,
        log: Log,
        features: Vec<Feature>,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log, xs: &[f64]) -> Self {
            Self {
                name,
                log: Rc::clone(log),
                features: xs
                    .iter()
                    .map(|&x| Feature::new(Geometry::Point(Point::new(x, 0.0))))
                    .collect(),
            }
        }
    }

    impl Layer for Probe {
        fn prepare(&mut self, _crs: Crs, _query: &FeatureQuery) {
            self.log.borrow_mut().push(format!("prepare {}", self.name));
        }

        fn update(&mut self, _view: &MapView) {
            self.log.borrow_mut().push(format!("update {}", self.name));
        }

        fn features<'a>(&'a self, _crs: Crs, _query: &FeatureQuery) -> FeatureEnumerator<'a> {
            self.log.borrow_mut().push(format!("features {}", self.name));
            FeatureEnumerator::new(self.features.iter())
        }
    }

    /// Behavior that records its hooks.
    struct Hook {
        log: Log,
    }

    impl CompositeBehavior for Hook {
        fn prepare(&mut self, children: &mut Children<'_>, _crs: Crs, _query: &FeatureQuery) {
            self.log
                .borrow_mut()
                .push(format!("hook prepare ({} children)", children.len()));
        }
    }

    #[derive(Debug)]
    struct Sprite(&'static str);

    impl Drawable for Sprite {}

    fn query(scale: f64) -> FeatureQuery {
        FeatureQuery::new(scale, Rectangle::new(Point::new(-100.0, -100.0), Point::new(100.0, 100.0)))
    }

    fn view(scale: f64) -> MapView {
        MapView::new(Camera::new(Point::ZERO, scale, Size::new(100.0, 100.0)), Crs::Cartesian)
    }

    fn xs(iter: FeatureEnumerator<'_>) -> Vec<f64> {
        iter.map(|f| f.position().x).collect()
    }

    fn scaled(name: &str, min: f64, max: f64) -> LayerSettings {
        LayerSettings::new(name).with_scale_range(ScaleRange::new(min, max).unwrap())
    }

    /// Build a small test tree:
    /// ```text
    ///        root
    ///       /    \
    ///     set     c
    ///    /   \
    ///   a     b
    /// ```
    fn sample(log: &Log) -> (LayerTree, [LayerId; 4]) {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let set = tree.add_set(root, LayerSettings::new("set")).unwrap();
        let a = tree.add_layer(set, LayerSettings::new("a"), Probe::new("a", log, &[1.0, 2.0])).unwrap();
        let b = tree.add_layer(set, LayerSettings::new("b"), Probe::new("b", log, &[3.0])).unwrap();
        let c = tree.add_layer(root, LayerSettings::new("c"), Probe::new("c", log, &[4.0])).unwrap();
        (tree, [set, a, b, c])
    }

    // ── Structure ────────────────────────────────────────────────────

    #[test]
    fn new_tree_has_only_root() {
        let tree = LayerTree::new();
        assert!(tree.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(tree.children(tree.root()).is_empty());
    }

    #[test]
    fn insert_into_leaf_is_rejected() {
        let log = Log::default();
        let (mut tree, [_, a, ..]) = sample(&log);
        let err = tree.add_set(a, LayerSettings::new("x")).unwrap_err();
        assert_eq!(err, LayerError::NotComposite(a));
    }

    #[test]
    fn insert_under_unknown_parent_is_rejected() {
        let log = Log::default();
        let (mut tree, [set, ..]) = sample(&log);
        tree.remove(set).unwrap();
        assert_eq!(
            tree.add_set(set, LayerSettings::new("x")).unwrap_err(),
            LayerError::UnknownLayer(set)
        );
    }

    #[test]
    fn remove_drops_subtree() {
        let log = Log::default();
        let (mut tree, [set, a, b, c]) = sample(&log);
        let removed = tree.remove(set).unwrap();
        assert_eq!(removed.settings.name, "set");
        assert!(!tree.contains(a));
        assert!(!tree.contains(b));
        assert_eq!(tree.children(tree.root()), &[c]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn root_cannot_be_removed() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        assert_eq!(tree.remove(root).unwrap_err(), LayerError::RootRemoval);
    }

    #[test]
    fn walk_depth_first_preorder() {
        let log = Log::default();
        let (tree, [set, a, b, c]) = sample(&log);
        assert_eq!(tree.walk_depth_first(tree.root()), vec![tree.root(), set, a, b, c]);
        assert_eq!(tree.parent(a), Some(set));
        assert_eq!(tree.parent(tree.root()), None);
    }

    #[test]
    fn downcast_leaf_layer() {
        let mut tree = LayerTree::new();
        let id = tree
            .add_layer(tree.root(), LayerSettings::new("f"), FeatureLayer::new())
            .unwrap();
        assert!(tree.layer::<FeatureLayer>(id).is_some());
        let fid = tree
            .layer_mut::<FeatureLayer>(id)
            .unwrap()
            .insert(Feature::new(Geometry::Point(Point::new(2.0, 3.0))));
        let key = FeatureKey::new(id, fid);
        assert_eq!(tree.feature(key).map(Feature::position), Some(Point::new(2.0, 3.0)));
        tree.feature_mut(key).unwrap().set_position(Point::ZERO);
        assert_eq!(tree.feature(key).map(Feature::position), Some(Point::ZERO));
    }

    // ── Prepare / update ─────────────────────────────────────────────

    #[test]
    fn prepare_visits_active_layers_depth_first() {
        let log = Log::default();
        let (mut tree, _) = sample(&log);
        tree.prepare(Crs::Cartesian, &query(1.0));
        assert_eq!(*log.borrow(), vec!["prepare a", "prepare b", "prepare c"]);
    }

    #[test]
    fn prepare_skips_inactive_subtree() {
        let log = Log::default();
        let (mut tree, [set, ..]) = sample(&log);
        tree.settings_mut(set).unwrap().scale_range = ScaleRange::new(10.0, 20.0).unwrap();
        tree.prepare(Crs::Cartesian, &query(1.0));
        assert_eq!(*log.borrow(), vec!["prepare c"]);
    }

    #[test]
    fn update_gates_on_enabled_only() {
        let log = Log::default();
        let (mut tree, [set, _, b, _]) = sample(&log);
        tree.settings_mut(set).unwrap().scale_range = ScaleRange::new(1000.0, 2000.0).unwrap();
        tree.settings_mut(b).unwrap().enabled = false;
        tree.update(&view(1.0));
        assert_eq!(*log.borrow(), vec!["update a", "update c"]);
    }

    #[test]
    fn behavior_hook_runs_before_children() {
        let log = Log::default();
        let mut tree = LayerTree::new();
        let comp = tree
            .add_composite(tree.root(), LayerSettings::new("comp"), Hook { log: Rc::clone(&log) })
            .unwrap();
        tree.add_layer(comp, LayerSettings::new("x"), Probe::new("x", &log, &[]))
            .unwrap();
        tree.prepare(Crs::Cartesian, &query(1.0));
        assert_eq!(*log.borrow(), vec!["hook prepare (1 children)", "prepare x"]);
        assert!(tree.behavior::<Hook>(comp).is_some());
    }

    // ── Enumeration ──────────────────────────────────────────────────

    #[test]
    fn features_concatenate_in_child_order() {
        let log = Log::default();
        let (tree, _) = sample(&log);
        assert_eq!(xs(tree.features(Crs::Cartesian, &query(1.0), true)), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn features_are_lazy() {
        let log = Log::default();
        let (tree, _) = sample(&log);
        let mut iter = tree.features(Crs::Cartesian, &query(1.0), true);
        assert!(log.borrow().is_empty());
        assert_eq!(iter.next().map(|f| f.position().x), Some(1.0));
        assert_eq!(*log.borrow(), vec!["features a"]);
    }

    #[test]
    fn disabled_set_yields_nothing() {
        let log = Log::default();
        let (mut tree, [set, ..]) = sample(&log);
        tree.settings_mut(set).unwrap().enabled = false;
        assert_eq!(xs(tree.features(Crs::Cartesian, &query(1.0), true)), vec![4.0]);
        assert_eq!(xs(tree.features(Crs::Cartesian, &query(1.0), false)), vec![4.0]);
        assert!(!log.borrow().iter().any(|l| l == "features a" || l == "features b"));
    }

    #[test]
    fn active_only_false_ignores_scale() {
        let log = Log::default();
        let (mut tree, [_, a, ..]) = sample(&log);
        tree.settings_mut(a).unwrap().scale_range = ScaleRange::new(10.0, 20.0).unwrap();
        assert_eq!(xs(tree.features(Crs::Cartesian, &query(1.0), true)), vec![3.0, 4.0]);
        assert_eq!(xs(tree.features(Crs::Cartesian, &query(1.0), false)), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_set_yields_nothing() {
        let mut tree = LayerTree::new();
        let set = tree.add_set(tree.root(), LayerSettings::new("empty")).unwrap();
        assert_eq!(tree.features_of(set, Crs::Cartesian, query(1.0), true).count(), 0);
        let mut hits = Vec::new();
        tree.hit_test(&view(1.0), Rectangle::new(Point::ZERO, Point::new(1.0, 1.0)), &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn scale_gated_composite_short_circuits() {
        let log = Log::default();
        let mut tree = LayerTree::new();
        let set = tree.add_set(tree.root(), scaled("set", 100.0, 1000.0)).unwrap();
        tree.add_layer(set, LayerSettings::new("a"), Probe::new("a", &log, &[1.0]))
            .unwrap();

        assert!(!tree.is_active_for_query(set, &query(50.0)));
        assert_eq!(tree.features(Crs::Cartesian, &query(50.0), true).count(), 0);
        tree.prepare(Crs::Cartesian, &query(50.0));
        assert!(log.borrow().is_empty());
    }

    // ── Hit testing ──────────────────────────────────────────────────

    fn feature_leaf(xs: &[f64]) -> FeatureLayer {
        FeatureLayer::from_features(
            xs.iter()
                .map(|&x| Feature::new(Geometry::Point(Point::new(x, 0.0)))),
        )
    }

    #[test]
    fn hit_test_concatenates_in_child_order() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let first = tree.add_layer(root, LayerSettings::new("first"), feature_leaf(&[0.0, 0.5])).unwrap();
        let second = tree.add_layer(root, LayerSettings::new("second"), feature_leaf(&[0.2])).unwrap();
        tree.update(&view(1.0));

        let mut hits = Vec::new();
        tree.hit_test(&view(1.0), Rectangle::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0)), &mut hits);
        let layers: Vec<LayerId> = hits.iter().map(|h| h.layer).collect();
        assert_eq!(layers, vec![first, first, second]);
    }

    #[test]
    fn hit_test_skips_unselectable_and_inactive() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        tree.add_layer(root, LayerSettings::new("hidden").selectable(false), feature_leaf(&[0.0]))
            .unwrap();
        tree.add_layer(root, scaled("far", 10.0, 20.0), feature_leaf(&[0.0]))
            .unwrap();
        let live = tree.add_layer(root, LayerSettings::new("live"), feature_leaf(&[0.0])).unwrap();

        let mut hits = Vec::new();
        tree.hit_test(&view(1.0), Rectangle::new(Point::new(-1.0, -1.0), Point::new(1.0, 1.0)), &mut hits);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].layer, live);
    }

    // ── Drawables ────────────────────────────────────────────────────

    #[test]
    fn drawables_in_draw_order() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let set = tree
            .insert(root, LayerNode::set(LayerSettings::new("set")).with_drawable(Sprite("set")))
            .unwrap();
        let a = tree
            .insert(set, LayerNode::leaf(LayerSettings::new("a"), FeatureLayer::new()).with_drawable(Sprite("a")))
            .unwrap();
        tree.insert(
            root,
            LayerNode::leaf(LayerSettings::new("off").rendering_enabled(false), FeatureLayer::new())
                .with_drawable(Sprite("off")),
        )
        .unwrap();

        let drawn: Vec<(LayerId, &'static str)> = tree
            .drawables(&query(1.0))
            .into_iter()
            .map(|(id, d)| (id, d.as_any().downcast_ref::<Sprite>().map_or("?", |s| s.0)))
            .collect();
        assert_eq!(drawn, vec![(set, "set"), (a, "a")]);
    }
}
