//! MapControl: owns the layer tree, camera, controller, events and animations.
//!
//! [`MapControl`] is the single-threaded frame driver. Each [`tick`](MapControl::tick)
//! polls the active camera controller, advances animations, then prepares and
//! updates the layer tree against the resulting view.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::animation::Animator;
use crate::camera::{Camera, CameraController, CameraStatus, PanZoomController};
use crate::event::{DispatchOutcome, Event, EventHandler, EventKind, EventManager, SharedHandler, SubscriptionId};
use crate::geometry::{Point, Rectangle, Size};
use crate::layer::{Drawable, LayerId, LayerTree, MapView, PresentationObject};
use crate::query::{Crs, FeatureEnumerator};
use crate::tool::{NavigationQueue, NavigationTools};

// ---------------------------------------------------------------------------
// MapConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`MapControl`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct MapConfig {
    pub crs: Crs,
    /// Extent of the world in world units.
    pub world: Rectangle,
    /// Viewport size in screen pixels.
    pub viewport: Size,
    /// Initial centre. `None` centres on the world.
    pub center: Option<Point>,
    /// Initial scale. `None` fits the world in the viewport.
    pub scale: Option<f64>,
    /// Mark queries as quick updates while the camera is in flight.
    pub quick_updates_while_moving: bool,
    /// Hit-test radius around the pointer, in screen pixels.
    pub hit_tolerance: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            crs: Crs::Cartesian,
            world: Rectangle::new(Point::ZERO, Point::new(1024.0, 1024.0)),
            viewport: Size::new(800.0, 600.0),
            center: None,
            scale: None,
            quick_updates_while_moving: true,
            hit_tolerance: 3.0,
        }
    }
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `crs`. A CRS with a natural extent also replaces the world bounds.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        if let Some(world) = crs.world_bounds() {
            self.world = world;
        }
        self
    }

    pub fn with_world(mut self, world: Rectangle) -> Self {
        self.world = world;
        self
    }

    pub fn with_viewport(mut self, viewport: Size) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_center(mut self, center: Point) -> Self {
        self.center = Some(center);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_quick_updates(mut self, enabled: bool) -> Self {
        self.quick_updates_while_moving = enabled;
        self
    }

    pub fn with_hit_tolerance(mut self, pixels: f64) -> Self {
        self.hit_tolerance = pixels.max(0.0);
        self
    }
}

// ---------------------------------------------------------------------------
// FrameStatus
// ---------------------------------------------------------------------------

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStatus {
    pub camera: CameraStatus,
    /// Whether any animation ran.
    pub animating: bool,
}

impl FrameStatus {
    /// Whether the frame differs from the previous one.
    pub fn needs_redraw(&self) -> bool {
        self.camera.was_updated() || self.animating
    }

    /// Whether the host should tick again without waiting for input.
    pub fn needs_another_tick(&self) -> bool {
        self.camera.needs_another_update() || self.animating
    }

    pub fn is_idle(&self) -> bool {
        self.camera.is_idle() && !self.animating
    }
}

// ---------------------------------------------------------------------------
// MapControl
// ---------------------------------------------------------------------------

/// The map: layer tree plus everything that drives it.
pub struct MapControl {
    config: MapConfig,
    tree: LayerTree,
    camera: Camera,
    controller: Option<Box<dyn CameraController>>,
    events: EventManager,
    animator: Animator,
    navigation: Option<NavigationTools>,
    clock: Duration,
    moving: bool,
}

impl MapControl {
    pub fn new(config: MapConfig) -> Self {
        let center = config.center.unwrap_or(config.world.center());
        let mut camera = Camera::new(center, config.scale.unwrap_or(1.0), config.viewport);
        if config.scale.is_none() {
            camera.fit(&config.world);
            if let Some(center) = config.center {
                camera.center = center;
            }
        }
        Self {
            config,
            tree: LayerTree::new(),
            camera,
            controller: None,
            events: EventManager::new(),
            animator: Animator::new(),
            navigation: None,
            clock: Duration::ZERO,
            moving: false,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn tree(&self) -> &LayerTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut LayerTree {
        &mut self.tree
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replace the camera outright. The active controller is not told.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut Animator {
        &mut self.animator
    }

    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Time accumulated over all ticks.
    pub fn clock(&self) -> Duration {
        self.clock
    }

    /// The view the next layer operation will run against.
    pub fn view(&self) -> MapView {
        let mut view = MapView::new(self.camera, self.config.crs);
        view.quick_update = self.moving && self.config.quick_updates_while_moving;
        view
    }

    // ── Camera controllers ───────────────────────────────────────────

    /// Make `controller` active.
    ///
    /// The outgoing controller is deactivated first, then the new one is
    /// activated and its camera adopted. Returns the outgoing controller.
    pub fn set_camera_controller(
        &mut self,
        controller: impl CameraController + 'static,
    ) -> Option<Box<dyn CameraController>> {
        let previous = self.clear_camera_controller();
        let mut controller: Box<dyn CameraController> = Box::new(controller);
        self.camera = controller.on_activated(&self.camera, self.config.world);
        info!(controller = controller.name(), "camera controller activated");
        self.controller = Some(controller);
        previous
    }

    /// Deactivate and return the active controller, if any.
    pub fn clear_camera_controller(&mut self) -> Option<Box<dyn CameraController>> {
        let mut previous = self.controller.take()?;
        previous.on_deactivated();
        info!(controller = previous.name(), "camera controller deactivated");
        self.moving = false;
        Some(previous)
    }

    pub fn has_camera_controller(&self) -> bool {
        self.controller.is_some()
    }

    /// Install pan, zoom and keyboard tools driving a [`PanZoomController`].
    ///
    /// The tools are subscribed after any existing handlers and kept alive by
    /// the map. Returns their shared queue.
    pub fn install_navigation(&mut self) -> NavigationQueue {
        let queue = NavigationQueue::new();
        let tools = NavigationTools::new(queue.clone());
        tools.subscribe(&mut self.events);
        self.navigation = Some(tools);
        self.set_camera_controller(PanZoomController::new(queue.clone()));
        queue
    }

    // ── Frame ────────────────────────────────────────────────────────

    /// Advance the map by `delta`.
    pub fn tick(&mut self, delta: Duration) -> FrameStatus {
        self.clock += delta;
        let camera = match self.controller.as_mut() {
            Some(controller) => controller.update_camera(&mut self.camera, delta),
            None => CameraStatus::IDLE,
        };
        self.moving = camera.needs_another_update();
        let animating = self.animator.tick(delta, &mut self.tree);

        let view = self.view();
        self.tree.prepare(self.config.crs, &view.query());
        self.tree.update(&view);

        let status = FrameStatus { camera, animating };
        debug!(?status, clock = ?self.clock, "tick");
        status
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Features under a screen position, bottom layer first.
    pub fn hit_test_at(&self, screen: Point) -> Vec<PresentationObject> {
        let view = self.view();
        let world = self.camera.screen_to_world(screen);
        let radius = self.config.hit_tolerance * self.camera.scale;
        let bounds = Rectangle::from_center_size(world, Size::new(radius * 2.0, radius * 2.0));
        let mut out = Vec::new();
        self.tree.hit_test(&view, bounds, &mut out);
        out
    }

    /// Features in the current view.
    pub fn features(&self, active_only: bool) -> FeatureEnumerator<'_> {
        let view = self.view();
        self.tree.features(self.config.crs, &view.query(), active_only)
    }

    /// Drawables to render this frame, in draw order.
    pub fn visible_drawables(&self) -> Vec<(LayerId, &dyn Drawable)> {
        self.tree.drawables(&self.view().query())
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Stamp `event` with the map clock and dispatch it.
    ///
    /// Resize events update the viewport before handlers see them.
    pub fn dispatch_event(&mut self, event: Event) -> DispatchOutcome {
        if let EventKind::Resize { width, height } = event.kind {
            self.camera.viewport = Size::new(f64::from(width), f64::from(height));
            debug!(width, height, "viewport resized");
        }
        self.events.dispatch_event(event, self.clock)
    }

    /// Subscribe a handler. The map holds it weakly.
    pub fn subscribe<H: EventHandler + 'static>(&mut self, handler: &Rc<RefCell<H>>) -> SubscriptionId {
        self.events.subscribe(handler)
    }

    pub fn subscribe_shared(&mut self, handler: &SharedHandler) -> SubscriptionId {
        self.events.subscribe_shared(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}

impl Default for MapControl {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::camera::{FlyToController, StaticController};
    use crate::event::{Key, Modifiers};
    use crate::feature::{Feature, Geometry};
    use crate::layer::{FeatureLayer, LayerSettings};

    fn small_config() -> MapConfig {
        MapConfig::new()
            .with_world(Rectangle::new(Point::ZERO, Point::new(100.0, 100.0)))
            .with_viewport(Size::new(100.0, 100.0))
            .with_scale(1.0)
    }

    /// Records activation calls.
    struct Tracked {
        activated: Rc<Cell<u32>>,
        deactivated: Rc<Cell<u32>>,
    }

    impl CameraController for Tracked {
        fn on_activated(&mut self, camera: &Camera, _world: Rectangle) -> Camera {
            self.activated.set(self.activated.get() + 1);
            *camera
        }

        fn on_deactivated(&mut self) {
            self.deactivated.set(self.deactivated.get() + 1);
        }

        fn update_camera(&mut self, _camera: &mut Camera, _delta: Duration) -> CameraStatus {
            CameraStatus::IDLE
        }
    }

    // ── Config ───────────────────────────────────────────────────────

    #[test]
    fn default_config_fits_world() {
        let map = MapControl::default();
        assert_eq!(map.camera().center, Point::new(512.0, 512.0));
        // 1024 world units over the 600 pixel height is the tighter fit.
        assert!((map.camera().scale - 1024.0 / 600.0).abs() < 1e-12);
    }

    #[test]
    fn web_mercator_sets_world() {
        let config = MapConfig::new().with_crs(Crs::WebMercator);
        assert_eq!(Some(config.world), Crs::WebMercator.world_bounds());
    }

    #[test]
    fn explicit_center_and_scale() {
        let map = MapControl::new(small_config().with_center(Point::new(10.0, 20.0)));
        assert_eq!(map.camera().center, Point::new(10.0, 20.0));
        assert_eq!(map.camera().scale, 1.0);
    }

    // ── Controllers ──────────────────────────────────────────────────

    #[test]
    fn activation_state_machine() {
        let (a1, d1) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let (a2, d2) = (Rc::new(Cell::new(0)), Rc::new(Cell::new(0)));
        let mut map = MapControl::new(small_config());

        assert!(map
            .set_camera_controller(Tracked {
                activated: a1.clone(),
                deactivated: d1.clone(),
            })
            .is_none());
        map.tick(Duration::from_millis(16));
        assert_eq!((a1.get(), d1.get()), (1, 0));

        let previous = map.set_camera_controller(Tracked {
            activated: a2.clone(),
            deactivated: d2.clone(),
        });
        assert!(previous.is_some());
        assert_eq!((a1.get(), d1.get()), (1, 1));
        assert_eq!((a2.get(), d2.get()), (1, 0));

        map.clear_camera_controller();
        assert_eq!(d2.get(), 1);
        assert!(map.clear_camera_controller().is_none());
        assert_eq!(d2.get(), 1);
    }

    #[test]
    fn activation_adopts_controller_camera() {
        let mut map = MapControl::new(small_config().with_scale(0.1));
        map.set_camera_controller(StaticController);
        assert_eq!(map.camera().scale, 1.0);
    }

    #[test]
    fn fly_to_marks_view_as_moving() {
        let mut map = MapControl::new(small_config());
        map.set_camera_controller(FlyToController::new(
            Point::new(80.0, 80.0),
            1.0,
            Duration::from_secs(1),
        ));

        let status = map.tick(Duration::from_millis(100));
        assert!(status.needs_another_tick());
        assert!(map.view().quick_update);

        map.tick(Duration::from_secs(1));
        assert!(!map.view().quick_update);
        assert_eq!(map.camera().center, Point::new(80.0, 80.0));
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[test]
    fn hit_test_uses_tolerance() {
        let mut map = MapControl::new(small_config().with_hit_tolerance(2.0));
        let root = map.tree().root();
        let layer = FeatureLayer::from_features([Feature::new(Geometry::Point(Point::new(51.0, 50.0)))]);
        map.tree_mut()
            .add_layer(root, LayerSettings::new("points"), layer)
            .unwrap();
        map.tick(Duration::ZERO);

        // Screen centre maps to world (50, 50).
        assert_eq!(map.hit_test_at(Point::new(50.0, 50.0)).len(), 1);
        assert!(map.hit_test_at(Point::new(10.0, 10.0)).is_empty());
    }

    #[test]
    fn features_follow_view() {
        let mut map = MapControl::new(small_config());
        let root = map.tree().root();
        let layer = FeatureLayer::from_features([
            Feature::new(Geometry::Point(Point::new(10.0, 10.0))),
            Feature::new(Geometry::Point(Point::new(500.0, 500.0))),
        ]);
        map.tree_mut()
            .add_layer(root, LayerSettings::new("points"), layer)
            .unwrap();
        map.tick(Duration::ZERO);
        assert_eq!(map.features(true).count(), 1);
    }

    // ── Events ───────────────────────────────────────────────────────

    #[test]
    fn resize_updates_viewport() {
        let mut map = MapControl::new(small_config());
        map.dispatch_event(Event::new(EventKind::Resize {
            width: 200,
            height: 50,
        }));
        assert_eq!(map.camera().viewport, Size::new(200.0, 50.0));
    }

    #[test]
    fn events_are_stamped_with_clock() {
        struct Stamp(Option<Duration>);
        impl EventHandler for Stamp {
            fn handle_event(&mut self, event: &Event) -> bool {
                self.0 = Some(event.timestamp);
                true
            }
        }

        let mut map = MapControl::new(small_config());
        let stamp = Rc::new(RefCell::new(Stamp(None)));
        map.subscribe(&stamp);
        map.tick(Duration::from_millis(40));
        map.dispatch_event(Event::key(Key::Enter, Modifiers::empty()));
        assert_eq!(stamp.borrow().0, Some(Duration::from_millis(40)));
    }

    #[test]
    fn installed_navigation_pans_camera() {
        let mut map = MapControl::new(
            small_config()
                .with_world(Rectangle::new(Point::ZERO, Point::new(1000.0, 1000.0)))
                .with_center(Point::new(500.0, 500.0)),
        );
        map.install_navigation();
        assert!(map.has_camera_controller());

        map.dispatch_event(Event::key(Key::Left, Modifiers::empty()));
        let status = map.tick(Duration::from_millis(16));
        assert!(status.camera.was_updated());
        assert_eq!(map.camera().center, Point::new(468.0, 500.0));
    }
}
