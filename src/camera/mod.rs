//! Camera state and the controller contract.
//!
//! [`Camera`] converts between screen pixels and world units. A
//! [`CameraController`] owns how the camera moves: the map polls the active
//! controller once per tick and reads the returned [`CameraStatus`] to decide
//! whether to redraw and whether to tick again.

pub mod controllers;

use std::time::Duration;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rectangle, Size};
use crate::query::FeatureQuery;

pub use controllers::{FlyToController, PanZoomController, StaticController};

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// A 2D camera.
///
/// `scale` is world units per screen pixel, so larger scales show more of the
/// world. Screen space has its origin at the top-left with y pointing down;
/// world space has y pointing up. `rotation` is counter-clockwise in radians.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Point,
    pub scale: f64,
    pub viewport: Size,
    pub rotation: f64,
}

impl Camera {
    pub fn new(center: Point, scale: f64, viewport: Size) -> Self {
        Self {
            center,
            scale,
            viewport,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, radians: f64) -> Self {
        self.rotation = radians;
        self
    }

    fn half_viewport(&self) -> Point {
        Point::new(self.viewport.width / 2.0, self.viewport.height / 2.0)
    }

    /// World-space axis-aligned bounds of everything on screen.
    pub fn view_bounds(&self) -> Rectangle {
        if self.rotation == 0.0 {
            return Rectangle::from_center_size(self.center, self.viewport * self.scale);
        }
        let (w, h) = (self.viewport.width, self.viewport.height);
        let corners = [
            self.screen_to_world(Point::ZERO),
            self.screen_to_world(Point::new(w, 0.0)),
            self.screen_to_world(Point::new(w, h)),
            self.screen_to_world(Point::new(0.0, h)),
        ];
        Rectangle::from_points(&corners).unwrap_or(Rectangle::new(self.center, self.center))
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        let half = self.half_viewport();
        let offset = Point::new((screen.x - half.x) * self.scale, (half.y - screen.y) * self.scale);
        self.center + offset.rotate(self.rotation)
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        let half = self.half_viewport();
        let offset = (world - self.center).rotate(-self.rotation);
        Point::new(half.x + offset.x / self.scale, half.y - offset.y / self.scale)
    }

    /// Shift the content by `(dx, dy)` screen pixels, as a drag would.
    pub fn pan_pixels(&mut self, dx: f64, dy: f64) {
        let half = self.half_viewport();
        self.center = self.screen_to_world(Point::new(half.x - dx, half.y - dy));
    }

    /// Zoom by `factor` (greater than 1 zooms in) keeping the world point
    /// under `anchor` fixed on screen. Non-positive or non-finite factors are
    /// ignored.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let before = self.screen_to_world(anchor);
        self.scale /= factor;
        let after = self.screen_to_world(anchor);
        self.center = self.center + (before - after);
    }

    /// Move the centre so the view stays inside `world`. An axis on which
    /// the view is larger than the world is centred instead. Returns whether
    /// the camera moved.
    pub fn clamp_to(&mut self, world: &Rectangle) -> bool {
        let view = self.view_bounds();
        let before = self.center;
        self.center.x = clamp_axis(self.center.x, view.min.x, view.max.x, world.min.x, world.max.x);
        self.center.y = clamp_axis(self.center.y, view.min.y, view.max.y, world.min.y, world.max.y);
        self.center != before
    }

    /// Centre on `world` and pick the scale that shows all of it.
    pub fn fit(&mut self, world: &Rectangle) {
        self.center = world.center();
        if self.viewport.is_empty() {
            return;
        }
        let scale = (world.width() / self.viewport.width).max(world.height() / self.viewport.height);
        if scale > 0.0 && scale.is_finite() {
            self.scale = scale;
        }
    }

    /// The query describing what this camera shows.
    pub fn query(&self, quick_update: bool) -> FeatureQuery {
        FeatureQuery::new(self.scale, self.view_bounds()).quick(quick_update)
    }
}

fn clamp_axis(center: f64, view_min: f64, view_max: f64, world_min: f64, world_max: f64) -> f64 {
    if view_max - view_min >= world_max - world_min {
        (world_min + world_max) / 2.0
    } else if view_min < world_min {
        center + (world_min - view_min)
    } else if view_max > world_max {
        center - (view_max - world_max)
    } else {
        center
    }
}

// ---------------------------------------------------------------------------
// CameraStatus
// ---------------------------------------------------------------------------

bitflags! {
    /// What a controller did during one update. Bits combine freely.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CameraStatus: u8 {
        /// The camera changed this tick.
        const UPDATED = 1 << 0;
        /// Tick again even without new input.
        const NEEDS_UPDATE = 1 << 1;
    }
}

impl CameraStatus {
    /// Nothing changed and nothing is pending.
    pub const IDLE: Self = Self::empty();

    pub fn was_updated(self) -> bool {
        self.contains(Self::UPDATED)
    }

    pub fn needs_another_update(self) -> bool {
        self.contains(Self::NEEDS_UPDATE)
    }

    pub fn is_idle(self) -> bool {
        self.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CameraController
// ---------------------------------------------------------------------------

/// A pluggable camera behaviour.
///
/// The map calls [`on_activated`](Self::on_activated) exactly once when the
/// controller becomes active, [`update_camera`](Self::update_camera) once per
/// tick while it stays active, and [`on_deactivated`](Self::on_deactivated)
/// exactly once when another controller replaces it.
pub trait CameraController {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Returns the camera the map should adopt.
    fn on_activated(&mut self, camera: &Camera, world: Rectangle) -> Camera {
        let _ = world;
        *camera
    }

    /// Release anything held for the active period.
    fn on_deactivated(&mut self) {}

    fn update_camera(&mut self, camera: &mut Camera, delta: Duration) -> CameraStatus;
}

// ===========================================================================
// Tests
// ===========================================================================
