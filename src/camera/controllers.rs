//! Stock camera controllers.

use std::time::Duration;

use tracing::debug;

use super::{Camera, CameraController, CameraStatus};
use crate::animation::Easing;
use crate::geometry::{Point, Rectangle};
use crate::query::ScaleRange;
use crate::tool::{NavigationQueue, NavigationRequest};

// ---------------------------------------------------------------------------
// StaticController
// ---------------------------------------------------------------------------

/// Fits the world on activation and never moves again.
#[derive(Debug, Default)]
pub struct StaticController;

impl CameraController for StaticController {
    fn name(&self) -> &str {
        "static"
    }

    fn on_activated(&mut self, camera: &Camera, world: Rectangle) -> Camera {
        let mut camera = *camera;
        camera.fit(&world);
        camera
    }

    fn update_camera(&mut self, _camera: &mut Camera, _delta: Duration) -> CameraStatus {
        CameraStatus::IDLE
    }
}

// ---------------------------------------------------------------------------
// PanZoomController
// ---------------------------------------------------------------------------

/// Applies navigation requests queued by tools, keeping the view in the world.
#[derive(Debug)]
pub struct PanZoomController {
    queue: NavigationQueue,
    scale_range: ScaleRange,
    world: Option<Rectangle>,
    home: Option<Camera>,
}

impl PanZoomController {
    pub fn new(queue: NavigationQueue) -> Self {
        Self {
            queue,
            scale_range: ScaleRange::FULL,
            world: None,
            home: None,
        }
    }

    /// Limit how far the user can zoom.
    pub fn with_scale_range(mut self, range: ScaleRange) -> Self {
        self.scale_range = range;
        self
    }

    pub fn queue(&self) -> &NavigationQueue {
        &self.queue
    }

    fn apply(&self, camera: &mut Camera, request: NavigationRequest) {
        match request {
            NavigationRequest::Pan { dx, dy } => camera.pan_pixels(dx, dy),
            NavigationRequest::ZoomBy { factor, anchor } => {
                if !factor.is_finite() || factor <= 0.0 {
                    return;
                }
                let target = (camera.scale / factor)
                    .max(self.scale_range.min())
                    .min(self.scale_range.max());
                if target <= 0.0 {
                    return;
                }
                let anchor = anchor.unwrap_or(Point::new(camera.viewport.width / 2.0, camera.viewport.height / 2.0));
                camera.zoom_at(anchor, camera.scale / target);
            }
            NavigationRequest::Reset => {
                if let Some(home) = self.home {
                    camera.center = home.center;
                    camera.scale = home.scale;
                    camera.rotation = home.rotation;
                }
            }
        }
    }
}

impl CameraController for PanZoomController {
    fn name(&self) -> &str {
        "pan-zoom"
    }

    fn on_activated(&mut self, camera: &Camera, world: Rectangle) -> Camera {
        let mut camera = *camera;
        camera.clamp_to(&world);
        self.world = Some(world);
        self.home = Some(camera);
        camera
    }

    fn on_deactivated(&mut self) {
        let dropped = self.queue.drain().len();
        if dropped > 0 {
            debug!(dropped, "discarding navigation requests on deactivation");
        }
        self.world = None;
        self.home = None;
    }

    fn update_camera(&mut self, camera: &mut Camera, _delta: Duration) -> CameraStatus {
        let requests = self.queue.drain();
        if requests.is_empty() {
            return CameraStatus::IDLE;
        }
        let before = *camera;
        for request in requests {
            self.apply(camera, request);
        }
        if let Some(world) = &self.world {
            camera.clamp_to(world);
        }
        if *camera == before {
            CameraStatus::IDLE
        } else {
            CameraStatus::UPDATED
        }
    }
}

// ---------------------------------------------------------------------------
// FlyToController
// ---------------------------------------------------------------------------

/// Flies from wherever the camera is to a target centre and scale.
///
/// Scale is interpolated geometrically so zooming feels even at every level.
#[derive(Debug)]
pub struct FlyToController {
    target_center: Point,
    target_scale: f64,
    duration: Duration,
    easing: Easing,
    from: Option<Camera>,
    elapsed: Duration,
    arrived: bool,
}

impl FlyToController {
    pub fn new(center: Point, scale: f64, duration: Duration) -> Self {
        Self {
            target_center: center,
            target_scale: scale,
            duration,
            easing: Easing::EaseInOut,
            from: None,
            elapsed: Duration::ZERO,
            arrived: false,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn is_arrived(&self) -> bool {
        self.arrived
    }

    fn scale_at(&self, from: f64, progress: f64) -> f64 {
        if from > 0.0 && self.target_scale > 0.0 {
            from * (self.target_scale / from).powf(progress)
        } else {
            from + (self.target_scale - from) * progress
        }
    }
}

impl CameraController for FlyToController {
    fn name(&self) -> &str {
        "fly-to"
    }

    fn on_activated(&mut self, camera: &Camera, _world: Rectangle) -> Camera {
        self.from = Some(*camera);
        self.elapsed = Duration::ZERO;
        self.arrived = false;
        *camera
    }

    fn on_deactivated(&mut self) {
        self.from = None;
    }

    fn update_camera(&mut self, camera: &mut Camera, delta: Duration) -> CameraStatus {
        let Some(from) = self.from else {
            return CameraStatus::IDLE;
        };
        if self.arrived {
            return CameraStatus::IDLE;
        }

        self.elapsed += delta;
        let t = if self.duration.is_zero() {
            1.0
        } else {
            (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
        };

        if t >= 1.0 {
            camera.center = self.target_center;
            camera.scale = self.target_scale;
            self.arrived = true;
            debug!(center = ?camera.center, scale = camera.scale, "fly-to arrived");
            return CameraStatus::UPDATED;
        }

        let progress = self.easing.apply(t);
        camera.center = from.center.lerp(self.target_center, progress);
        camera.scale = self.scale_at(from.scale, progress);
        CameraStatus::UPDATED | CameraStatus::NEEDS_UPDATE
    }
}

// ===========================================================================
// Tests
// ===========================================================================
