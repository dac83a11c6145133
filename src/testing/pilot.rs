//! MapPilot: programmatic interaction with a headless map.
//!
//! The `MapPilot` wraps a [`MapControl`] and provides methods to simulate
//! user input (clicks, drags, scrolling, key presses) and to run frames.

use std::time::Duration;

use crate::event::{DispatchOutcome, Event, EventKind, Key, Modifiers, MouseAction, MouseButton};
use crate::geometry::{Point, Size};
use crate::layer::PresentationObject;
use crate::map::{FrameStatus, MapConfig, MapControl};

/// Frame length used by [`MapPilot::run_until_idle`].
pub const FRAME: Duration = Duration::from_millis(16);

// ---------------------------------------------------------------------------
// MapPilot
// ---------------------------------------------------------------------------

/// A headless map driver for testing.
///
/// # Examples
///
/// ```
/// use strata::geometry::Point;
/// use strata::map::MapConfig;
/// use strata::testing::MapPilot;
///
/// let mut pilot = MapPilot::new(MapConfig::default()).with_navigation();
/// pilot.scroll_up(Point::new(400.0, 300.0));
/// let status = pilot.tick();
/// assert!(status.camera.was_updated());
/// ```
pub struct MapPilot {
    map: MapControl,
}

impl MapPilot {
    pub fn new(config: MapConfig) -> Self {
        Self {
            map: MapControl::new(config),
        }
    }

    /// Wrap an existing map.
    pub fn from_map(map: MapControl) -> Self {
        Self { map }
    }

    /// Install the standard navigation tools (builder).
    pub fn with_navigation(mut self) -> Self {
        self.map.install_navigation();
        self
    }

    // ── Input simulation ─────────────────────────────────────────────

    /// Dispatch an arbitrary event.
    pub fn send(&mut self, event: Event) -> DispatchOutcome {
        self.map.dispatch_event(event)
    }

    fn mouse(&mut self, action: MouseAction, at: Point) -> DispatchOutcome {
        self.send(Event::mouse(action, at))
    }

    /// Press and release the left button at `at`, then hit-test there.
    pub fn click(&mut self, at: Point) -> Vec<PresentationObject> {
        self.mouse(MouseAction::Down(MouseButton::Left), at);
        self.mouse(MouseAction::Up(MouseButton::Left), at);
        self.map.hit_test_at(at)
    }

    /// Left-drag from `from` to `to` in `steps` equal moves.
    pub fn drag(&mut self, from: Point, to: Point, steps: u32) {
        let steps = steps.max(1);
        self.mouse(MouseAction::Down(MouseButton::Left), from);
        for i in 1..=steps {
            let at = from.lerp(to, f64::from(i) / f64::from(steps));
            self.mouse(MouseAction::Drag(MouseButton::Left), at);
        }
        self.mouse(MouseAction::Up(MouseButton::Left), to);
    }

    pub fn scroll_up(&mut self, at: Point) -> DispatchOutcome {
        self.mouse(MouseAction::ScrollUp, at)
    }

    pub fn scroll_down(&mut self, at: Point) -> DispatchOutcome {
        self.mouse(MouseAction::ScrollDown, at)
    }

    /// Simulate a key press with no modifiers.
    pub fn press_key(&mut self, key: Key) -> DispatchOutcome {
        self.press_key_with(key, Modifiers::empty())
    }

    pub fn press_key_with(&mut self, key: Key, modifiers: Modifiers) -> DispatchOutcome {
        self.send(Event::key(key, modifiers))
    }

    pub fn resize(&mut self, width: u16, height: u16) -> DispatchOutcome {
        self.send(Event::new(EventKind::Resize { width, height }))
    }

    // ── Frames ───────────────────────────────────────────────────────

    /// Run one frame of [`FRAME`] length.
    pub fn tick(&mut self) -> FrameStatus {
        self.map.tick(FRAME)
    }

    pub fn tick_by(&mut self, delta: Duration) -> FrameStatus {
        self.map.tick(delta)
    }

    /// Tick until a frame no longer asks for another, at most `max_ticks`
    /// times. Returns the number of ticks run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        for ran in 1..=max_ticks {
            if !self.tick().needs_another_tick() {
                return ran;
            }
        }
        max_ticks
    }

    // ── Query ────────────────────────────────────────────────────────

    pub fn map(&self) -> &MapControl {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut MapControl {
        &mut self.map
    }

    pub fn viewport(&self) -> Size {
        self.map.camera().viewport
    }
}

// ===========================================================================
// Tests
// ===========================================================================
