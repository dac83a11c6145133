//! Tools: event handlers that turn raw input into navigation requests.
//!
//! Tools never touch the camera directly. They push [`NavigationRequest`]s
//! onto a shared [`NavigationQueue`] that a camera controller drains on its
//! next update.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::event::{
    Event, EventHandler, EventKind, EventManager, Key, KeyBindingRegistry, Modifiers, MouseAction, MouseButton,
    SubscriptionId,
};
use crate::geometry::Point;

/// Screen pixels moved per arrow key press.
pub const KEY_PAN_STEP: f64 = 32.0;

/// Zoom factor per scroll notch or `+` press.
pub const ZOOM_STEP: f64 = 1.25;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A camera change asked for by a tool.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationRequest {
    /// Shift the content by screen pixels, as a drag would.
    Pan { dx: f64, dy: f64 },
    /// Zoom in (`factor > 1`) or out about `anchor`, or the viewport centre.
    ZoomBy { factor: f64, anchor: Option<Point> },
    /// Return to the camera the controller was activated with.
    Reset,
}

/// Single-threaded queue shared between tools and a controller.
#[derive(Debug, Clone, Default)]
pub struct NavigationQueue {
    inner: Rc<RefCell<VecDeque<NavigationRequest>>>,
}

impl NavigationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, request: NavigationRequest) {
        self.inner.borrow_mut().push_back(request);
    }

    /// Take every queued request, oldest first.
    pub fn drain(&self) -> Vec<NavigationRequest> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// An [`EventHandler`] with a user-facing name.
pub trait Tool: EventHandler {
    fn name(&self) -> &str;
}

/// Left-drag pans the map.
#[derive(Debug)]
pub struct PanTool {
    queue: NavigationQueue,
    button: MouseButton,
    last: Option<Point>,
}

impl PanTool {
    pub fn new(queue: NavigationQueue) -> Self {
        Self {
            queue,
            button: MouseButton::Left,
            last: None,
        }
    }

    pub fn with_button(mut self, button: MouseButton) -> Self {
        self.button = button;
        self
    }

    pub fn is_dragging(&self) -> bool {
        self.last.is_some()
    }
}

impl EventHandler for PanTool {
    fn handle_event(&mut self, event: &Event) -> bool {
        let Some(mouse) = event.as_mouse() else {
            return false;
        };
        match mouse.action {
            // Presses pass through so click handlers further down still see them.
            MouseAction::Down(b) if b == self.button => {
                self.last = Some(mouse.position);
                false
            }
            MouseAction::Drag(b) if b == self.button => {
                let from = self.last.unwrap_or(mouse.position);
                let delta = mouse.position - from;
                self.last = Some(mouse.position);
                if delta != Point::ZERO {
                    self.queue.push(NavigationRequest::Pan {
                        dx: delta.x,
                        dy: delta.y,
                    });
                }
                true
            }
            MouseAction::Up(b) if b == self.button => {
                self.last = None;
                false
            }
            _ => false,
        }
    }
}

impl Tool for PanTool {
    fn name(&self) -> &str {
        "pan"
    }
}

/// Scrolling zooms about the pointer.
#[derive(Debug)]
pub struct ZoomTool {
    queue: NavigationQueue,
    step: f64,
}

impl ZoomTool {
    pub fn new(queue: NavigationQueue) -> Self {
        Self { queue, step: ZOOM_STEP }
    }

    /// Zoom factor per scroll notch. Values at or below 1 are ignored.
    pub fn with_step(mut self, step: f64) -> Self {
        if step > 1.0 {
            self.step = step;
        }
        self
    }
}

impl EventHandler for ZoomTool {
    fn handle_event(&mut self, event: &Event) -> bool {
        let Some(mouse) = event.as_mouse() else {
            return false;
        };
        let factor = match mouse.action {
            MouseAction::ScrollUp => self.step,
            MouseAction::ScrollDown => 1.0 / self.step,
            _ => return false,
        };
        self.queue.push(NavigationRequest::ZoomBy {
            factor,
            anchor: Some(mouse.position),
        });
        true
    }
}

impl Tool for ZoomTool {
    fn name(&self) -> &str {
        "zoom"
    }
}

impl KeyBindingRegistry<NavigationRequest> {
    /// Arrows pan, `+`/`=` and `-` zoom, `0` and Home reset.
    pub fn with_navigation_defaults() -> Self {
        let mut registry = Self::new();
        let none = Modifiers::empty();
        registry.bind(Key::Left, none, NavigationRequest::Pan { dx: KEY_PAN_STEP, dy: 0.0 });
        registry.bind(Key::Right, none, NavigationRequest::Pan { dx: -KEY_PAN_STEP, dy: 0.0 });
        registry.bind(Key::Up, none, NavigationRequest::Pan { dx: 0.0, dy: KEY_PAN_STEP });
        registry.bind(Key::Down, none, NavigationRequest::Pan { dx: 0.0, dy: -KEY_PAN_STEP });
        let zoom_in = NavigationRequest::ZoomBy {
            factor: ZOOM_STEP,
            anchor: None,
        };
        registry.bind(Key::Char('+'), none, zoom_in);
        registry.bind(Key::Char('+'), Modifiers::SHIFT, zoom_in);
        registry.bind(Key::Char('='), none, zoom_in);
        registry.bind(
            Key::Char('-'),
            none,
            NavigationRequest::ZoomBy {
                factor: 1.0 / ZOOM_STEP,
                anchor: None,
            },
        );
        registry.bind(Key::Char('0'), none, NavigationRequest::Reset);
        registry.bind(Key::Home, none, NavigationRequest::Reset);
        registry
    }
}

/// Resolves key presses through a binding registry.
#[derive(Debug)]
pub struct KeyboardNavigationTool {
    queue: NavigationQueue,
    bindings: KeyBindingRegistry<NavigationRequest>,
}

impl KeyboardNavigationTool {
    pub fn new(queue: NavigationQueue) -> Self {
        Self {
            queue,
            bindings: KeyBindingRegistry::with_navigation_defaults(),
        }
    }

    pub fn with_bindings(mut self, bindings: KeyBindingRegistry<NavigationRequest>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn bindings_mut(&mut self) -> &mut KeyBindingRegistry<NavigationRequest> {
        &mut self.bindings
    }
}

impl EventHandler for KeyboardNavigationTool {
    fn handle_event(&mut self, event: &Event) -> bool {
        let EventKind::Key(key) = &event.kind else {
            return false;
        };
        match self.bindings.resolve(key) {
            Some(request) => {
                self.queue.push(*request);
                true
            }
            None => false,
        }
    }
}

impl Tool for KeyboardNavigationTool {
    fn name(&self) -> &str {
        "keyboard-navigation"
    }
}

// ---------------------------------------------------------------------------
// NavigationTools
// ---------------------------------------------------------------------------

/// The standard tool set sharing one queue.
///
/// Dispatchers hold tools weakly, so this bundle is what keeps them alive.
pub struct NavigationTools {
    pub queue: NavigationQueue,
    pub pan: Rc<RefCell<PanTool>>,
    pub zoom: Rc<RefCell<ZoomTool>>,
    pub keyboard: Rc<RefCell<KeyboardNavigationTool>>,
}

impl NavigationTools {
    pub fn new(queue: NavigationQueue) -> Self {
        Self {
            pan: Rc::new(RefCell::new(PanTool::new(queue.clone()))),
            zoom: Rc::new(RefCell::new(ZoomTool::new(queue.clone()))),
            keyboard: Rc::new(RefCell::new(KeyboardNavigationTool::new(queue.clone()))),
            queue,
        }
    }

    /// Subscribe all three tools, pan first.
    pub fn subscribe(&self, events: &mut EventManager) -> [SubscriptionId; 3] {
        [
            events.subscribe(&self.pan),
            events.subscribe(&self.zoom),
            events.subscribe(&self.keyboard),
        ]
    }
}

// ===========================================================================
// Tests
// ===========================================================================
