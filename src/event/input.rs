//! Input event types, decoupled from crossterm.
//!
//! Defines [`Event`] and its payloads. Crossterm events are converted via
//! `From` impls so handlers never depend on the host's input crate.

use std::time::Duration;

use bitflags::bitflags;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Point;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// Keyboard key.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    BackTab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
    /// A key with no mapping here (media keys, lone modifiers, ...).
    Unknown,
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

bitflags! {
    /// Modifier keys held during an event.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
    }
}

// ---------------------------------------------------------------------------
// KeyEvent / MouseEvent
// ---------------------------------------------------------------------------

/// A key press with modifiers.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: Key, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseAction {
    Down(MouseButton),
    Up(MouseButton),
    Drag(MouseButton),
    Moved,
    ScrollUp,
    ScrollDown,
}

/// A pointer event. `position` is in screen pixels, origin top-left.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub action: MouseAction,
    pub position: Point,
    pub modifiers: Modifiers,
}

impl MouseEvent {
    pub fn new(action: MouseAction, position: Point) -> Self {
        Self {
            action,
            position,
            modifiers: Modifiers::empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// What happened.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Resize { width: u16, height: u16 },
    FocusGained,
    FocusLost,
    Paste(String),
}

/// An input event stamped with the time it was dispatched.
///
/// The timestamp is set by [`EventManager`](super::EventManager) at dispatch;
/// until then it is zero.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub timestamp: Duration,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            timestamp: Duration::ZERO,
        }
    }

    /// A key press.
    pub fn key(code: Key, modifiers: Modifiers) -> Self {
        Self::new(EventKind::Key(KeyEvent::new(code, modifiers)))
    }

    /// A pointer event without modifiers.
    pub fn mouse(action: MouseAction, position: Point) -> Self {
        Self::new(EventKind::Mouse(MouseEvent::new(action, position)))
    }

    pub fn as_key(&self) -> Option<&KeyEvent> {
        match &self.kind {
            EventKind::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn as_mouse(&self) -> Option<&MouseEvent> {
        match &self.kind {
            EventKind::Mouse(mouse) => Some(mouse),
            _ => None,
        }
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Event::new(kind)
    }
}

// ---------------------------------------------------------------------------
// From<crossterm> conversions
// ---------------------------------------------------------------------------

fn convert_modifiers(m: crossterm::event::KeyModifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, m.contains(crossterm::event::KeyModifiers::SHIFT));
    out.set(Modifiers::CTRL, m.contains(crossterm::event::KeyModifiers::CONTROL));
    out.set(Modifiers::ALT, m.contains(crossterm::event::KeyModifiers::ALT));
    out
}

fn convert_mouse_button(b: crossterm::event::MouseButton) -> MouseButton {
    match b {
        crossterm::event::MouseButton::Left => MouseButton::Left,
        crossterm::event::MouseButton::Right => MouseButton::Right,
        crossterm::event::MouseButton::Middle => MouseButton::Middle,
    }
}

impl From<crossterm::event::KeyEvent> for KeyEvent {
    fn from(ct: crossterm::event::KeyEvent) -> Self {
        let code = match ct.code {
            crossterm::event::KeyCode::Char(c) => Key::Char(c),
            crossterm::event::KeyCode::Enter => Key::Enter,
            crossterm::event::KeyCode::Esc => Key::Escape,
            crossterm::event::KeyCode::Tab => Key::Tab,
            crossterm::event::KeyCode::BackTab => Key::BackTab,
            crossterm::event::KeyCode::Backspace => Key::Backspace,
            crossterm::event::KeyCode::Delete => Key::Delete,
            crossterm::event::KeyCode::Left => Key::Left,
            crossterm::event::KeyCode::Right => Key::Right,
            crossterm::event::KeyCode::Up => Key::Up,
            crossterm::event::KeyCode::Down => Key::Down,
            crossterm::event::KeyCode::Home => Key::Home,
            crossterm::event::KeyCode::End => Key::End,
            crossterm::event::KeyCode::PageUp => Key::PageUp,
            crossterm::event::KeyCode::PageDown => Key::PageDown,
            crossterm::event::KeyCode::F(n) => Key::F(n),
            _ => Key::Unknown,
        };
        KeyEvent::new(code, convert_modifiers(ct.modifiers))
    }
}

impl From<crossterm::event::MouseEvent> for MouseEvent {
    fn from(me: crossterm::event::MouseEvent) -> Self {
        let action = match me.kind {
            crossterm::event::MouseEventKind::Down(b) => MouseAction::Down(convert_mouse_button(b)),
            crossterm::event::MouseEventKind::Up(b) => MouseAction::Up(convert_mouse_button(b)),
            crossterm::event::MouseEventKind::Drag(b) => MouseAction::Drag(convert_mouse_button(b)),
            crossterm::event::MouseEventKind::ScrollUp => MouseAction::ScrollUp,
            crossterm::event::MouseEventKind::ScrollDown => MouseAction::ScrollDown,
            // Horizontal scrolling carries no map gesture; keep the position.
            _ => MouseAction::Moved,
        };
        MouseEvent {
            action,
            position: Point::new(f64::from(me.column), f64::from(me.row)),
            modifiers: convert_modifiers(me.modifiers),
        }
    }
}

impl From<crossterm::event::Event> for EventKind {
    fn from(ct: crossterm::event::Event) -> Self {
        match ct {
            crossterm::event::Event::Key(ke) => EventKind::Key(KeyEvent::from(ke)),
            crossterm::event::Event::Mouse(me) => EventKind::Mouse(MouseEvent::from(me)),
            crossterm::event::Event::Resize(width, height) => EventKind::Resize { width, height },
            crossterm::event::Event::FocusGained => EventKind::FocusGained,
            crossterm::event::Event::FocusLost => EventKind::FocusLost,
            crossterm::event::Event::Paste(s) => EventKind::Paste(s),
        }
    }
}

impl From<crossterm::event::Event> for Event {
    fn from(ct: crossterm::event::Event) -> Self {
        Event::new(EventKind::from(ct))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
