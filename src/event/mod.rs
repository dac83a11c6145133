//! Event system: input events, key bindings, dispatch.

pub mod binding;
pub mod handler;
pub mod input;
pub mod manager;

pub use binding::KeyBindingRegistry;
pub use handler::{DispatchOutcome, EventDispatcher, EventHandler, SharedHandler, SubscriptionId};
pub use input::{Event, EventKind, Key, KeyEvent, Modifiers, MouseAction, MouseButton, MouseEvent};
pub use manager::EventManager;
