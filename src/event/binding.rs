//! Key binding registry and resolution.
//!
//! [`KeyBindingRegistry`] maps key+modifier combinations to an action type
//! chosen by the caller. Tools use it to turn keys into navigation requests.

use std::collections::HashMap;

use super::input::{Key, KeyEvent, Modifiers};

/// Registry of key bindings, mapping (Key, Modifiers) -> action.
#[derive(Debug, Clone)]
pub struct KeyBindingRegistry<A> {
    bindings: HashMap<(Key, Modifiers), A>,
}

impl<A> KeyBindingRegistry<A> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Register a key binding, replacing any existing one for the combination.
    pub fn bind(&mut self, key: Key, modifiers: Modifiers, action: A) {
        self.bindings.insert((key, modifiers), action);
    }

    /// Remove a key binding, returning its action.
    pub fn unbind(&mut self, key: Key, modifiers: Modifiers) -> Option<A> {
        self.bindings.remove(&(key, modifiers))
    }

    /// Look up the action for a key event. Modifiers must match exactly.
    pub fn resolve(&self, event: &KeyEvent) -> Option<&A> {
        self.bindings.get(&(event.code, event.modifiers))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<A> Default for KeyBindingRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Quit,
        Named(&'static str),
    }

    // ── Construction ─────────────────────────────────────────────────

    #[test]
    fn new_registry_is_empty() {
        let reg = KeyBindingRegistry::<Action>::new();
        assert!(reg.is_empty());
        assert_eq!(reg.len(), 0);
    }

    // ── Bind / Unbind ────────────────────────────────────────────────

    #[test]
    fn bind_and_resolve() {
        let mut reg = KeyBindingRegistry::new();
        reg.bind(Key::Char('q'), Modifiers::empty(), Action::Quit);

        let event = KeyEvent::new(Key::Char('q'), Modifiers::empty());
        assert_eq!(reg.resolve(&event), Some(&Action::Quit));
    }

    #[test]
    fn resolve_wrong_modifiers() {
        let mut reg = KeyBindingRegistry::new();
        reg.bind(Key::Char('q'), Modifiers::CTRL, Action::Quit);

        // Without Ctrl: no match.
        let event = KeyEvent::new(Key::Char('q'), Modifiers::empty());
        assert!(reg.resolve(&event).is_none());

        let event = KeyEvent::new(Key::Char('q'), Modifiers::CTRL);
        assert!(reg.resolve(&event).is_some());
    }

    #[test]
    fn unbind_removes_binding() {
        let mut reg = KeyBindingRegistry::new();
        reg.bind(Key::Char('q'), Modifiers::empty(), Action::Quit);
        assert_eq!(reg.unbind(Key::Char('q'), Modifiers::empty()), Some(Action::Quit));
        assert!(reg.is_empty());
        assert_eq!(reg.unbind(Key::Char('q'), Modifiers::empty()), None);
    }

    #[test]
    fn bind_overwrites_existing() {
        let mut reg = KeyBindingRegistry::new();
        reg.bind(Key::Char('q'), Modifiers::empty(), Action::Named("first"));
        reg.bind(Key::Char('q'), Modifiers::empty(), Action::Named("second"));
        assert_eq!(reg.len(), 1);

        let event = KeyEvent::new(Key::Char('q'), Modifiers::empty());
        assert_eq!(reg.resolve(&event), Some(&Action::Named("second")));
    }
}
