use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend-neutral keyboard key.
///
/// Window backends translate their own key codes into this set; keys with
/// no counterpart here are dropped before they reach the input state.
#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Space,
    Control,
    Shift,
    Escape,
    Tab,
    Enter,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// A physical input that can trigger an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Binding {
    Key(Key),
    Mouse(MouseButton),
}

/// A high-level action the renderer reacts to.
///
/// Camera and application logic consume actions, never raw key codes, so
/// rebinding never touches the camera code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Move along the camera's own +Z axis.
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    /// Move along world +Y.
    MoveUp,
    MoveDown,
    /// While held, mouse motion turns the camera.
    Look,
    Quit,
    /// Pause or resume the orbit animation.
    ToggleOrbit,
}

/// Action to binding table. An action may have several bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    bindings: BTreeMap<Action, Vec<Binding>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();
        bindings.bind(Action::MoveForward, Binding::Key(Key::W));
        bindings.bind(Action::MoveBackward, Binding::Key(Key::S));
        bindings.bind(Action::MoveLeft, Binding::Key(Key::A));
        bindings.bind(Action::MoveRight, Binding::Key(Key::D));
        bindings.bind(Action::MoveUp, Binding::Key(Key::Space));
        bindings.bind(Action::MoveDown, Binding::Key(Key::Control));
        bindings.bind(Action::Look, Binding::Mouse(MouseButton::Left));
        bindings.bind(Action::Quit, Binding::Key(Key::Escape));
        bindings.bind(Action::ToggleOrbit, Binding::Key(Key::P));
        bindings
    }
}

impl KeyBindings {
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Add a binding for an action. Duplicate bindings are ignored.
    pub fn bind(&mut self, action: Action, binding: Binding) {
        let entry = self.bindings.entry(action).or_default();
        if !entry.contains(&binding) {
            entry.push(binding);
        }
    }

    /// Remove every binding of an action.
    pub fn unbind(&mut self, action: Action) {
        self.bindings.remove(&action);
    }

    pub fn bindings_for(&self, action: Action) -> &[Binding] {
        self.bindings.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }
}
