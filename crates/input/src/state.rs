use crate::action::{Action, Binding, Key, KeyBindings, MouseButton};
use glam::Vec2;
use std::collections::BTreeSet;

/// Per-frame input snapshot fed by the window backend.
///
/// Backends push events (`key_pressed`, `mouse_moved`, ...) as they arrive;
/// consumers query the snapshot during update; the frame loop calls
/// [`InputState::end_frame`] after update to reset per-frame data.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    bindings: KeyBindings,
    keys_held: BTreeSet<Key>,
    keys_pressed: BTreeSet<Key>,
    buttons_held: BTreeSet<MouseButton>,
    buttons_pressed: BTreeSet<MouseButton>,
    mouse_delta: Vec2,
}

impl InputState {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn key_pressed(&mut self, key: Key) {
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn key_released(&mut self, key: Key) {
        self.keys_held.remove(&key);
    }

    pub fn mouse_button_pressed(&mut self, button: MouseButton) {
        if self.buttons_held.insert(button) {
            self.buttons_pressed.insert(button);
        }
    }

    pub fn mouse_button_released(&mut self, button: MouseButton) {
        self.buttons_held.remove(&button);
    }

    /// Accumulate raw mouse motion for this frame.
    pub fn mouse_moved(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys_held.clear();
        self.buttons_held.clear();
        self.end_frame();
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons_held.contains(&button)
    }

    /// Mouse motion accumulated since the last `end_frame`.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// True while any binding of the action is held.
    pub fn action_down(&self, action: Action) -> bool {
        self.bindings
            .bindings_for(action)
            .iter()
            .any(|binding| match *binding {
                Binding::Key(key) => self.keys_held.contains(&key),
                Binding::Mouse(button) => self.buttons_held.contains(&button),
            })
    }

    /// True if any binding of the action went down during this frame.
    pub fn action_triggered(&self, action: Action) -> bool {
        self.bindings
            .bindings_for(action)
            .iter()
            .any(|binding| match *binding {
                Binding::Key(key) => self.keys_pressed.contains(&key),
                Binding::Mouse(button) => self.buttons_pressed.contains(&button),
            })
    }

    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_keys_map_to_actions() {
        let mut input = InputState::new(KeyBindings::default());
        assert!(!input.action_down(Action::MoveForward));
        input.key_pressed(Key::W);
        assert!(input.key_down(Key::W));
        assert!(input.action_down(Action::MoveForward));
        input.key_released(Key::W);
        assert!(!input.action_down(Action::MoveForward));
    }

    #[test]
    fn mouse_button_drives_look() {
        let mut input = InputState::new(KeyBindings::default());
        input.mouse_button_pressed(MouseButton::Left);
        assert!(input.mouse_button_down(MouseButton::Left));
        assert!(input.action_down(Action::Look));
    }

    #[test]
    fn end_frame_resets_delta_but_keeps_held_keys() {
        let mut input = InputState::new(KeyBindings::default());
        input.key_pressed(Key::D);
        input.mouse_moved(3.0, -1.0);
        input.mouse_moved(2.0, 4.0);
        assert_eq!(input.mouse_delta(), Vec2::new(5.0, 3.0));

        input.end_frame();
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
        assert!(input.action_down(Action::MoveRight));
    }

    #[test]
    fn trigger_fires_once_per_press() {
        let mut input = InputState::new(KeyBindings::default());
        input.key_pressed(Key::P);
        assert!(input.action_triggered(Action::ToggleOrbit));

        // Key repeat while held does not retrigger.
        input.end_frame();
        input.key_pressed(Key::P);
        assert!(!input.action_triggered(Action::ToggleOrbit));

        input.key_released(Key::P);
        input.key_pressed(Key::P);
        assert!(input.action_triggered(Action::ToggleOrbit));
    }

    #[test]
    fn clear_releases_everything() {
        let mut input = InputState::new(KeyBindings::default());
        input.key_pressed(Key::Space);
        input.mouse_button_pressed(MouseButton::Left);
        input.mouse_moved(1.0, 1.0);
        input.clear();
        assert!(!input.action_down(Action::MoveUp));
        assert!(!input.action_down(Action::Look));
        assert_eq!(input.mouse_delta(), Vec2::ZERO);
    }
}
