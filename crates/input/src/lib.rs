//! Input snapshot and action bindings.
//!
//! # Invariants
//! - Consumers receive an `InputState` by reference; there is no global
//!   input singleton.
//! - Mouse delta accumulates between `end_frame` calls and resets there.
//! - Camera logic reads actions, not keys.

pub mod action;
mod state;

pub use action::{Action, Binding, Key, KeyBindings, MouseButton};
pub use state::InputState;

pub fn crate_info() -> &'static str {
    "orrery-input v0.1.0"
}
