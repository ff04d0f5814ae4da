//! Hotkey module for global keyboard event listening
//!
//! Uses macOS CGEventTap to observe key-down events and suppress the ones
//! that resolve to a slot binding.

pub mod keys;
mod listener;

pub use keys::{decode, DecodedKey, KeyToken, ModifierState};
pub use listener::{EventKind, HotkeyEvent, HotkeyListener, RawKeyEvent};
