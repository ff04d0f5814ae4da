//! Key event dispatch
//!
//! Bridges the hotkey listener and the slot store:
//! raw key event -> decode -> resolve -> slot operation -> consumed?

mod dispatcher;

pub use dispatcher::Dispatcher;
