//! Process lifecycle: shutdown and reload signals

mod signals;

pub use signals::{ControlSignal, Signals};
