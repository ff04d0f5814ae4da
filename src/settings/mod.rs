//! Persistent key binding settings

mod store;

pub use store::SettingsStore;
