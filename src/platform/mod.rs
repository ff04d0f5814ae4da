//! System collaborators the slot store talks to
//!
//! The store only sees the [`SystemClipboard`] and [`PasteInjector`]
//! traits; the real implementations live in the submodules.

mod clipboard;
mod paste;

pub use clipboard::ArboardClipboard;
pub use paste::CgPasteInjector;

/// Errors from the system clipboard or the input stream
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("failed to post synthetic key event: {0}")]
    Injection(String),

    #[error("paste injection is not supported on this platform")]
    Unsupported,
}

/// Plain-text view of the system clipboard
pub trait SystemClipboard: Send {
    /// Current clipboard text, if any
    fn read_text(&mut self) -> Option<String>;

    /// Replace the clipboard contents with `text`
    fn write_text(&mut self, text: &str) -> Result<(), PlatformError>;
}

/// Posts a Cmd+V key-down/key-up pair to the frontmost application
pub trait PasteInjector: Send {
    fn inject_paste(&self) -> Result<(), PlatformError>;
}
