//! System clipboard backed by arboard

use tracing::debug;

use super::{PlatformError, SystemClipboard};

/// Opens the clipboard on each call so a transient failure never sticks
#[derive(Debug, Default)]
pub struct ArboardClipboard;

impl ArboardClipboard {
    pub fn new() -> Self {
        Self
    }

    fn open() -> Result<arboard::Clipboard, PlatformError> {
        arboard::Clipboard::new().map_err(|e| PlatformError::Clipboard(e.to_string()))
    }
}

impl SystemClipboard for ArboardClipboard {
    fn read_text(&mut self) -> Option<String> {
        match Self::open().and_then(|mut cb| {
            cb.get_text()
                .map_err(|e| PlatformError::Clipboard(e.to_string()))
        }) {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "no text on clipboard");
                None
            }
        }
    }

    fn write_text(&mut self, text: &str) -> Result<(), PlatformError> {
        Self::open()?
            .set_text(text)
            .map_err(|e| PlatformError::Clipboard(e.to_string()))
    }
}
