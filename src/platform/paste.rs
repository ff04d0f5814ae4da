//! Synthetic Cmd+V via Core Graphics events

use super::{PasteInjector, PlatformError};

/// Posts Cmd+V at the HID level
#[derive(Debug, Default)]
pub struct CgPasteInjector;

impl CgPasteInjector {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "macos")]
impl PasteInjector for CgPasteInjector {
    fn inject_paste(&self) -> Result<(), PlatformError> {
        use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
        use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
        use tracing::debug;

        // 'v' is key code 9 on ANSI layouts
        const KEY_V: CGKeyCode = 9;

        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| PlatformError::Injection("failed to create event source".into()))?;

        let key_down = CGEvent::new_keyboard_event(source.clone(), KEY_V, true)
            .map_err(|_| PlatformError::Injection("failed to create key down event".into()))?;
        key_down.set_flags(CGEventFlags::CGEventFlagCommand);

        let key_up = CGEvent::new_keyboard_event(source, KEY_V, false)
            .map_err(|_| PlatformError::Injection("failed to create key up event".into()))?;
        key_up.set_flags(CGEventFlags::CGEventFlagCommand);

        key_down.post(CGEventTapLocation::HID);
        key_up.post(CGEventTapLocation::HID);

        debug!("posted synthetic Cmd+V");
        Ok(())
    }
}

#[cfg(not(target_os = "macos"))]
impl PasteInjector for CgPasteInjector {
    fn inject_paste(&self) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }
}
