//! Global hotkey listener using macOS CGEventTap
//!
//! Watches system-wide key-down events on a dedicated thread with its own
//! CFRunLoop. Each key-down is handed to the dispatcher over a channel and
//! the callback blocks until the dispatcher says whether to swallow it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Kind of keyboard event delivered by the tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    KeyDown,
    FlagsChanged,
}

/// A key event exactly as the OS reported it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    /// Hardware virtual key code
    pub key_code: i64,
    /// CGEventFlags bits
    pub flags: u64,
    pub kind: EventKind,
}

/// Events sent from the hotkey listener to the dispatcher
#[derive(Debug)]
pub enum HotkeyEvent {
    /// A key event; `reply` receives `true` if the event should be swallowed
    Key {
        event: RawKeyEvent,
        reply: oneshot::Sender<bool>,
    },
    /// Event tap was disabled by macOS (it is re-enabled automatically)
    TapDisabled,
}

/// Global hotkey listener feeding key events to the dispatcher
pub struct HotkeyListener {
    event_tx: mpsc::Sender<HotkeyEvent>,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(event_tx: mpsc::Sender<HotkeyEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the hotkey listener
    ///
    /// This spawns a dedicated thread that runs a CFRunLoop to receive
    /// CGEventTap callbacks. The listener runs until `stop()` is called
    /// or the program exits.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if !cfg!(target_os = "macos") {
            return Err(HotkeyError::Unsupported);
        }

        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!("hotkey listener thread started");

                if let Err(e) = run_event_loop(event_tx, Arc::clone(&running)) {
                    error!(?e, "hotkey listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                HotkeyError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop the hotkey listener; the run loop exits within one poll interval
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Shared flag, set while the event tap thread is running
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }
}

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to attach event tap to the run loop")]
    RunLoopSource,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("global key events are only available on macOS")]
    Unsupported,
}

/// Hand a key-down to the dispatcher and wait for its verdict.
/// Flag changes stay here; they never get consumed.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn forward(event_tx: &mpsc::Sender<HotkeyEvent>, event: RawKeyEvent) -> bool {
    if event.kind != EventKind::KeyDown {
        return false;
    }

    let (reply_tx, reply_rx) = oneshot::channel();
    let sent = event_tx.blocking_send(HotkeyEvent::Key {
        event,
        reply: reply_tx,
    });
    if sent.is_err() {
        tracing::warn!("dispatcher channel closed, passing key through");
        return false;
    }

    reply_rx.blocking_recv().unwrap_or(false)
}

/// Run the CFRunLoop with the event tap
#[cfg(target_os = "macos")]
fn run_event_loop(
    event_tx: mpsc::Sender<HotkeyEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), HotkeyError> {
    use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
    use core_graphics::event::{
        CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
        CGEventTapProxy, CGEventType, EventField,
    };
    use tracing::{debug, warn};

    let tap_disabled = Arc::new(AtomicBool::new(false));
    let disabled_flag = Arc::clone(&tap_disabled);

    // Runs on this thread for every key event; must answer quickly or macOS
    // disables the tap
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        let kind = match event_type {
            CGEventType::KeyDown => EventKind::KeyDown,
            CGEventType::FlagsChanged => EventKind::FlagsChanged,
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                disabled_flag.store(true, Ordering::SeqCst);
                let _ = event_tx.try_send(HotkeyEvent::TapDisabled);
                return Some(event.clone());
            }
            _ => return Some(event.clone()),
        };

        let raw = RawKeyEvent {
            key_code: event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE),
            flags: event.get_flags().bits(),
            kind,
        };

        if forward(&event_tx, raw) {
            debug!(key_code = raw.key_code, "swallowing key event");
            event.set_type(CGEventType::Null);
        }
        Some(event.clone())
    };

    // Create the event tap; Default (not ListenOnly) so events can be swallowed
    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::Default,
        vec![CGEventType::KeyDown, CGEventType::FlagsChanged],
        callback,
    )
    .map_err(|_| {
        error!("failed to create event tap - is Accessibility permission granted?");
        HotkeyError::EventTapCreation
    })?;

    tap.enable();

    let run_loop_source = tap
        .mach_port
        .create_runloop_source(0)
        .map_err(|_| HotkeyError::RunLoopSource)?;
    let run_loop = CFRunLoop::get_current();

    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }

    info!("event tap created and enabled");

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(
                kCFRunLoopDefaultMode,
                std::time::Duration::from_millis(100),
                true,
            );
        }

        if tap_disabled.swap(false, Ordering::SeqCst) {
            warn!("event tap disabled by the system, re-enabling");
            tap.enable();
        }
    }

    // Tap will be automatically cleaned up when it goes out of scope

    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run_event_loop(
    _event_tx: mpsc::Sender<HotkeyEvent>,
    _running: Arc<AtomicBool>,
) -> Result<(), HotkeyError> {
    Err(HotkeyError::Unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = HotkeyListener::new(tx);
        assert!(!listener.running_flag().load(Ordering::SeqCst));
    }

    #[test]
    fn test_forward_waits_for_verdict() {
        let (tx, mut rx) = mpsc::channel(4);
        let dispatcher = thread::spawn(move || {
            if let Some(HotkeyEvent::Key { event, reply }) = rx.blocking_recv() {
                reply.send(event.key_code == 18).unwrap();
            }
        });

        let event = RawKeyEvent {
            key_code: 18,
            flags: 0,
            kind: EventKind::KeyDown,
        };
        assert!(forward(&tx, event));
        dispatcher.join().unwrap();
    }

    #[test]
    fn test_forward_passes_through_when_dispatcher_gone() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let event = RawKeyEvent {
            key_code: 18,
            flags: 0,
            kind: EventKind::KeyDown,
        };
        assert!(!forward(&tx, event));
    }

    #[test]
    fn test_flag_changes_stay_in_listener() {
        let (tx, mut rx) = mpsc::channel(4);
        let event = RawKeyEvent {
            key_code: 56,
            flags: 0x0002_0000,
            kind: EventKind::FlagsChanged,
        };
        assert!(!forward(&tx, event));
        assert!(rx.try_recv().is_err());
    }
}
