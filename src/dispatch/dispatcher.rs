//! Serial key event dispatcher
//!
//! Consumes raw key events from the hotkey listener one at a time:
//! decode, resolve against the current binding snapshot, run the action on
//! the slot store, and answer whether the event was consumed. The answer
//! is only sent once the slot operation (paste injection included) has
//! finished, so the next event always sees the effects of this one.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::bindings::resolve;
use crate::hotkey::{decode, EventKind, HotkeyEvent, RawKeyEvent};
use crate::settings::SettingsStore;
use crate::slots::SlotStore;

/// Routes key events to slot operations
pub struct Dispatcher {
    settings: Arc<SettingsStore>,
    slots: Arc<Mutex<SlotStore>>,
}

impl Dispatcher {
    pub fn new(settings: Arc<SettingsStore>, slots: Arc<Mutex<SlotStore>>) -> Self {
        Self { settings, slots }
    }

    /// Run the dispatcher until the listener side of the channel closes
    pub async fn run(&self, mut hotkey_rx: mpsc::Receiver<HotkeyEvent>) {
        info!("dispatcher started");

        while let Some(event) = hotkey_rx.recv().await {
            match event {
                HotkeyEvent::Key { event, reply } => {
                    let consumed = self.handle_key(event).await;
                    if reply.send(consumed).is_err() {
                        debug!("listener stopped waiting for a reply");
                    }
                }
                HotkeyEvent::TapDisabled => {
                    warn!("event tap was disabled, key events may have been missed");
                }
            }
        }

        info!("dispatcher stopped");
    }

    /// Handle one raw key event, returning `true` if it should be swallowed
    pub async fn handle_key(&self, event: RawKeyEvent) -> bool {
        if event.kind != EventKind::KeyDown {
            return false;
        }

        let decoded = decode(event.key_code, event.flags);
        let table = self.settings.snapshot();

        let Some(resolution) = resolve(&decoded, &table) else {
            return false;
        };

        let mut slots = self.slots.lock().await;
        let outcome = slots.execute(resolution.action, resolution.index);

        info!(
            key_code = event.key_code,
            action = ?resolution.action,
            slot = resolution.index + 1,
            ?outcome,
            "key binding handled"
        );

        true
    }
}
