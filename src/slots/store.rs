//! The ten clipboard slots
//!
//! Slots are addressed by zero-based index. Every operation reports a
//! [`SlotOutcome`] and publishes the matching [`SlotEvent`] so a front end
//! can beep or show a notice. Out-of-range indices are ignored.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::bindings::{Action, SLOT_COUNT};
use crate::events::{snippet, SlotEvent};
use crate::platform::{PasteInjector, SystemClipboard};

/// Characters of slot text shown in a status preview
pub const PREVIEW_CHARS: usize = 50;

/// Result of a single slot operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotOutcome {
    Saved,
    NothingToSave,
    Pasted,
    EmptySlot,
    Cleared,
    AlreadyEmpty,
    AllCleared,
    ClipboardUnavailable,
    OutOfRange,
    /// The action has no slot semantics
    Ignored,
}

/// One row of the status view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSummary {
    /// 1-based slot number
    pub slot: u8,
    /// First [`PREVIEW_CHARS`] characters, with "..." when cut
    pub preview: Option<String>,
}

/// Owns slot contents and drives the system clipboard
pub struct SlotStore {
    slots: [Option<String>; SLOT_COUNT],
    clipboard: Box<dyn SystemClipboard>,
    injector: Box<dyn PasteInjector>,
    event_tx: broadcast::Sender<SlotEvent>,
}

impl SlotStore {
    pub fn new(
        clipboard: Box<dyn SystemClipboard>,
        injector: Box<dyn PasteInjector>,
        event_tx: broadcast::Sender<SlotEvent>,
    ) -> Self {
        Self {
            slots: Default::default(),
            clipboard,
            injector,
            event_tx,
        }
    }

    /// Capture the current clipboard text into `index`
    pub fn save(&mut self, index: usize) -> SlotOutcome {
        if index >= SLOT_COUNT {
            return self.out_of_range(index);
        }
        let slot = slot_number(index);

        match self.clipboard.read_text() {
            Some(text) => {
                info!(slot, chars = text.chars().count(), "saved clipboard to slot");
                let event = SlotEvent::Saved {
                    slot,
                    snippet: snippet(&text),
                };
                self.slots[index] = Some(text);
                self.emit(event);
                SlotOutcome::Saved
            }
            None => {
                debug!(slot, "clipboard has no text, nothing to save");
                self.emit(SlotEvent::NothingToSave { slot });
                SlotOutcome::NothingToSave
            }
        }
    }

    /// Put slot `index` on the clipboard and send Cmd+V
    pub fn paste_from(&mut self, index: usize) -> SlotOutcome {
        if index >= SLOT_COUNT {
            return self.out_of_range(index);
        }
        let slot = slot_number(index);

        let Some(text) = self.slots[index].clone() else {
            debug!(slot, "paste from empty slot");
            self.emit(SlotEvent::EmptySlot { slot });
            return SlotOutcome::EmptySlot;
        };

        if let Err(e) = self.clipboard.write_text(&text) {
            warn!(slot, error = %e, "failed to write slot to clipboard");
            self.emit(SlotEvent::ClipboardUnavailable {
                slot,
                reason: e.to_string(),
            });
            return SlotOutcome::ClipboardUnavailable;
        }

        // The text is on the clipboard either way; a failed injection only
        // means the user has to press Cmd+V themselves.
        if let Err(e) = self.injector.inject_paste() {
            warn!(slot, error = %e, "failed to inject paste keystroke");
        }

        info!(slot, "pasted slot");
        self.emit(SlotEvent::Pasted {
            slot,
            snippet: snippet(&text),
        });
        SlotOutcome::Pasted
    }

    pub fn clear(&mut self, index: usize) -> SlotOutcome {
        if index >= SLOT_COUNT {
            return self.out_of_range(index);
        }
        let slot = slot_number(index);

        if self.slots[index].take().is_some() {
            info!(slot, "cleared slot");
            self.emit(SlotEvent::Cleared { slot });
            SlotOutcome::Cleared
        } else {
            debug!(slot, "slot already empty");
            self.emit(SlotEvent::AlreadyEmpty { slot });
            SlotOutcome::AlreadyEmpty
        }
    }

    pub fn clear_all(&mut self) -> SlotOutcome {
        self.slots = Default::default();
        info!("cleared all slots");
        self.emit(SlotEvent::AllCleared);
        SlotOutcome::AllCleared
    }

    pub fn has_content(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.slots.get(index)?.as_deref()
    }

    /// Paste when the slot holds text, otherwise capture into it
    pub fn save_or_paste(&mut self, index: usize) -> SlotOutcome {
        if self.has_content(index) {
            self.paste_from(index)
        } else {
            self.save(index)
        }
    }

    /// Run a resolved binding action against `index`
    pub fn execute(&mut self, action: Action, index: usize) -> SlotOutcome {
        match action {
            Action::SaveOrPaste => self.save_or_paste(index),
            Action::Save => self.save(index),
            Action::Paste => self.paste_from(index),
            Action::Clear => self.clear(index),
            Action::Unknown => SlotOutcome::Ignored,
        }
    }

    pub fn summaries(&self) -> Vec<SlotSummary> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, content)| SlotSummary {
                slot: slot_number(index),
                preview: content.as_deref().map(preview),
            })
            .collect()
    }

    fn out_of_range(&self, index: usize) -> SlotOutcome {
        warn!(index, "slot index out of range");
        SlotOutcome::OutOfRange
    }

    fn emit(&self, event: SlotEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}

fn slot_number(index: usize) -> u8 {
    // index < SLOT_COUNT at every call site
    (index + 1) as u8
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
