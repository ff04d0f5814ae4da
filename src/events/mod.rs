//! Events emitted by the slot store
//!
//! Each event carries enough to render a user-facing notice: a title and
//! a short snippet of the affected text. Slot numbers are 1-based here.

use serde::{Deserialize, Serialize};

/// Longest body snippet attached to a notice, in characters
pub const SNIPPET_CHARS: usize = 100;

/// Events emitted after every slot operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotEvent {
    /// Clipboard text captured into a slot
    Saved { slot: u8, snippet: String },

    /// Save requested but the clipboard holds no text
    NothingToSave { slot: u8 },

    /// Slot text written to the clipboard and Cmd+V injected
    Pasted { slot: u8, snippet: String },

    /// Paste requested from an empty slot
    EmptySlot { slot: u8 },

    /// Slot emptied
    Cleared { slot: u8 },

    /// Clear requested on a slot that was already empty
    AlreadyEmpty { slot: u8 },

    /// Every slot emptied
    AllCleared,

    /// The system clipboard could not be written
    ClipboardUnavailable { slot: u8, reason: String },
}

/// Title and body handed to whatever shows notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl SlotEvent {
    pub fn notice(&self) -> Notice {
        let (title, body) = match self {
            SlotEvent::Saved { slot, snippet } => {
                (format!("Clipboard {} Saved", slot), snippet.clone())
            }
            SlotEvent::NothingToSave { slot } => {
                (format!("Clipboard {}: Nothing to Save", slot), String::new())
            }
            SlotEvent::Pasted { slot, snippet } => {
                (format!("Pasted from Clipboard {}", slot), snippet.clone())
            }
            SlotEvent::EmptySlot { slot } => (format!("Clipboard {} Is Empty", slot), String::new()),
            SlotEvent::Cleared { slot } => (format!("Clipboard {} Cleared", slot), String::new()),
            SlotEvent::AlreadyEmpty { slot } => {
                (format!("Clipboard {} Already Empty", slot), String::new())
            }
            SlotEvent::AllCleared => ("All Clipboards Cleared".to_string(), String::new()),
            SlotEvent::ClipboardUnavailable { slot, reason } => {
                (format!("Clipboard {} Unavailable", slot), reason.clone())
            }
        };
        Notice { title, body }
    }

    /// Whether the user should hear a beep for this event
    pub fn wants_beep(&self) -> bool {
        !matches!(
            self,
            SlotEvent::Pasted { .. } | SlotEvent::Cleared { .. } | SlotEvent::AllCleared
        )
    }
}

/// First [`SNIPPET_CHARS`] characters of `text`
pub fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

impl std::fmt::Display for SlotEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotEvent::Saved { slot, .. } => write!(f, "SAVED ({})", slot),
            SlotEvent::NothingToSave { slot } => write!(f, "NOTHING_TO_SAVE ({})", slot),
            SlotEvent::Pasted { slot, .. } => write!(f, "PASTED ({})", slot),
            SlotEvent::EmptySlot { slot } => write!(f, "EMPTY_SLOT ({})", slot),
            SlotEvent::Cleared { slot } => write!(f, "CLEARED ({})", slot),
            SlotEvent::AlreadyEmpty { slot } => write!(f, "ALREADY_EMPTY ({})", slot),
            SlotEvent::AllCleared => write!(f, "ALL_CLEARED"),
            SlotEvent::ClipboardUnavailable { slot, .. } => {
                write!(f, "CLIPBOARD_UNAVAILABLE ({})", slot)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SlotEvent::Saved {
            slot: 3,
            snippet: "hello".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"saved\""));
        assert!(json.contains("hello"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"already_empty","slot":10}"#;
        let event: SlotEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, SlotEvent::AlreadyEmpty { slot: 10 });
    }

    #[test]
    fn test_notice_titles() {
        let notice = SlotEvent::Pasted {
            slot: 1,
            snippet: "hello".into(),
        }
        .notice();
        assert_eq!(notice.title, "Pasted from Clipboard 1");
        assert_eq!(notice.body, "hello");

        assert_eq!(
            SlotEvent::AlreadyEmpty { slot: 2 }.notice().title,
            "Clipboard 2 Already Empty"
        );
        assert_eq!(SlotEvent::AllCleared.notice().body, "");
    }

    #[test]
    fn test_snippet_counts_characters() {
        let long = "é".repeat(150);
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_CHARS);
        assert_eq!(snippet("short"), "short");
    }

    #[test]
    fn test_beeps() {
        assert!(SlotEvent::NothingToSave { slot: 1 }.wants_beep());
        assert!(SlotEvent::AlreadyEmpty { slot: 1 }.wants_beep());
        assert!(!SlotEvent::Cleared { slot: 1 }.wants_beep());
    }
}
