//! Default binding tables
//!
//! Two layouts have shipped over time. `Toggle` binds a single
//! save-or-paste shortcut per slot for a handful of slots; `Split` binds
//! separate save (⇧⌘) and paste (⌘) shortcuts for all ten.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::binding::{Action, BindingTable, KeyBinding};
use crate::hotkey::{KeyToken, ModifierState};

/// Slots bound out of the box by the toggle layout
const TOGGLE_SLOTS: [u8; 5] = [1, 2, 7, 8, 9];

/// Which default layout to fall back to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultScheme {
    /// ⇧⌘digit saves or pastes, ⌥⇧⌘digit clears
    #[default]
    Toggle,
    /// ⇧⌘digit saves, ⌘digit pastes, for slots 1-10
    Split,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown default scheme {0:?} (expected \"toggle\" or \"split\")")]
pub struct UnknownScheme(String);

impl FromStr for DefaultScheme {
    type Err = UnknownScheme;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "toggle" => Ok(Self::Toggle),
            "split" => Ok(Self::Split),
            _ => Err(UnknownScheme(s.to_owned())),
        }
    }
}

impl fmt::Display for DefaultScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle => write!(f, "toggle"),
            Self::Split => write!(f, "split"),
        }
    }
}

/// The key on the number row that selects a slot (slot 10 is "0")
fn slot_digit(slot: u8) -> KeyToken {
    KeyToken::Digit(u32::from(slot % 10))
}

/// Build the default table for `scheme`, clear bindings included
pub fn default_table(scheme: DefaultScheme) -> BindingTable {
    let bindings: Vec<KeyBinding> = match scheme {
        DefaultScheme::Toggle => TOGGLE_SLOTS
            .iter()
            .flat_map(|&slot| {
                [
                    KeyBinding::new(
                        ModifierState::CMD_SHIFT,
                        slot_digit(slot),
                        Action::SaveOrPaste,
                        i64::from(slot),
                    ),
                    KeyBinding::new(
                        ModifierState::CMD_SHIFT_OPTION,
                        slot_digit(slot),
                        Action::Clear,
                        i64::from(slot),
                    ),
                ]
            })
            .collect(),
        DefaultScheme::Split => {
            let saves = (1..=10u8).map(|slot| {
                KeyBinding::new(
                    ModifierState::CMD_SHIFT,
                    slot_digit(slot),
                    Action::Save,
                    i64::from(slot),
                )
            });
            let pastes = (1..=10u8).map(|slot| {
                KeyBinding::new(
                    ModifierState::CMD,
                    slot_digit(slot),
                    Action::Paste,
                    i64::from(slot),
                )
            });
            saves.chain(pastes).collect()
        }
    };

    BindingTable::new(bindings).with_clear_bindings()
}
