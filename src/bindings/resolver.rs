//! First-match lookup of decoded key events in a binding table

use tracing::debug;

use super::binding::{Action, BindingTable};
use crate::hotkey::DecodedKey;

/// A binding matched: what to do and to which zero-based slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub action: Action,
    pub index: usize,
    /// Position of the winning binding in the table
    pub position: usize,
}

/// Find the first binding whose modifier set equals the event's exactly
/// and whose key names the pressed key.
///
/// Bindings that match but point at no valid slot, or carry an action this
/// build does not know, are skipped and the search continues.
pub fn resolve(event: &DecodedKey, table: &BindingTable) -> Option<Resolution> {
    for (position, binding) in table.iter().enumerate() {
        if binding.modifiers != event.modifiers || !event.matches_key(&binding.key) {
            continue;
        }

        let Some(index) = binding.slot_index() else {
            debug!(position, slot = ?binding.slot, "skipping binding with invalid slot");
            continue;
        };

        if binding.action == Action::Unknown {
            debug!(position, "skipping binding with unknown action");
            continue;
        }

        return Some(Resolution {
            action: binding.action,
            index,
            position,
        });
    }

    None
}
