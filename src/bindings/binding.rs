//! Declarative key binding records

use serde::{Deserialize, Serialize};

use crate::hotkey::{KeyToken, ModifierState};

/// Number of clipboard slots
pub const SLOT_COUNT: usize = 10;

/// What a binding does to its slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Paste when the slot has content, otherwise save into it
    SaveOrPaste,
    Save,
    Paste,
    Clear,
    /// Action name this build does not know; never resolves
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Actions that capture the clipboard and therefore need a clear binding
    pub fn captures(self) -> bool {
        matches!(self, Action::Save | Action::SaveOrPaste)
    }
}

/// One row of the binding table, as stored on disk:
/// `{"modifiers": ["cmd","shift"], "key": "1", "action": "save_or_paste", "slot": 1}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub modifiers: ModifierState,
    pub key: KeyToken,
    pub action: Action,
    /// 1-10, with 0 as the legacy spelling of slot 10
    pub slot: Option<i64>,
}

impl KeyBinding {
    pub fn new(modifiers: ModifierState, key: KeyToken, action: Action, slot: i64) -> Self {
        Self {
            modifiers,
            key,
            action,
            slot: Some(slot),
        }
    }

    /// Zero-based store index for this binding's slot, if it names a real one
    pub fn slot_index(&self) -> Option<usize> {
        match self.slot? {
            0 => Some(SLOT_COUNT - 1),
            n @ 1..=10 => Some(n as usize - 1),
            _ => None,
        }
    }

    /// Whether this binding refers to the given 1-based slot number
    pub fn targets(&self, slot: u8) -> bool {
        self.slot_index() == Some(usize::from(slot).wrapping_sub(1))
    }

    /// Human-readable shortcut, e.g. `⇧⌘1`
    pub fn shortcut_label(&self) -> String {
        format!(
            "{}{}",
            self.modifiers.glyphs(),
            self.key.to_string().to_uppercase()
        )
    }
}

/// Ordered, immutable sequence of bindings. First match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingTable {
    bindings: Vec<KeyBinding>,
}

impl BindingTable {
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self { bindings }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeyBinding> {
        self.as_slice().iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn as_slice(&self) -> &[KeyBinding] {
        &self.bindings
    }

    pub fn into_vec(self) -> Vec<KeyBinding> {
        self.bindings
    }

    /// Make sure every capturing binding has a `clear` partner on
    /// ⌥⇧⌘ with the same key and slot, appending the missing ones.
    pub fn with_clear_bindings(mut self) -> Self {
        let mut missing = Vec::new();
        for binding in self.bindings.iter().filter(|b| b.action.captures()) {
            let Some(slot) = binding.slot else {
                continue;
            };
            let has_clear = self
                .bindings
                .iter()
                .chain(missing.iter())
                .any(|b: &KeyBinding| {
                    b.action == Action::Clear
                        && b.slot == Some(slot)
                        && b.key == binding.key
                        && b.modifiers == ModifierState::CMD_SHIFT_OPTION
                });
            if !has_clear {
                missing.push(KeyBinding::new(
                    ModifierState::CMD_SHIFT_OPTION,
                    binding.key.clone(),
                    Action::Clear,
                    slot,
                ));
            }
        }
        self.bindings.extend(missing);
        self
    }

    /// Replace every binding for `slot` with a save-or-paste / clear pair on `key`
    pub fn with_slot_key(self, slot: u8, key: KeyToken) -> Self {
        let mut bindings = self.without_slot(slot).into_vec();
        bindings.push(KeyBinding::new(
            ModifierState::CMD_SHIFT,
            key.clone(),
            Action::SaveOrPaste,
            i64::from(slot),
        ));
        bindings.push(KeyBinding::new(
            ModifierState::CMD_SHIFT_OPTION,
            key,
            Action::Clear,
            i64::from(slot),
        ));
        Self::new(bindings)
    }

    /// Drop every binding for `slot`
    pub fn without_slot(self, slot: u8) -> Self {
        Self::new(
            self.bindings
                .into_iter()
                .filter(|b| !b.targets(slot))
                .collect(),
        )
    }

    /// The first capturing binding for `slot`, as shown next to the slot in menus
    pub fn capture_binding(&self, slot: u8) -> Option<&KeyBinding> {
        self.bindings
            .iter()
            .find(|b| b.action.captures() && b.targets(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save_or_paste(key: KeyToken, slot: i64) -> KeyBinding {
        KeyBinding::new(ModifierState::CMD_SHIFT, key, Action::SaveOrPaste, slot)
    }

    fn clears(table: &BindingTable) -> Vec<&KeyBinding> {
        table.iter().filter(|b| b.action == Action::Clear).collect()
    }

    #[test]
    fn test_wire_format() {
        let json = r#"[{"modifiers":["cmd","shift"],"key":"1","action":"save_or_paste","slot":1},
                       {"modifiers":["cmd"],"key":"e","action":"paste","slot":null}]"#;
        let table: BindingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.as_slice()[0], save_or_paste(KeyToken::Digit(1), 1));
        assert_eq!(table.as_slice()[1].key, KeyToken::Char('e'));
        assert_eq!(table.as_slice()[1].slot, None);

        let out = serde_json::to_string(&table.as_slice()[0]).unwrap();
        assert_eq!(
            out,
            r#"{"modifiers":["cmd","shift"],"key":"1","action":"save_or_paste","slot":1}"#
        );
    }

    #[test]
    fn test_unknown_action_loads() {
        let json = r#"[{"modifiers":["cmd"],"key":"1","action":"launch_rockets","slot":1}]"#;
        let table: BindingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.as_slice()[0].action, Action::Unknown);
    }

    #[test]
    fn test_unrecognized_key_keeps_rest_of_table() {
        let json = r#"[{"modifiers":["cmd","shift"],"key":"j","action":"save_or_paste","slot":4},
                       {"modifiers":["cmd","shift"],"key":"f1","action":"save_or_paste","slot":5}]"#;
        let table: BindingTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.capture_binding(4).unwrap().key, KeyToken::Char('j'));
        assert_eq!(
            table.capture_binding(5).unwrap().key,
            KeyToken::Other("f1".into())
        );
    }

    #[test]
    fn test_slot_index() {
        let mut binding = save_or_paste(KeyToken::Digit(0), 0);
        assert_eq!(binding.slot_index(), Some(9));
        binding.slot = Some(1);
        assert_eq!(binding.slot_index(), Some(0));
        binding.slot = Some(10);
        assert_eq!(binding.slot_index(), Some(9));
        binding.slot = Some(11);
        assert_eq!(binding.slot_index(), None);
        binding.slot = Some(-1);
        assert_eq!(binding.slot_index(), None);
        binding.slot = None;
        assert_eq!(binding.slot_index(), None);
    }

    #[test]
    fn test_repair_adds_missing_clear() {
        let table = BindingTable::new(vec![
            save_or_paste(KeyToken::Digit(3), 3),
            save_or_paste(KeyToken::Char('e'), 4),
        ])
        .with_clear_bindings();

        let clears = clears(&table);
        assert_eq!(clears.len(), 2);
        assert_eq!(clears[0].key, KeyToken::Digit(3));
        assert_eq!(clears[0].slot, Some(3));
        assert_eq!(clears[0].modifiers, ModifierState::CMD_SHIFT_OPTION);
        assert_eq!(clears[1].key, KeyToken::Char('e'));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let once = BindingTable::new(vec![save_or_paste(KeyToken::Digit(1), 1)])
            .with_clear_bindings();
        let twice = once.clone().with_clear_bindings();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_repair_ignores_clear_with_wrong_modifiers() {
        let table = BindingTable::new(vec![
            save_or_paste(KeyToken::Digit(1), 1),
            KeyBinding::new(ModifierState::CMD, KeyToken::Digit(1), Action::Clear, 1),
        ])
        .with_clear_bindings();
        assert_eq!(clears(&table).len(), 2);
    }

    #[test]
    fn test_repair_skips_slotless_bindings() {
        let mut binding = save_or_paste(KeyToken::Digit(1), 1);
        binding.slot = None;
        let table = BindingTable::new(vec![binding]).with_clear_bindings();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_with_slot_key_replaces_existing() {
        let table = BindingTable::new(vec![
            save_or_paste(KeyToken::Digit(1), 1),
            save_or_paste(KeyToken::Digit(2), 2),
        ])
        .with_clear_bindings()
        .with_slot_key(1, KeyToken::Char('j'));

        assert!(table.iter().all(|b| !(b.targets(1) && b.key == KeyToken::Digit(1))));
        let capture = table.capture_binding(1).unwrap();
        assert_eq!(capture.key, KeyToken::Char('j'));
        assert_eq!(capture.shortcut_label(), "⇧⌘J");
        assert!(table.capture_binding(2).is_some());
    }

    #[test]
    fn test_without_slot() {
        let table = BindingTable::new(vec![
            save_or_paste(KeyToken::Digit(0), 0),
            save_or_paste(KeyToken::Digit(1), 1),
        ])
        .with_clear_bindings()
        .without_slot(10);
        assert!(table.capture_binding(10).is_none());
        assert_eq!(table.len(), 2);
    }
}
