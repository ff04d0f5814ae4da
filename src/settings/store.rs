//! Binding table persistence
//!
//! The table lives in a JSON file that is read and written wholesale.
//! Readers get an `Arc` snapshot; every change publishes a new one.
//! Writers are serialized so a read-modify-write never loses an update.
//! Nothing here returns an error to the event path: a missing or broken
//! file means the default table for the configured scheme.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use crate::bindings::{default_table, BindingTable, DefaultScheme};
use crate::hotkey::KeyToken;

/// Errors reading or writing the bindings file
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("no bindings file at {0}")]
    Missing(PathBuf),

    #[error("failed to access bindings file: {0}")]
    Io(#[from] io::Error),

    #[error("bindings file is not a valid table: {0}")]
    Format(#[from] serde_json::Error),
}

/// Owns the binding table and its on-disk copy
pub struct SettingsStore {
    path: PathBuf,
    scheme: DefaultScheme,
    table: ArcSwap<BindingTable>,
    /// Held across snapshot, edit, file write and publish
    write_lock: Mutex<()>,
}

impl SettingsStore {
    /// Create the store and load the table from `path`
    pub fn open(path: &Path, scheme: DefaultScheme) -> Self {
        let store = Self {
            path: path.to_owned(),
            scheme,
            table: ArcSwap::from_pointee(default_table(scheme)),
            write_lock: Mutex::new(()),
        };
        store.load();
        store
    }

    /// Current table. Cheap; holds no lock after it returns.
    pub fn snapshot(&self) -> Arc<BindingTable> {
        self.table.load_full()
    }

    pub fn scheme(&self) -> DefaultScheme {
        self.scheme
    }

    /// Re-read the file, repair clear bindings, and publish the result.
    /// Falls back to the default table when the file is absent or broken.
    pub fn load(&self) -> Arc<BindingTable> {
        let _guard = self.lock_writes();
        let table = match self.read() {
            Ok(table) => {
                if table.is_empty() {
                    warn!(path = ?self.path, "bindings file is empty, no keys will be captured");
                }
                let loaded = table.len();
                let table = table.with_clear_bindings();
                info!(
                    path = ?self.path,
                    bindings = table.len(),
                    repaired = table.len() - loaded,
                    "loaded key bindings"
                );
                table
            }
            Err(PersistenceError::Missing(_)) => {
                debug!(path = ?self.path, scheme = %self.scheme, "no bindings file, using defaults");
                default_table(self.scheme)
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "unreadable bindings file, using defaults");
                default_table(self.scheme)
            }
        };
        self.publish(table)
    }

    /// Persist `table` as given and publish its repaired form.
    /// A failed write is logged; the in-memory table still changes.
    pub fn save(&self, table: BindingTable) -> Arc<BindingTable> {
        let _guard = self.lock_writes();
        self.commit(table)
    }

    /// Overwrite the file with a fresh default table
    pub fn reset_to_defaults(&self) -> Arc<BindingTable> {
        info!(scheme = %self.scheme, "resetting key bindings to defaults");
        self.save(default_table(self.scheme))
    }

    /// Rebind `slot` (1-10) to ⇧⌘`key` for save-or-paste and ⌥⇧⌘`key` for clear
    pub fn assign_slot_key(&self, slot: u8, key: KeyToken) -> Arc<BindingTable> {
        info!(slot, %key, "assigning slot shortcut");
        self.update(|table| table.with_slot_key(slot, key))
    }

    /// Remove every binding for `slot`
    pub fn unbind_slot(&self, slot: u8) -> Arc<BindingTable> {
        info!(slot, "removing slot shortcuts");
        self.update(|table| table.without_slot(slot))
    }

    fn update(&self, edit: impl FnOnce(BindingTable) -> BindingTable) -> Arc<BindingTable> {
        let _guard = self.lock_writes();
        let table = edit(self.snapshot().as_ref().clone());
        self.commit(table)
    }

    fn commit(&self, table: BindingTable) -> Arc<BindingTable> {
        if let Err(e) = self.write(&table) {
            warn!(path = ?self.path, error = %e, "failed to persist key bindings");
        }
        self.publish(table.with_clear_bindings())
    }

    // Guards no data, so poisoning is ignored
    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read(&self) -> Result<BindingTable, PersistenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PersistenceError::Missing(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write(&self, table: &BindingTable) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(table)?;

        // Write beside the target then rename, so a crash never leaves half a file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = ?self.path, bindings = table.len(), "persisted key bindings");
        Ok(())
    }

    fn publish(&self, table: BindingTable) -> Arc<BindingTable> {
        let table = Arc::new(table);
        self.table.store(Arc::clone(&table));
        table
    }
}
