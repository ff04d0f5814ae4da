//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::bindings::DefaultScheme;

/// Overrides the runtime data directory
pub const DATA_DIR_VAR: &str = "PASTEMAN_DATA_DIR";
/// Selects the default binding layout (`toggle` or `split`)
pub const SCHEME_VAR: &str = "PASTEMAN_DEFAULT_SCHEME";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Path to the persisted key bindings
    pub bindings_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Layout used when the bindings file is missing or unreadable
    pub default_scheme: DefaultScheme,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Self::from_parts(
            &home,
            std::env::var(DATA_DIR_VAR).ok(),
            std::env::var(SCHEME_VAR).ok(),
        )
    }

    fn from_parts(home: &str, data_dir: Option<String>, scheme: Option<String>) -> Result<Self> {
        let data_dir = match data_dir.filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(home)
                .join(".local")
                .join("share")
                .join("pasteman"),
        };

        let default_scheme = match scheme.filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .parse::<DefaultScheme>()
                .with_context(|| format!("invalid {}", SCHEME_VAR))?,
            None => DefaultScheme::default(),
        };

        Ok(Self {
            socket_path: data_dir.join("daemon.sock"),
            bindings_path: data_dir.join("keybindings.json"),
            data_dir,
            default_scheme,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
