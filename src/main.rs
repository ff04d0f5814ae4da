//! pasteman-daemon: ten-slot clipboard for macOS
//!
//! This daemon runs as a LaunchAgent and provides:
//! - Global hotkey detection via CGEventTap
//! - Ten clipboard slots driven by a configurable key binding table
//! - IPC server for menu bar app communication
//!
//! A key-down that matches a binding is swallowed and turned into a save,
//! paste, or clear on its slot; everything else passes through untouched.

mod bindings;
mod config;
mod dispatch;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod platform;
mod settings;
mod slots;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::events::SlotEvent;
use crate::hotkey::HotkeyListener;
use crate::ipc::{Server, ServerContext};
use crate::lifecycle::{ControlSignal, Signals};
use crate::platform::{ArboardClipboard, CgPasteInjector};
use crate::settings::SettingsStore;
use crate::slots::SlotStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "pasteman-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        ?config.bindings_path,
        scheme = %config.default_scheme,
        "configuration loaded"
    );

    let mut signals = Signals::register().context("failed to register signal handlers")?;

    // Hotkey listener -> dispatcher
    let (hotkey_tx, hotkey_rx) = mpsc::channel(32);
    // Slot store -> feedback sinks (log, IPC subscribers)
    let (event_tx, _event_rx) = broadcast::channel::<SlotEvent>(64);

    let settings = Arc::new(SettingsStore::open(
        &config.bindings_path,
        config.default_scheme,
    ));

    let slots = Arc::new(Mutex::new(SlotStore::new(
        Box::new(ArboardClipboard::new()),
        Box::new(CgPasteInjector::new()),
        event_tx.clone(),
    )));

    let dispatcher = Dispatcher::new(Arc::clone(&settings), Arc::clone(&slots));

    // Start the hotkey listener (runs on dedicated thread)
    let hotkey_listener = HotkeyListener::new(hotkey_tx);
    match hotkey_listener.start() {
        Ok(()) => {
            info!("hotkey listener started");
        }
        Err(e) => {
            error!(?e, "failed to start hotkey listener");
            warn!("continuing without hotkey support - check Accessibility permissions");
        }
    }

    let server = Server::new(
        &config.socket_path,
        ServerContext::new(
            Arc::clone(&settings),
            Arc::clone(&slots),
            event_tx.clone(),
            hotkey_listener.running_flag(),
        ),
    )?;

    let mut feedback_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Process key events one at a time
        _ = dispatcher.run(hotkey_rx) => {
            info!("dispatcher exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Log every slot event as a user-facing notice
        _ = async {
            loop {
                match feedback_rx.recv().await {
                    Ok(event) => {
                        let notice = event.notice();
                        info!(
                            %event,
                            title = %notice.title,
                            body = %notice.body,
                            beep = event.wants_beep(),
                            "slot notice"
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "feedback receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("feedback logger exited");
        }

        // Reload bindings on SIGHUP until asked to stop
        _ = async {
            loop {
                match signals.recv().await {
                    ControlSignal::Reload => {
                        let table = settings.load();
                        info!(bindings = table.len(), "key bindings reloaded");
                    }
                    ControlSignal::Shutdown => break,
                }
            }
        } => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    hotkey_listener.stop();
    server.shutdown().await;

    info!("pasteman-daemon stopped");

    Ok(())
}
