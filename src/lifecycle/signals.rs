//! Signal handling for shutdown and binding reloads

use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::debug;

/// What the daemon was asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// SIGTERM or SIGINT
    Shutdown,
    /// SIGHUP: re-read the bindings file
    Reload,
}

/// Listens for SIGTERM, SIGINT and SIGHUP
pub struct Signals {
    sigterm: Signal,
    sigint: Signal,
    sighup: Signal,
}

impl Signals {
    pub fn register() -> std::io::Result<Self> {
        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> ControlSignal {
        tokio::select! {
            _ = self.sigterm.recv() => {
                debug!("received SIGTERM");
                ControlSignal::Shutdown
            }
            _ = self.sigint.recv() => {
                debug!("received SIGINT");
                ControlSignal::Shutdown
            }
            _ = self.sighup.recv() => {
                debug!("received SIGHUP");
                ControlSignal::Reload
            }
        }
    }
}
