//! Unix domain socket server for IPC
//!
//! Serves slot status and binding changes to the menu bar app, and pushes
//! slot events to clients that subscribed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bindings::{KeyBinding, SLOT_COUNT};
use crate::events::SlotEvent;
use crate::hotkey::KeyToken;
use crate::settings::SettingsStore;
use crate::slots::SlotStore;

use super::protocol::{
    encode_frame, read_frame, DaemonStatus, Notification, Request, Response, SlotStatus,
};

/// Everything a request handler may touch
pub struct ServerContext {
    pub settings: Arc<SettingsStore>,
    pub slots: Arc<Mutex<SlotStore>>,
    pub events: broadcast::Sender<SlotEvent>,
    pub hotkey_registered: Arc<AtomicBool>,
    start_time: Instant,
}

impl ServerContext {
    pub fn new(
        settings: Arc<SettingsStore>,
        slots: Arc<Mutex<SlotStore>>,
        events: broadcast::Sender<SlotEvent>,
        hotkey_registered: Arc<AtomicBool>,
    ) -> Self {
        Self {
            settings,
            slots,
            events,
            hotkey_registered,
            start_time: Instant::now(),
        }
    }
}

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    context: Arc<ServerContext>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, context: ServerContext) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            context: Arc::new(context),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let context = Arc::clone(&self.context);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, context) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    ///
    /// Responses and notifications share one writer task so frames never
    /// interleave.
    async fn handle_client(stream: UnixStream, context: Arc<ServerContext>) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();
        let (out_tx, mut out_rx) = mpsc::channel::<Vec<u8>>(32);

        let writer_task = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                writer.write_all(&frame).await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut forwarder: Option<JoinHandle<()>> = None;

        let result = async {
            while let Some(body) = read_frame(&mut reader).await? {
                let response_and_subscribe = match serde_json::from_slice::<Request>(&body) {
                    Ok(request) => {
                        debug!(?request, "received request");
                        Self::process_request(request, &context).await
                    }
                    Err(e) => {
                        warn!(error = %e, "unparseable request");
                        (Response::error("bad_request", e.to_string()), false)
                    }
                };
                let (response, subscribe) = response_and_subscribe;

                // Subscribe before confirming so no event slips in between
                let events_rx = (subscribe && forwarder.is_none()).then(|| context.events.subscribe());

                if out_tx.send(encode_frame(&response)?).await.is_err() {
                    break;
                }

                if let Some(events_rx) = events_rx {
                    debug!("client subscribed to notifications");
                    forwarder = Some(Self::forward_events(events_rx, out_tx.clone()));
                }
            }
            debug!("client disconnected");
            Ok::<_, anyhow::Error>(())
        }
        .await;

        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
        drop(out_tx);
        match writer_task.await {
            Ok(Err(e)) => debug!(?e, "client writer closed"),
            Err(e) => debug!(?e, "client writer task failed"),
            Ok(Ok(())) => {}
        }

        result
    }

    /// Relay slot events to one subscribed client
    fn forward_events(
        mut events: broadcast::Receiver<SlotEvent>,
        out_tx: mpsc::Sender<Vec<u8>>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let frame = match encode_frame(&Notification::from(event)) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!(?e, "failed to encode notification");
                                continue;
                            }
                        };
                        if out_tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged behind slot events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(request: Request, context: &ServerContext) -> (Response, bool) {
        let response = match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(Self::status(context).await),

            Request::GetBindings => Response::Bindings {
                bindings: context.settings.snapshot().as_ref().clone(),
            },

            Request::ClearAll => {
                let outcome = context.slots.lock().await.clear_all();
                Response::SlotOutcome { slot: None, outcome }
            }

            Request::ClearSlot { slot } => match slot_index(slot) {
                Some(index) => {
                    let outcome = context.slots.lock().await.clear(index);
                    Response::SlotOutcome {
                        slot: Some(slot),
                        outcome,
                    }
                }
                None => invalid_slot(slot),
            },

            Request::PasteSlot { slot } => match slot_index(slot) {
                Some(index) => {
                    let outcome = context.slots.lock().await.paste_from(index);
                    Response::SlotOutcome {
                        slot: Some(slot),
                        outcome,
                    }
                }
                None => invalid_slot(slot),
            },

            Request::SetSlotKey { slot, key } => {
                if slot_index(slot).is_none() {
                    invalid_slot(slot)
                } else {
                    match KeyToken::parse(&key) {
                        Ok(token) if token.is_decodable() => {
                            let table = context.settings.assign_slot_key(slot, token);
                            Response::Bindings {
                                bindings: table.as_ref().clone(),
                            }
                        }
                        Ok(_) => Response::error(
                            "invalid_key",
                            format!("no key on the keyboard produces {:?}", key),
                        ),
                        Err(e) => Response::error("invalid_key", e.to_string()),
                    }
                }
            }

            Request::UnbindSlot { slot } => match slot_index(slot) {
                Some(_) => Response::Bindings {
                    bindings: context.settings.unbind_slot(slot).as_ref().clone(),
                },
                None => invalid_slot(slot),
            },

            Request::ResetBindings => Response::Bindings {
                bindings: context.settings.reset_to_defaults().as_ref().clone(),
            },

            Request::ReloadBindings => Response::Bindings {
                bindings: context.settings.load().as_ref().clone(),
            },

            Request::Subscribe => return (Response::Subscribed, true),
        };

        (response, false)
    }

    async fn status(context: &ServerContext) -> DaemonStatus {
        let table = context.settings.snapshot();
        let summaries = context.slots.lock().await.summaries();

        let slots = summaries
            .into_iter()
            .map(|summary| SlotStatus {
                shortcut: table
                    .capture_binding(summary.slot)
                    .map(KeyBinding::shortcut_label),
                slot: summary.slot,
                preview: summary.preview,
            })
            .collect();

        DaemonStatus {
            version: env!("CARGO_PKG_VERSION").to_string(),
            hotkey_registered: context.hotkey_registered.load(Ordering::SeqCst),
            uptime_secs: context.start_time.elapsed().as_secs(),
            default_scheme: context.settings.scheme(),
            slots,
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// 1-based wire slot number to store index
fn slot_index(slot: u8) -> Option<usize> {
    let slot = usize::from(slot);
    (1..=SLOT_COUNT).contains(&slot).then(|| slot - 1)
}

fn invalid_slot(slot: u8) -> Response {
    Response::error(
        "invalid_slot",
        format!("slot {} is outside 1-{}", slot, SLOT_COUNT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::{Action, DefaultScheme};
    use crate::slots::SlotOutcome;
    use crate::testing::{FakeClipboard, FakeInjector};
    use tempfile::TempDir;

    struct Fixture {
        server: Arc<Server>,
        socket_path: PathBuf,
        slots: Arc<Mutex<SlotStore>>,
        clipboard: FakeClipboard,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let settings = Arc::new(SettingsStore::open(
            &dir.path().join("keybindings.json"),
            DefaultScheme::Toggle,
        ));
        let clipboard = FakeClipboard::default();
        let (events, _) = broadcast::channel(64);
        let slots = Arc::new(Mutex::new(SlotStore::new(
            Box::new(clipboard.clone()),
            Box::new(FakeInjector::default()),
            events.clone(),
        )));
        let context = ServerContext::new(
            settings,
            Arc::clone(&slots),
            events,
            Arc::new(AtomicBool::new(true)),
        );
        let socket_path = dir.path().join("daemon.sock");
        let server = Arc::new(Server::new(&socket_path, context).unwrap());

        let running = Arc::clone(&server);
        tokio::spawn(async move {
            let _ = running.run().await;
        });

        Fixture {
            server,
            socket_path,
            slots,
            clipboard,
            _dir: dir,
        }
    }

    async fn send(stream: &mut UnixStream, request: &Request) {
        stream.write_all(&encode_frame(request).unwrap()).await.unwrap();
    }

    async fn recv<T: serde::de::DeserializeOwned>(stream: &mut UnixStream) -> T {
        let body = read_frame(stream).await.unwrap().unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    async fn call(stream: &mut UnixStream, request: &Request) -> Response {
        send(stream, request).await;
        recv(stream).await
    }

    #[test]
    fn test_slot_index() {
        assert_eq!(slot_index(0), None);
        assert_eq!(slot_index(1), Some(0));
        assert_eq!(slot_index(10), Some(9));
        assert_eq!(slot_index(11), None);
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let f = fixture();
        f.clipboard.set("hello world");
        f.slots.lock().await.save(0);

        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();
        assert!(matches!(call(&mut stream, &Request::Ping).await, Response::Pong));

        match call(&mut stream, &Request::GetStatus).await {
            Response::Status(status) => {
                assert!(status.hotkey_registered);
                assert_eq!(status.slots.len(), SLOT_COUNT);
                assert_eq!(status.slots[0].preview.as_deref(), Some("hello world"));
                assert_eq!(status.slots[0].shortcut.as_deref(), Some("⇧⌘1"));
                assert_eq!(status.slots[2].shortcut, None);
            }
            other => panic!("unexpected {:?}", other),
        }
        f.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_slot_commands() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        match call(&mut stream, &Request::ClearSlot { slot: 2 }).await {
            Response::SlotOutcome { slot, outcome } => {
                assert_eq!(slot, Some(2));
                assert_eq!(outcome, SlotOutcome::AlreadyEmpty);
            }
            other => panic!("unexpected {:?}", other),
        }

        match call(&mut stream, &Request::PasteSlot { slot: 11 }).await {
            Response::Error { code, .. } => assert_eq!(code, "invalid_slot"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_set_slot_key() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        let request = Request::SetSlotKey {
            slot: 3,
            key: "E".into(),
        };
        match call(&mut stream, &request).await {
            Response::Bindings { bindings } => {
                let binding = bindings.capture_binding(3).unwrap();
                assert_eq!(binding.key, KeyToken::Char('e'));
                assert_eq!(binding.action, Action::SaveOrPaste);
            }
            other => panic!("unexpected {:?}", other),
        }

        let request = Request::SetSlotKey {
            slot: 3,
            key: "/".into(),
        };
        match call(&mut stream, &request).await {
            Response::Error { code, .. } => assert_eq!(code, "invalid_key"),
            other => panic!("unexpected {:?}", other),
        }

        match call(&mut stream, &Request::UnbindSlot { slot: 3 }).await {
            Response::Bindings { bindings } => assert!(bindings.capture_binding(3).is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bad_request_keeps_connection() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();

        let garbage = b"{\"type\":\"launch\"}";
        let mut frame = (garbage.len() as u32).to_le_bytes().to_vec();
        frame.extend_from_slice(garbage);
        stream.write_all(&frame).await.unwrap();
        match recv::<Response>(&mut stream).await {
            Response::Error { code, .. } => assert_eq!(code, "bad_request"),
            other => panic!("unexpected {:?}", other),
        }

        assert!(matches!(call(&mut stream, &Request::Ping).await, Response::Pong));
    }

    #[tokio::test]
    async fn test_subscriber_receives_slot_events() {
        let f = fixture();
        let mut stream = UnixStream::connect(&f.socket_path).await.unwrap();
        assert!(matches!(
            call(&mut stream, &Request::Subscribe).await,
            Response::Subscribed
        ));

        f.clipboard.set("pushed");
        f.slots.lock().await.save(4);

        match recv::<Notification>(&mut stream).await {
            Notification::SlotEvent { event, title, body } => {
                assert!(matches!(event, SlotEvent::Saved { slot: 5, .. }));
                assert_eq!(title, "Clipboard 5 Saved");
                assert_eq!(body, "pushed");
            }
        }
    }
}
