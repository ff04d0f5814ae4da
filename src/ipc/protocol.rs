//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.
//! Slot numbers on the wire are 1-based, as shown to users.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::bindings::{BindingTable, DefaultScheme};
use crate::events::SlotEvent;
use crate::slots::SlotOutcome;

/// Largest message body accepted from a client
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from the menu bar app to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request slot previews and shortcuts
    GetStatus,

    /// Request the active binding table
    GetBindings,

    /// Empty every slot
    ClearAll,

    ClearSlot { slot: u8 },

    /// Put a slot on the clipboard and send Cmd+V
    PasteSlot { slot: u8 },

    /// Bind ⇧⌘key (save or paste) and ⌥⇧⌘key (clear) to a slot
    SetSlotKey { slot: u8, key: String },

    /// Remove every shortcut for a slot
    UnbindSlot { slot: u8 },

    /// Restore the default bindings
    ResetBindings,

    /// Re-read the bindings file
    ReloadBindings,

    /// Subscribe to slot event notifications
    Subscribe,
}

/// Responses from the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current daemon status
    Status(DaemonStatus),

    /// The binding table now in effect
    Bindings { bindings: BindingTable },

    /// Result of a slot command; `slot` is absent for clear-all
    SlotOutcome {
        slot: Option<u8>,
        outcome: SlotOutcome,
    },

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification for subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    SlotEvent {
        event: SlotEvent,
        title: String,
        body: String,
    },
}

impl From<SlotEvent> for Notification {
    fn from(event: SlotEvent) -> Self {
        let notice = event.notice();
        Self::SlotEvent {
            event,
            title: notice.title,
            body: notice.body,
        }
    }
}

/// One slot as the menu shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStatus {
    pub slot: u8,
    pub preview: Option<String>,
    /// Label of the slot's save shortcut, e.g. `⇧⌘1`
    pub shortcut: Option<String>,
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Whether the global event tap is active
    pub hotkey_registered: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,

    /// Layout used when no bindings file exists
    pub default_scheme: DefaultScheme,

    pub slots: Vec<SlotStatus>,
}

/// Encode a message as a length-prefixed frame
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(msg)?;
    if body.len() > MAX_FRAME_LEN {
        bail!("message of {} bytes exceeds frame limit", body.len());
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Read one frame body. `Ok(None)` means the peer closed the connection
/// between frames.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame of {} bytes exceeds limit", len);
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetSlotKey {
            slot: 3,
            key: "e".into(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"set_slot_key","slot":3,"key":"e"}"#);

        let req: Request = serde_json::from_str(r#"{"type":"clear_all"}"#).unwrap();
        assert!(matches!(req, Request::ClearAll));
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::SlotOutcome {
            slot: Some(2),
            outcome: SlotOutcome::AlreadyEmpty,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"slot_outcome""#));
        assert!(json.contains(r#""outcome":"already_empty""#));
    }

    #[test]
    fn test_notification_carries_notice() {
        let note = Notification::from(SlotEvent::Cleared { slot: 4 });
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["type"], "slot_event");
        assert_eq!(json["event"]["type"], "cleared");
        assert_eq!(json["title"], "Clipboard 4 Cleared");
    }

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let frame = encode_frame(&Request::Ping).unwrap();
        assert_eq!(&frame[..4], &(frame.len() as u32 - 4).to_le_bytes());

        tokio::io::AsyncWriteExt::write_all(&mut client, &frame).await.unwrap();
        drop(client);

        let body = read_frame(&mut server).await.unwrap().unwrap();
        let req: Request = serde_json::from_slice(&body).unwrap();
        assert!(matches!(req, Request::Ping));
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut client, &len).await.unwrap();
        assert!(read_frame(&mut server).await.is_err());
    }
}
