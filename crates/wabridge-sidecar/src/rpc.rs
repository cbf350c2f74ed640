// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-RPC 2.0 framing for the protocol daemon link.
//!
//! Every frame is one JSON object terminated by `\n`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wabridge_core::BridgeError;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names understood by the daemon.
pub mod method {
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const PAIRING_SUBSCRIBE: &str = "pairing.subscribe";
    pub const MESSAGE_SEND: &str = "message.send";
    pub const MEDIA_UPLOAD: &str = "media.upload";
    pub const MEDIA_DOWNLOAD: &str = "media.download";
    pub const MARK_READ: &str = "message.mark_read";
    pub const COMPOSING: &str = "presence.composing";
    pub const STORE_DEVICE: &str = "store.device";
    pub const STORE_DELETE: &str = "store.delete";
}

/// Notification names pushed by the daemon.
pub mod notification {
    pub const EVENT: &str = "event";
    pub const PAIRING: &str = "pairing";
}

#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
}

impl<'a> Request<'a> {
    pub fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }

    /// Serialize as a single newline-terminated frame.
    pub fn to_frame(&self) -> Result<String, BridgeError> {
        let mut line = serde_json::to_string(self).map_err(|e| BridgeError::Protocol {
            message: format!("failed to encode {} request", self.method),
            source: Some(Box::new(e)),
        })?;
        line.push('\n');
        Ok(line)
    }
}

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Any frame sent by the daemon: a response (has `id`, no `method`) or a
/// notification (has `method`, no `id`).
#[derive(Debug, Deserialize)]
pub struct Incoming {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// Outcome of one request as routed by the reader task.
pub type Reply = Result<Value, RpcError>;

impl Incoming {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Split a response frame into its id and reply. `None` for notifications.
    pub fn into_reply(self) -> Option<(u64, Reply)> {
        if self.method.is_some() {
            return None;
        }
        let id = self.id?;
        let reply = match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        };
        Some((id, reply))
    }
}

/// Result of `message.send`.
#[derive(Debug, Deserialize)]
pub struct SendResult {
    pub id: String,
}

/// Result of `media.download`.
#[derive(Debug, Deserialize)]
pub struct DownloadResult {
    pub data: String,
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, BridgeError> {
    STANDARD.decode(encoded).map_err(|e| BridgeError::Protocol {
        message: "daemon returned invalid base64".into(),
        source: Some(Box::new(e)),
    })
}
