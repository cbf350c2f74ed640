// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol client trait for the chat network session.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::error::BridgeError;
use crate::types::{
    ChatAddress, ComposedMessage, DownloadableMedia, MediaKind, MessageId, PairingEvent,
    ProtocolEvent, UploadedMedia,
};

/// Client for one protocol session (connection, pairing, messaging, media).
///
/// A single client instance is shared by every request handler and the
/// event loop, so all methods take `&self`.
#[async_trait]
pub trait ProtocolClient: Send + Sync + 'static {
    /// Human-readable name of the implementation, used in logs.
    fn name(&self) -> &str;

    /// Opens the protocol connection. With no stored identity this starts
    /// the pairing handshake and events flow on the pairing channel.
    async fn connect(&self) -> Result<(), BridgeError>;

    /// Closes the protocol connection. Idempotent.
    async fn disconnect(&self) -> Result<(), BridgeError>;

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;

    /// Subscribes to pairing events. Must be called before [`connect`](Self::connect).
    ///
    /// The channel closes after a terminal event (success, timeout, or error).
    async fn pairing_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, BridgeError>;

    /// Sends one composed message and returns its protocol id.
    async fn send_message(
        &self,
        to: &ChatAddress,
        message: &ComposedMessage,
    ) -> Result<MessageId, BridgeError>;

    /// Encrypts and uploads media bytes.
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<UploadedMedia, BridgeError>;

    /// Downloads and decrypts media referenced by an inbound message.
    async fn download(&self, media: &DownloadableMedia) -> Result<Vec<u8>, BridgeError>;

    /// Sends read receipts for the given message ids.
    async fn mark_read(
        &self,
        ids: &[String],
        timestamp: DateTime<Utc>,
        chat: &str,
        sender: &str,
    ) -> Result<(), BridgeError>;

    /// Sends a "composing" chat-presence indicator.
    async fn send_typing(&self, to: &ChatAddress) -> Result<(), BridgeError>;

    /// Receives the next protocol event. Blocks until one is available.
    async fn receive(&self) -> Result<ProtocolEvent, BridgeError>;
}
