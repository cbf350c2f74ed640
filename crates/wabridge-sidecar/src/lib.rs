// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Protocol daemon client for wabridge.
//!
//! The chat protocol and its credential store live in an external daemon.
//! [`SidecarClient`] drives it over one TCP connection carrying
//! newline-delimited JSON-RPC 2.0 and implements both [`ProtocolClient`]
//! and [`DeviceStore`] on top of it.
//!
//! The link is opened lazily by the first request and reopened after the
//! daemon drops it. Losing the link fails every pending request and queues
//! a single [`ProtocolEvent::Disconnected`].

pub mod rpc;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info, warn};
use wabridge_config::model::ProtocolConfig;
use wabridge_core::types::{
    ChatAddress, ComposedMessage, DeviceIdentity, DownloadableMedia, MediaKind, MessageId,
    PairingEvent, ProtocolEvent, UploadedMedia,
};
use wabridge_core::{BridgeError, DeviceStore, ProtocolClient};

use crate::rpc::{DownloadResult, Incoming, Reply, Request, SendResult, method, notification};

/// Frames buffered between request callers and the socket writer.
const WRITE_QUEUE: usize = 64;

/// Pairing events buffered for the pairing listener.
const PAIRING_QUEUE: usize = 16;

/// [`ProtocolClient`] and [`DeviceStore`] backed by the protocol daemon.
pub struct SidecarClient {
    shared: Arc<Shared>,
    events_rx: Mutex<mpsc::UnboundedReceiver<ProtocolEvent>>,
}

/// State shared with the socket reader task.
struct Shared {
    address: String,
    request_timeout: Duration,
    link: Mutex<Option<mpsc::Sender<String>>>,
    pending: DashMap<u64, oneshot::Sender<Reply>>,
    next_id: AtomicU64,
    connected: AtomicBool,
    events_tx: mpsc::UnboundedSender<ProtocolEvent>,
    pairing: Mutex<Option<mpsc::Sender<PairingEvent>>>,
}

impl SidecarClient {
    /// Creates a client for the daemon at `config.sidecar_address`.
    ///
    /// No connection is made until the first request.
    pub fn new(config: &ProtocolConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                address: config.sidecar_address.clone(),
                request_timeout: config.request_timeout(),
                link: Mutex::new(None),
                pending: DashMap::new(),
                next_id: AtomicU64::new(1),
                connected: AtomicBool::new(false),
                events_tx,
                pairing: Mutex::new(None),
            }),
            events_rx: Mutex::new(events_rx),
        }
    }

    pub fn address(&self) -> &str {
        &self.shared.address
    }

    /// Returns the writer for the current link, opening one if needed.
    async fn link(&self) -> Result<mpsc::Sender<String>, BridgeError> {
        let mut link = self.shared.link.lock().await;
        if let Some(writer) = link.as_ref()
            && !writer.is_closed()
        {
            return Ok(writer.clone());
        }

        let stream = TcpStream::connect(self.shared.address.as_str())
            .await
            .map_err(|e| BridgeError::Protocol {
                message: format!("cannot reach protocol daemon at {}", self.shared.address),
                source: Some(Box::new(e)),
            })?;
        info!(address = %self.shared.address, "connected to protocol daemon");

        let (read_half, write_half) = stream.into_split();
        let (writer, frames) = mpsc::channel(WRITE_QUEUE);
        tokio::spawn(write_frames(write_half, frames));
        tokio::spawn(read_frames(
            Arc::clone(&self.shared),
            BufReader::new(read_half),
            writer.clone(),
        ));

        *link = Some(writer.clone());
        Ok(writer)
    }

    /// Issues one request and decodes its result.
    async fn call<T: DeserializeOwned>(&self, name: &str, params: Value) -> Result<T, BridgeError> {
        let writer = self.link().await?;
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = Request::new(id, name, params).to_frame()?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.insert(id, tx);
        debug!(id, method = name, "daemon request");

        if writer.send(frame).await.is_err() {
            self.shared.pending.remove(&id);
            return Err(BridgeError::protocol(format!(
                "daemon link closed before {name} was sent"
            )));
        }

        let reply = match tokio::time::timeout(self.shared.request_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(BridgeError::protocol(format!(
                    "daemon connection lost during {name}"
                )));
            }
            Err(_) => {
                self.shared.pending.remove(&id);
                return Err(BridgeError::protocol(format!(
                    "{name} timed out after {:?}",
                    self.shared.request_timeout
                )));
            }
        };

        let value = reply.map_err(|e| {
            BridgeError::protocol(format!("{name} failed: {} (code {})", e.message, e.code))
        })?;
        serde_json::from_value(value).map_err(|e| BridgeError::Protocol {
            message: format!("unexpected {name} result"),
            source: Some(Box::new(e)),
        })
    }
}

impl Shared {
    async fn route(&self, line: &str) {
        let mut incoming = match Incoming::parse(line) {
            Ok(incoming) => incoming,
            Err(e) => {
                warn!(error = %e, "malformed frame from protocol daemon");
                return;
            }
        };

        match incoming.method.take().as_deref() {
            Some(notification::EVENT) => self.on_event(incoming.params),
            Some(notification::PAIRING) => self.on_pairing(incoming.params).await,
            Some(other) => debug!(method = other, "ignoring daemon notification"),
            None => match incoming.into_reply() {
                Some((id, reply)) => match self.pending.remove(&id) {
                    Some((_, waiter)) => {
                        let _ = waiter.send(reply);
                    }
                    None => debug!(id, "reply for unknown request id dropped"),
                },
                None => warn!("daemon frame carries neither id nor method"),
            },
        }
    }

    fn on_event(&self, params: Value) {
        let event: ProtocolEvent = match serde_json::from_value(params) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "undecodable protocol event");
                return;
            }
        };

        match &event {
            ProtocolEvent::Connected => self.connected.store(true, Ordering::SeqCst),
            ProtocolEvent::Disconnected | ProtocolEvent::LoggedOut => {
                self.connected.store(false, Ordering::SeqCst)
            }
            _ => {}
        }

        if self.events_tx.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    async fn on_pairing(&self, params: Value) {
        let event: PairingEvent = match serde_json::from_value(params) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "undecodable pairing event");
                return;
            }
        };

        let mut slot = self.pairing.lock().await;
        let Some(subscriber) = slot.as_ref() else {
            debug!(event = event.tag(), "pairing event without a subscriber");
            return;
        };

        // The reader task must never wait on a slow subscriber.
        let terminal = event.is_terminal();
        let closed = match subscriber.try_send(event) {
            Ok(()) => false,
            Err(TrySendError::Full(event)) => {
                warn!(event = event.tag(), "pairing subscriber is lagging, event dropped");
                false
            }
            Err(TrySendError::Closed(_)) => true,
        };
        if closed || terminal {
            // Dropping the sender closes the subscriber's channel.
            *slot = None;
        }
    }

    /// Tears down state tied to the link that `writer` belongs to.
    async fn link_lost(&self, writer: &mpsc::Sender<String>) {
        let mut link = self.link.lock().await;
        if !link.as_ref().is_some_and(|current| current.same_channel(writer)) {
            debug!("stale daemon link closed");
            return;
        }
        *link = None;
        // Dropping the waiters fails their requests.
        self.pending.clear();
        self.pairing.lock().await.take();

        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        warn!(was_connected, "protocol daemon link lost");
        let _ = self.events_tx.send(ProtocolEvent::Disconnected);
    }
}

async fn write_frames(mut stream: OwnedWriteHalf, mut frames: mpsc::Receiver<String>) {
    while let Some(frame) = frames.recv().await {
        if let Err(e) = stream.write_all(frame.as_bytes()).await {
            warn!(error = %e, "daemon write failed");
            break;
        }
    }
}

async fn read_frames(
    shared: Arc<Shared>,
    reader: BufReader<OwnedReadHalf>,
    writer: mpsc::Sender<String>,
) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => shared.route(&line).await,
            Ok(None) => {
                info!("protocol daemon closed the connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "daemon read failed");
                break;
            }
        }
    }
    shared.link_lost(&writer).await;
}

#[async_trait]
impl ProtocolClient for SidecarClient {
    fn name(&self) -> &str {
        "sidecar"
    }

    async fn connect(&self) -> Result<(), BridgeError> {
        self.call::<Value>(method::CONNECT, json!({})).await?;
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BridgeError> {
        if self.shared.link.lock().await.is_none() {
            self.shared.connected.store(false, Ordering::SeqCst);
            return Ok(());
        }
        self.call::<Value>(method::DISCONNECT, json!({})).await?;
        self.shared.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    async fn pairing_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, BridgeError> {
        let (tx, rx) = mpsc::channel(PAIRING_QUEUE);
        *self.shared.pairing.lock().await = Some(tx);

        if let Err(e) = self
            .call::<Value>(method::PAIRING_SUBSCRIBE, json!({}))
            .await
        {
            self.shared.pairing.lock().await.take();
            return Err(e);
        }
        Ok(rx)
    }

    async fn send_message(
        &self,
        to: &ChatAddress,
        message: &ComposedMessage,
    ) -> Result<MessageId, BridgeError> {
        let sent: SendResult = self
            .call(
                method::MESSAGE_SEND,
                json!({ "to": to.as_str(), "message": message }),
            )
            .await?;
        Ok(MessageId(sent.id))
    }

    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<UploadedMedia, BridgeError> {
        self.call(
            method::MEDIA_UPLOAD,
            json!({ "kind": kind, "data": rpc::encode_bytes(&bytes) }),
        )
        .await
    }

    async fn download(&self, media: &DownloadableMedia) -> Result<Vec<u8>, BridgeError> {
        let downloaded: DownloadResult = self
            .call(method::MEDIA_DOWNLOAD, json!({ "media": media }))
            .await?;
        rpc::decode_bytes(&downloaded.data)
    }

    async fn mark_read(
        &self,
        ids: &[String],
        timestamp: DateTime<Utc>,
        chat: &str,
        sender: &str,
    ) -> Result<(), BridgeError> {
        self.call::<Value>(
            method::MARK_READ,
            json!({ "ids": ids, "timestamp": timestamp, "chat": chat, "sender": sender }),
        )
        .await?;
        Ok(())
    }

    async fn send_typing(&self, to: &ChatAddress) -> Result<(), BridgeError> {
        self.call::<Value>(method::COMPOSING, json!({ "to": to.as_str() }))
            .await?;
        Ok(())
    }

    async fn receive(&self) -> Result<ProtocolEvent, BridgeError> {
        self.events_rx
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| BridgeError::protocol("protocol event stream closed"))
    }
}

#[async_trait]
impl DeviceStore for SidecarClient {
    async fn device_identity(&self) -> Result<Option<DeviceIdentity>, BridgeError> {
        self.call(method::STORE_DEVICE, json!({})).await
    }

    async fn delete_identity(&self) -> Result<(), BridgeError> {
        self.call::<Value>(method::STORE_DELETE, json!({})).await?;
        Ok(())
    }
}
