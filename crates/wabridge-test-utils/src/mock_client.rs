// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock protocol client for deterministic testing.
//!
//! Every trait call is recorded as a [`ProtocolCall`]. Pairing events are
//! scripted ahead of time and delivered when `connect()` is called; protocol
//! events injected with [`MockProtocolClient::inject_event`] are returned by
//! `receive()`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify, mpsc};
use wabridge_core::types::{
    ComposedMessage, DownloadableMedia, MediaKind, PairingEvent, ProtocolEvent, UploadedMedia,
};
use wabridge_core::{BridgeError, ChatAddress, MessageId, ProtocolClient};

/// A recorded call on the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolCall {
    Connect,
    Disconnect,
    PairingChannel,
    SendMessage {
        to: String,
        message: ComposedMessage,
    },
    Upload {
        kind: MediaKind,
        bytes: Vec<u8>,
    },
    Download {
        url: String,
    },
    MarkRead {
        ids: Vec<String>,
        chat: String,
        sender: String,
    },
    SendTyping {
        to: String,
    },
}

/// Scriptable in-memory [`ProtocolClient`].
pub struct MockProtocolClient {
    connected: AtomicBool,
    calls: Mutex<Vec<ProtocolCall>>,
    pairing_script: Mutex<Vec<PairingEvent>>,
    pairing_tx: Mutex<Option<mpsc::Sender<PairingEvent>>>,
    events: Mutex<VecDeque<ProtocolEvent>>,
    notify: Notify,
    download_bytes: Mutex<Vec<u8>>,
    download_delay_ms: AtomicU64,
    sends: AtomicUsize,
    fail_connect: AtomicBool,
    fail_send_at: AtomicUsize,
    fail_upload: AtomicBool,
    fail_typing: AtomicBool,
    fail_mark_read: AtomicBool,
    fail_download: AtomicBool,
}

impl Default for MockProtocolClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProtocolClient {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            pairing_script: Mutex::new(Vec::new()),
            pairing_tx: Mutex::new(None),
            events: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            download_bytes: Mutex::new(b"\xFF\xD8\xFF\xE0mock-jpeg".to_vec()),
            download_delay_ms: AtomicU64::new(0),
            sends: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            fail_send_at: AtomicUsize::new(0),
            fail_upload: AtomicBool::new(false),
            fail_typing: AtomicBool::new(false),
            fail_mark_read: AtomicBool::new(false),
            fail_download: AtomicBool::new(false),
        }
    }

    /// Events delivered on the pairing channel once `connect()` is called.
    /// The channel stays open after the script unless it ends with a
    /// terminal event.
    pub async fn script_pairing(&self, events: Vec<PairingEvent>) {
        *self.pairing_script.lock().await = events;
    }

    /// Push a pairing event on the currently open pairing channel.
    pub async fn emit_pairing(&self, event: PairingEvent) -> bool {
        let terminal = event.is_terminal();
        let mut tx = self.pairing_tx.lock().await;
        let delivered = match tx.as_ref() {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        };
        if terminal {
            tx.take();
        }
        delivered
    }

    /// Close the pairing channel without a terminal event.
    pub async fn close_pairing(&self) {
        self.pairing_tx.lock().await.take();
    }

    /// Queue a protocol event for `receive()`.
    pub async fn inject_event(&self, event: ProtocolEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub async fn set_download_bytes(&self, bytes: Vec<u8>) {
        *self.download_bytes.lock().await = bytes;
    }

    /// Make every `download` take `delay` before it returns.
    pub fn set_download_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.download_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Fail the `n`-th `send_message` call (1-based). `0` disables.
    pub fn fail_send_at(&self, n: usize) {
        self.fail_send_at.store(n, Ordering::SeqCst);
    }

    pub fn fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn fail_typing(&self, fail: bool) {
        self.fail_typing.store(fail, Ordering::SeqCst);
    }

    pub fn fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }

    pub fn fail_download(&self, fail: bool) {
        self.fail_download.store(fail, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<ProtocolCall> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Messages passed to `send_message`, in order.
    pub async fn sent_messages(&self) -> Vec<ComposedMessage> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|c| match c {
                ProtocolCall::SendMessage { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn upload_count(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|c| matches!(c, ProtocolCall::Upload { .. }))
            .count()
    }

    async fn record(&self, call: ProtocolCall) {
        self.calls.lock().await.push(call);
    }
}

fn mock_failure(what: &str) -> BridgeError {
    BridgeError::protocol(format!("mock {what} failure"))
}

#[async_trait]
impl ProtocolClient for MockProtocolClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<(), BridgeError> {
        self.record(ProtocolCall::Connect).await;
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(mock_failure("connect"));
        }
        self.connected.store(true, Ordering::SeqCst);

        let script = std::mem::take(&mut *self.pairing_script.lock().await);
        for event in script {
            self.emit_pairing(event).await;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BridgeError> {
        self.record(ProtocolCall::Disconnect).await;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn pairing_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, BridgeError> {
        self.record(ProtocolCall::PairingChannel).await;
        let (tx, rx) = mpsc::channel(16);
        *self.pairing_tx.lock().await = Some(tx);
        Ok(rx)
    }

    async fn send_message(
        &self,
        to: &ChatAddress,
        message: &ComposedMessage,
    ) -> Result<MessageId, BridgeError> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_send_at.load(Ordering::SeqCst) {
            return Err(mock_failure("send"));
        }
        self.record(ProtocolCall::SendMessage {
            to: to.to_string(),
            message: message.clone(),
        })
        .await;
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }

    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<UploadedMedia, BridgeError> {
        self.record(ProtocolCall::Upload {
            kind,
            bytes: bytes.clone(),
        })
        .await;
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(mock_failure("upload"));
        }
        let id = uuid::Uuid::new_v4();
        Ok(UploadedMedia {
            url: format!("https://mmg.example/{id}"),
            direct_path: format!("/v/t62/{id}"),
            media_key: vec![7; 32],
            file_sha256: vec![1; 32],
            file_enc_sha256: vec![2; 32],
        })
    }

    async fn download(&self, media: &DownloadableMedia) -> Result<Vec<u8>, BridgeError> {
        self.record(ProtocolCall::Download {
            url: media.url.clone(),
        })
        .await;
        let delay = self.download_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_download.load(Ordering::SeqCst) {
            return Err(mock_failure("download"));
        }
        Ok(self.download_bytes.lock().await.clone())
    }

    async fn mark_read(
        &self,
        ids: &[String],
        _timestamp: DateTime<Utc>,
        chat: &str,
        sender: &str,
    ) -> Result<(), BridgeError> {
        self.record(ProtocolCall::MarkRead {
            ids: ids.to_vec(),
            chat: chat.to_string(),
            sender: sender.to_string(),
        })
        .await;
        if self.fail_mark_read.load(Ordering::SeqCst) {
            return Err(mock_failure("mark-read"));
        }
        Ok(())
    }

    async fn send_typing(&self, to: &ChatAddress) -> Result<(), BridgeError> {
        self.record(ProtocolCall::SendTyping { to: to.to_string() }).await;
        if self.fail_typing.load(Ordering::SeqCst) {
            return Err(mock_failure("typing"));
        }
        Ok(())
    }

    async fn receive(&self) -> Result<ProtocolEvent, BridgeError> {
        loop {
            {
                let mut queue = self.events.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }
}
