// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle controller.
//!
//! Owns the process-wide [`Session`] and composes the pairing manager, the
//! composer, and the inbound processor. It reconnects a stored identity at
//! startup, consumes protocol events, performs manual resets, and drains
//! background work on shutdown.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use wabridge_config::WabridgeConfig;
use wabridge_core::types::{OutboundRequest, ProtocolEvent, SentUnit};
use wabridge_core::{BridgeError, DeviceIdentity, DeviceStore, PairingState, ProtocolClient};

use crate::attachment::AttachmentPipeline;
use crate::composer::Composer;
use crate::inbound::{InboundDisposition, InboundProcessor};
use crate::media_store::MediaStore;
use crate::pairing::PairingManager;
use crate::state::Session;
use crate::webhook::WebhookDispatcher;

/// Delay before polling the protocol client again after a receive error.
const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Read-only status summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub version: &'static str,
    pub paired: bool,
    pub connected: bool,
    pub webhook_configured: bool,
    pub state: PairingState,
}

/// Identity details of the paired device. All fields are `None` while unpaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub connected: bool,
    pub paired: bool,
    pub device_id: Option<String>,
    pub jid: Option<String>,
    pub phone: Option<String>,
}

/// Top-level orchestrator of one protocol session.
pub struct SessionController {
    client: Arc<dyn ProtocolClient>,
    store: Arc<dyn DeviceStore>,
    session: Session,
    pairing: PairingManager,
    composer: Composer,
    inbound: InboundProcessor,
    media: MediaStore,
    webhook_configured: bool,
    tracker: TaskTracker,
}

impl SessionController {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        store: Arc<dyn DeviceStore>,
        config: &WabridgeConfig,
    ) -> Result<Self, BridgeError> {
        let session = Session::new();
        let tracker = TaskTracker::new();
        let media = MediaStore::new(&config.media.download_dir);
        let webhook = WebhookDispatcher::new(&config.webhook)?;
        let webhook_configured = webhook.is_configured();

        let pipeline = AttachmentPipeline::new(client.clone(), &config.media)?;
        let composer = Composer::new(client.clone(), pipeline, session.clone(), &config.outbound);
        let pairing = PairingManager::new(
            client.clone(),
            store.clone(),
            session.clone(),
            &config.pairing,
        );
        let inbound = InboundProcessor::new(
            client.clone(),
            session.clone(),
            media.clone(),
            webhook,
            tracker.clone(),
        );

        Ok(Self {
            client,
            store,
            session,
            pairing,
            composer,
            inbound,
            media,
            webhook_configured,
            tracker,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn media_store(&self) -> &MediaStore {
        &self.media
    }

    /// Reconnect a previously paired device. A failed connect leaves the
    /// session `Disconnected` with its identity intact.
    pub async fn startup(&self) -> PairingState {
        let identity = match self.store.device_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                info!("no stored device identity, pair with GET /pair");
                return self.session.state();
            }
            Err(e) => {
                warn!(error = %e, "failed to read device identity, starting unpaired");
                return self.session.state();
            }
        };

        info!(jid = %identity.jid, client = self.client.name(), "reconnecting stored device");
        self.session.mark_paired(identity, false);
        match self.client.connect().await {
            Ok(()) => {
                self.session.mark_connected();
            }
            Err(e) => {
                warn!(error = %e, "startup connect failed, staying disconnected");
                self.session.mark_disconnected();
            }
        }
        self.session.state()
    }

    /// Start pairing and return the first code as a PNG.
    pub async fn begin_pairing(&self) -> Result<Vec<u8>, BridgeError> {
        self.pairing.begin_pairing().await
    }

    /// Compose and send an outbound request.
    pub async fn send(&self, request: &OutboundRequest) -> Result<Vec<SentUnit>, BridgeError> {
        self.composer.send(request).await
    }

    /// Manual reset: disconnect, clear the stored identity, go `Unpaired`.
    pub async fn disconnect(&self) {
        self.pairing.cancel().await;

        if self.client.is_connected() {
            match self.client.disconnect().await {
                Ok(()) => info!("manually disconnected"),
                Err(e) => warn!(error = %e, "disconnect failed"),
            }
        }

        match self.store.delete_identity().await {
            Ok(()) => info!("device identity cleared"),
            Err(e) => warn!(error = %e, "failed to clear device identity"),
        }

        self.session.reset();
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.session.state();
        SessionStatus {
            version: env!("CARGO_PKG_VERSION"),
            paired: state.is_paired(),
            connected: self.client.is_connected(),
            webhook_configured: self.webhook_configured,
            state,
        }
    }

    /// Device details from the store, falling back to the in-memory identity.
    pub async fn device_info(&self) -> DeviceInfo {
        let identity = match self.store.device_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                debug!(error = %e, "device store unavailable, using session identity");
                self.session.identity()
            }
        };

        DeviceInfo {
            connected: self.client.is_connected(),
            paired: self.session.state().is_paired(),
            device_id: identity.as_ref().map(|id| id.jid.clone()),
            jid: identity.as_ref().map(|id| id.jid.clone()),
            phone: identity.as_ref().map(|id| id.user().to_string()),
        }
    }

    /// Apply one protocol event to the session.
    pub async fn handle_event(&self, event: ProtocolEvent) {
        match event {
            ProtocolEvent::Message(message) => {
                if let InboundDisposition::Processed { delivery, .. } =
                    self.inbound.handle(message).await
                {
                    debug!(?delivery, "inbound message processed");
                }
            }
            ProtocolEvent::Connected => {
                if self.session.mark_connected() {
                    let jid = self.session.identity().map(|id| id.jid).unwrap_or_default();
                    info!(device_id = %jid, "connected");
                } else {
                    debug!("connected event without a paired identity");
                }
            }
            ProtocolEvent::Disconnected => {
                self.session.mark_disconnected();
                warn!("disconnected from the chat network");
            }
            ProtocolEvent::PairSuccess { identity } => {
                info!(jid = %identity.jid, "device paired");
                self.record_pairing(identity);
            }
            ProtocolEvent::LoggedOut => {
                self.session.reset();
                warn!(
                    hint = "the device was unlinked from the phone or replaced, pair again",
                    "logged out"
                );
            }
            ProtocolEvent::StreamError { code } => {
                error!(
                    code = %code,
                    hint = "connection issue or device limit, check the phone's linked devices",
                    "stream error"
                );
            }
            ProtocolEvent::ConnectFailure { reason } => {
                error!(
                    reason = %reason,
                    hint = "check network connectivity and the linked-device limit",
                    "connection failed"
                );
            }
        }
    }

    fn record_pairing(&self, identity: DeviceIdentity) {
        self.session.mark_paired(identity, self.client.is_connected());
    }

    /// Consume protocol events until `cancel` fires.
    pub async fn run_events(&self, cancel: CancellationToken) {
        info!(client = self.client.name(), "event loop started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = self.client.receive() => match received {
                    Ok(event) => self.handle_event(event).await,
                    Err(e) => {
                        warn!(error = %e, "failed to receive protocol event");
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                        }
                    }
                },
            }
        }
        info!("event loop stopped");
    }

    /// Stop background work, wait up to `grace` in total for it, then disconnect.
    pub async fn shutdown(&self, grace: Duration) {
        let deadline = tokio::time::Instant::now() + grace;
        self.tracker.close();
        if tokio::time::timeout_at(deadline, self.pairing.cancel())
            .await
            .is_err()
        {
            warn!("pairing request still in flight, not waiting for it");
        }

        if !self.tracker.is_empty() {
            info!(pending = self.tracker.len(), "waiting for background tasks");
        }
        if tokio::time::timeout_at(deadline, self.tracker.wait()).await.is_err() {
            warn!(
                pending = self.tracker.len(),
                "grace period elapsed, abandoning background tasks"
            );
        }

        if self.client.is_connected()
            && let Err(e) = self.client.disconnect().await
        {
            warn!(error = %e, "disconnect during shutdown failed");
        }
        info!("session shut down");
    }
}
