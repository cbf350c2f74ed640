// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device pairing state machine.
//!
//! [`PairingManager::begin_pairing`] tears down any prior session, subscribes
//! to the pairing channel, connects, and waits for the first event. A code
//! is rendered to a QR PNG and the rest of the channel is consumed by a
//! background listener that resolves the attempt to `Paired` or `Unpaired`.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use wabridge_config::model::PairingConfig;
use wabridge_core::types::PairingEvent;
use wabridge_core::{BridgeError, DeviceStore, PairingErrorKind, ProtocolClient};

use crate::state::Session;

/// Drives pairing attempts. At most one attempt is in flight at a time.
pub struct PairingManager {
    client: Arc<dyn ProtocolClient>,
    store: Arc<dyn DeviceStore>,
    session: Session,
    qr_timeout: Duration,
    attempt_timeout: Duration,
    settle_delay: Duration,
    qr_size: u32,
    /// Held for the whole of `begin_pairing`; carries the listener of the
    /// latest attempt so a new attempt can stop it.
    attempt: Mutex<Option<JoinHandle<()>>>,
}

impl PairingManager {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        store: Arc<dyn DeviceStore>,
        session: Session,
        config: &PairingConfig,
    ) -> Self {
        Self {
            client,
            store,
            session,
            qr_timeout: config.qr_timeout(),
            attempt_timeout: config.attempt_timeout(),
            settle_delay: config.settle_delay(),
            qr_size: config.qr_size_px,
            attempt: Mutex::new(None),
        }
    }

    /// Starts a pairing attempt and returns the first pairing code as a PNG.
    ///
    /// Fails with [`BridgeError::PairingBusy`] while another caller is still
    /// waiting for its first code.
    pub async fn begin_pairing(&self) -> Result<Vec<u8>, BridgeError> {
        let mut attempt = self.attempt.try_lock().map_err(|_| BridgeError::PairingBusy)?;
        if let Some(listener) = attempt.take() {
            listener.abort();
            debug!("stopped listener of previous pairing attempt");
        }

        self.teardown().await;
        self.session.begin_pairing();
        info!("pairing attempt started");

        tokio::time::sleep(self.settle_delay).await;

        let mut events = match self.open_channel().await {
            Ok(events) => events,
            Err(e) => {
                self.session.abandon_pairing();
                return Err(e);
            }
        };

        let first = match tokio::time::timeout(self.qr_timeout, events.recv()).await {
            Err(_) => {
                warn!(timeout = ?self.qr_timeout, "no pairing code received");
                self.session.abandon_pairing();
                return Err(BridgeError::PairingTimeout {
                    duration: self.qr_timeout,
                });
            }
            Ok(None) => {
                self.session.abandon_pairing();
                return Err(BridgeError::Pairing {
                    kind: PairingErrorKind::Generic("pairing channel closed".into()),
                });
            }
            Ok(Some(event)) => event,
        };

        let code = match first {
            PairingEvent::Code { code } => code,
            other => {
                let kind = other
                    .error_kind()
                    .unwrap_or_else(|| PairingErrorKind::Unexpected(other.tag().into()));
                warn!(event = other.tag(), hint = kind.remediation(), "pairing failed");
                self.session.abandon_pairing();
                return Err(BridgeError::Pairing { kind });
            }
        };

        let png = match render_qr(&code, self.qr_size) {
            Ok(png) => png,
            Err(e) => {
                self.session.abandon_pairing();
                return Err(e);
            }
        };
        info!(bytes = png.len(), "pairing code rendered");

        let listener = listen(
            events,
            self.client.clone(),
            self.store.clone(),
            self.session.clone(),
        );
        let session = self.session.clone();
        let deadline = self.attempt_timeout;
        *attempt = Some(tokio::spawn(async move {
            if tokio::time::timeout(deadline, listener).await.is_err()
                && session.abandon_pairing()
            {
                warn!(
                    timeout = ?deadline,
                    hint = "request a new code with /pair",
                    "pairing attempt expired without a scan"
                );
            }
        }));

        Ok(png)
    }

    /// Stops the background listener, if any.
    pub async fn cancel(&self) {
        if let Some(listener) = self.attempt.lock().await.take() {
            listener.abort();
        }
    }

    /// Disconnects a live session and clears the stored identity. Both steps
    /// are best-effort.
    async fn teardown(&self) {
        if self.client.is_connected() {
            match self.client.disconnect().await {
                Ok(()) => info!("disconnected existing session before pairing"),
                Err(e) => warn!(error = %e, "failed to disconnect before pairing"),
            }
        }

        match self.store.device_identity().await {
            Ok(Some(identity)) => {
                if let Err(e) = self.store.delete_identity().await {
                    warn!(jid = %identity.jid, error = %e, "failed to clear device identity");
                } else {
                    info!(jid = %identity.jid, "cleared previous device identity");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to query device identity"),
        }
    }

    /// Subscribe before connecting so no event is emitted without a listener.
    async fn open_channel(&self) -> Result<mpsc::Receiver<PairingEvent>, BridgeError> {
        let events = self.client.pairing_channel().await?;
        self.client.connect().await?;
        Ok(events)
    }
}

/// Consumes the remaining pairing events of an attempt.
async fn listen(
    mut events: mpsc::Receiver<PairingEvent>,
    client: Arc<dyn ProtocolClient>,
    store: Arc<dyn DeviceStore>,
    session: Session,
) {
    while let Some(event) = events.recv().await {
        match event {
            PairingEvent::Code { .. } => debug!("pairing code refreshed"),
            PairingEvent::Unknown => debug!("ignoring unrecognized pairing event"),
            PairingEvent::Success => {
                match store.device_identity().await {
                    Ok(Some(identity)) => {
                        info!(jid = %identity.jid, "pairing succeeded");
                        session.mark_paired(identity, client.is_connected());
                    }
                    Ok(None) => {
                        warn!("pairing reported success but the store holds no identity");
                        session.abandon_pairing();
                    }
                    Err(e) => {
                        warn!(error = %e, "pairing succeeded but the identity could not be read");
                        session.abandon_pairing();
                    }
                }
                return;
            }
            PairingEvent::Timeout => {
                warn!(hint = "request a new code with /pair", "pairing code expired");
                session.abandon_pairing();
                return;
            }
            failure => {
                let kind = failure
                    .error_kind()
                    .unwrap_or_else(|| PairingErrorKind::Unexpected(failure.tag().into()));
                error!(event = failure.tag(), hint = kind.remediation(), "pairing failed");
                session.abandon_pairing();
                return;
            }
        }
    }

    if session.abandon_pairing() {
        warn!("pairing channel closed before the attempt resolved");
    }
}

/// Renders `code` as a PNG QR image (error correction level M) at least
/// `size` pixels wide.
pub fn render_qr(code: &str, size: u32) -> Result<Vec<u8>, BridgeError> {
    let qr = QrCode::with_error_correction_level(code.as_bytes(), EcLevel::M)
        .map_err(|e| BridgeError::Internal(format!("failed to encode QR code: {e}")))?;
    let image = qr
        .render::<Luma<u8>>()
        .min_dimensions(size, size)
        .build();

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(image)
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| BridgeError::Internal(format!("failed to encode QR PNG: {e}")))?;
    Ok(png.into_inner())
}
