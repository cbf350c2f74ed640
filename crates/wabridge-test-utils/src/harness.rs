// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a [`SessionController`] to the mocks.
//!
//! Media lands in a temporary directory that lives as long as the harness.
//! The pairing settle delay is zero and the QR wait is one second so
//! pairing tests run fast.

use std::sync::Arc;

use tempfile::TempDir;
use wabridge_config::WabridgeConfig;
use wabridge_core::BridgeError;
use wabridge_session::SessionController;

use crate::mock_client::MockProtocolClient;
use crate::mock_store::MockDeviceStore;

/// Device address used by [`TestHarnessBuilder::paired`].
pub const TEST_DEVICE_JID: &str = "15550009999:7@s.whatsapp.net";

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    identity: Option<String>,
    fail_startup_connect: bool,
    config: WabridgeConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = WabridgeConfig::default();
        config.pairing.settle_delay_ms = 0;
        config.pairing.qr_timeout_secs = 1;
        config.server.shutdown_grace_secs = 1;
        Self {
            identity: None,
            fail_startup_connect: false,
            config,
        }
    }

    /// Start from a stored identity; `build` reconnects it.
    pub fn paired(mut self) -> Self {
        self.identity = Some(TEST_DEVICE_JID.to_string());
        self
    }

    /// Start from a stored identity whose reconnect fails.
    pub fn paired_but_offline(mut self) -> Self {
        self.identity = Some(TEST_DEVICE_JID.to_string());
        self.fail_startup_connect = true;
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.config.webhook.url = Some(url.into());
        self
    }

    /// Adjust the configuration before the controller is built.
    pub fn with_config(mut self, f: impl FnOnce(&mut WabridgeConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub async fn build(mut self) -> Result<TestHarness, BridgeError> {
        let media_dir = TempDir::new().map_err(|e| BridgeError::Storage { source: e.into() })?;
        self.config.media.download_dir = media_dir.path().display().to_string();

        let client = Arc::new(MockProtocolClient::new());
        let store = Arc::new(match &self.identity {
            Some(jid) => MockDeviceStore::with_identity(jid),
            None => MockDeviceStore::new(),
        });

        let controller = Arc::new(SessionController::new(
            client.clone(),
            store.clone(),
            &self.config,
        )?);

        client.fail_connect(self.fail_startup_connect);
        controller.startup().await;
        client.fail_connect(false);
        client.clear_calls().await;

        Ok(TestHarness {
            controller,
            client,
            store,
            config: self.config,
            _media_dir: media_dir,
        })
    }
}

/// A controller plus handles on its mocks.
pub struct TestHarness {
    pub controller: Arc<SessionController>,
    pub client: Arc<MockProtocolClient>,
    pub store: Arc<MockDeviceStore>,
    pub config: WabridgeConfig,
    _media_dir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Unpaired harness with default settings.
    pub async fn new() -> Result<Self, BridgeError> {
        Self::builder().build().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wabridge_core::PairingState;

    #[tokio::test]
    async fn unpaired_by_default() {
        let harness = TestHarness::new().await.unwrap();
        assert_eq!(harness.controller.session().state(), PairingState::Unpaired);
        assert!(harness.client.calls().await.is_empty());
    }

    #[tokio::test]
    async fn paired_harness_is_connected() {
        let harness = TestHarness::builder().paired().build().await.unwrap();
        assert_eq!(harness.controller.session().state(), PairingState::Connected);
        assert!(harness.controller.status().paired);
    }

    #[tokio::test]
    async fn offline_harness_keeps_identity() {
        let harness = TestHarness::builder()
            .paired_but_offline()
            .build()
            .await
            .unwrap();
        let snapshot = harness.controller.session().snapshot();
        assert_eq!(snapshot.state, PairingState::Disconnected);
        assert!(snapshot.identity.is_some());
        assert!(harness.store.current().await.is_some());
    }
}
