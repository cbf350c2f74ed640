// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook dispatcher for inbound message notifications.
//!
//! Each notification is POSTed once. Failures are logged, never retried.

use tracing::{debug, warn};
use wabridge_config::model::WebhookConfig;
use wabridge_core::BridgeError;
use wabridge_core::types::WebhookNotification;

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// No webhook configured.
    Skipped,
    Delivered { status: u16 },
    /// The receiver answered with a non-2xx status.
    Rejected { status: u16 },
    /// Transport-level failure (connect, timeout, ...).
    Failed,
}

/// POSTs [`WebhookNotification`]s to the configured URL.
#[derive(Debug, Clone)]
pub struct WebhookDispatcher {
    http: reqwest::Client,
    url: Option<String>,
}

impl WebhookDispatcher {
    pub fn new(config: &WebhookConfig) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: config.target().map(str::to_string),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    /// Deliver `notification`. Never fails; the outcome is returned for logging and tests.
    pub async fn dispatch(&self, notification: &WebhookNotification) -> DeliveryOutcome {
        let Some(url) = self.url.as_deref() else {
            debug!("no webhook configured, skipping notification");
            return DeliveryOutcome::Skipped;
        };

        match self.http.post(url).json(notification).send().await {
            Ok(response) if response.status().is_success() => {
                let status = response.status().as_u16();
                debug!(status, "webhook delivered");
                DeliveryOutcome::Delivered { status }
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                warn!(status, body = %body, "webhook rejected notification");
                DeliveryOutcome::Rejected { status }
            }
            Err(e) => {
                warn!(error = %e, "webhook delivery failed");
                DeliveryOutcome::Failed
            }
        }
    }
}
