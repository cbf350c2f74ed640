// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for wabridge.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level wabridge configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WabridgeConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Connection to the protocol daemon.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    #[serde(default)]
    pub pairing: PairingConfig,

    /// Outgoing notifications for inbound messages.
    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub media: MediaConfig,

    #[serde(default)]
    pub outbound: OutboundConfig,
}

/// Service identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "wabridge".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// When set, every route except `/health` and `/images/*` requires
    /// `Authorization: Bearer <token>`.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// How long in-flight work may run after a shutdown signal.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

/// Protocol daemon connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    /// `host:port` of the daemon's JSON-RPC socket.
    #[serde(default = "default_sidecar_address")]
    pub sidecar_address: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            sidecar_address: default_sidecar_address(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ProtocolConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_sidecar_address() -> String {
    "127.0.0.1:7780".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Pairing (QR login) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PairingConfig {
    /// How long `/pair` waits for the first code.
    #[serde(default = "default_qr_timeout_secs")]
    pub qr_timeout_secs: u64,

    /// Upper bound on a whole attempt, from the first code until the phone
    /// scans one. The attempt is abandoned when it elapses.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Pause between tearing down the old session and starting a new one.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Minimum edge length of the rendered QR PNG.
    #[serde(default = "default_qr_size_px")]
    pub qr_size_px: u32,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            qr_timeout_secs: default_qr_timeout_secs(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            qr_size_px: default_qr_size_px(),
        }
    }
}

impl PairingConfig {
    pub fn qr_timeout(&self) -> Duration {
        Duration::from_secs(self.qr_timeout_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_qr_timeout_secs() -> u64 {
    15
}

fn default_attempt_timeout_secs() -> u64 {
    180
}

fn default_settle_delay_ms() -> u64 {
    2000
}

fn default_qr_size_px() -> u32 {
    256
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Receiver URL. Inbound messages are still processed when unset.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

impl WebhookConfig {
    /// The configured URL, treating an empty string as unset.
    pub fn target(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

/// Attachment fetch, normalization, and inbound media storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory holding downloaded inbound images.
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Quality used when re-encoding images to JPEG (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            jpeg_quality: default_jpeg_quality(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl MediaConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn default_download_dir() -> String {
    "downloads".to_string()
}

fn default_jpeg_quality() -> u8 {
    85
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

/// Outbound send behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutboundConfig {
    /// Maximum body length in characters.
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    /// Send a "composing" indicator before delivering messages.
    #[serde(default = "default_typing_indicator")]
    pub typing_indicator: bool,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            typing_indicator: default_typing_indicator(),
        }
    }
}

fn default_max_text_chars() -> usize {
    4096
}

fn default_typing_indicator() -> bool {
    true
}
