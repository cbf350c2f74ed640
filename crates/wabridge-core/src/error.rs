// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for wabridge.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Maximum number of characters of a rejected attachment source echoed back
/// in [`BridgeError::UnsupportedSourceScheme`].
const SOURCE_PREVIEW_CHARS: usize = 50;

/// The primary error type used across the protocol traits and the session engine.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors (missing mandatory values, invalid combinations).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed caller input (missing number, empty request, oversized text).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An outbound action was attempted while the session is not connected and paired.
    #[error("not paired with WhatsApp, use /pair first")]
    NotPaired,

    /// No pairing code arrived within the pairing window.
    #[error("pairing timed out after {duration:?} waiting for a QR code")]
    PairingTimeout { duration: Duration },

    /// Another caller is still waiting for the first code of a pairing attempt.
    #[error("a pairing attempt is already in progress")]
    PairingBusy,

    /// The pairing channel reported something other than a renderable code.
    #[error("pairing failed: {kind}")]
    Pairing { kind: PairingErrorKind },

    /// Attachment source is not an HTTP/HTTPS URL.
    #[error("attachment URL must be a publicly accessible HTTP/HTTPS link, found: {preview}")]
    UnsupportedSourceScheme { preview: String },

    /// Attachment fetch failed (non-2xx status or transport error).
    #[error("failed to fetch attachment: {message}")]
    FetchFailed {
        status: Option<u16>,
        message: String,
    },

    /// Image bytes could not be decoded for JPEG normalization.
    #[error("failed to decode image: {message}")]
    ImageDecodeFailed { message: String },

    /// The protocol client rejected a media upload.
    #[error("failed to upload attachment: {message}")]
    UploadFailed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Sending a composed message failed. `index` is 1-based: `index - 1`
    /// messages of the request were delivered before the failure.
    #[error("failed to send message {index}: {message}")]
    SendFailed { index: usize, message: String },

    /// Protocol client errors (connection failure, daemon error, malformed reply).
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Local storage errors (media files, credential store).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Builds an [`UnsupportedSourceScheme`](BridgeError::UnsupportedSourceScheme)
    /// error that echoes at most the first 50 characters of the source.
    pub fn unsupported_source(source: &str) -> Self {
        BridgeError::UnsupportedSourceScheme {
            preview: source.chars().take(SOURCE_PREVIEW_CHARS).collect(),
        }
    }

    /// Shorthand for a [`Protocol`](BridgeError::Protocol) error without a source.
    pub fn protocol(message: impl Into<String>) -> Self {
        BridgeError::Protocol {
            message: message.into(),
            source: None,
        }
    }
}

/// Non-code outcomes of a pairing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingErrorKind {
    ClientOutdated,
    ScannedWithoutMultidevice,
    DeviceLimitExceeded,
    AlreadyConnected,
    /// The protocol client reported a generic error.
    Generic(String),
    /// The first event was neither a code nor an error (e.g. `success`, `timeout`).
    Unexpected(String),
}

impl PairingErrorKind {
    /// Wire tag of the variant, as reported by the protocol client.
    pub fn tag(&self) -> &str {
        match self {
            PairingErrorKind::ClientOutdated => "err-client-outdated",
            PairingErrorKind::ScannedWithoutMultidevice => "err-scanned-without-multidevice",
            PairingErrorKind::DeviceLimitExceeded => "err-device-limit-exceeded",
            PairingErrorKind::AlreadyConnected => "err-already-connected",
            PairingErrorKind::Generic(_) => "error",
            PairingErrorKind::Unexpected(tag) => tag,
        }
    }

    /// Operator-facing remediation for the failure.
    pub fn remediation(&self) -> &'static str {
        match self {
            PairingErrorKind::ClientOutdated => "update the protocol daemon to a current release",
            PairingErrorKind::ScannedWithoutMultidevice => {
                "enable multi-device on the phone under Settings > Linked Devices"
            }
            PairingErrorKind::DeviceLimitExceeded => {
                "remove an unused device under Settings > Linked Devices"
            }
            PairingErrorKind::AlreadyConnected => "disconnect the other session first",
            PairingErrorKind::Generic(_) | PairingErrorKind::Unexpected(_) => {
                "check the daemon logs and retry /pair"
            }
        }
    }
}

impl fmt::Display for PairingErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingErrorKind::Generic(message) if !message.is_empty() => {
                write!(f, "error ({message})")
            }
            other => f.write_str(other.tag()),
        }
    }
}
