// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data model shared by the protocol traits, the session engine, and the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{BridgeError, PairingErrorKind};

/// Server suffix for individual user addresses.
pub const USER_SERVER: &str = "s.whatsapp.net";

/// Server suffix for group addresses.
pub const GROUP_SERVER: &str = "g.us";

/// Unique identifier for a message, as assigned by the protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

// --- Session ---

/// Pairing and connection state of the process-wide session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    Unpaired,
    PairingInProgress,
    Paired,
    Connected,
    /// A device identity exists but the connection is down.
    Disconnected,
}

impl PairingState {
    /// True while the session holds a usable, paired device identity.
    pub fn is_paired(self) -> bool {
        matches!(self, PairingState::Paired | PairingState::Connected)
    }

    /// True only in the connected state, which implies paired.
    pub fn is_connected(self) -> bool {
        matches!(self, PairingState::Connected)
    }
}

/// Persisted credential handle identifying an already-paired device.
///
/// `jid` has the protocol's device form, e.g. `15551234567:12@s.whatsapp.net`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub jid: String,
}

impl DeviceIdentity {
    pub fn new(jid: impl Into<String>) -> Self {
        Self { jid: jid.into() }
    }

    /// The account part of the identity (the phone number for user accounts).
    pub fn user(&self) -> &str {
        user_part(&self.jid)
    }
}

/// Strips the server, device, and agent suffixes from a protocol address.
fn user_part(address: &str) -> &str {
    let local = address.split('@').next().unwrap_or(address);
    let local = local.split(':').next().unwrap_or(local);
    local.split('.').next().unwrap_or(local)
}

/// Normalized destination address for outbound messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatAddress(String);

impl ChatAddress {
    /// Parses a caller-supplied target.
    ///
    /// Phone numbers (country code included, optional leading `+`) become
    /// `<digits>@s.whatsapp.net`. Inputs that already contain `@` are taken
    /// as full addresses, which is how group chats are addressed.
    pub fn parse(input: &str) -> Result<Self, BridgeError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(BridgeError::InvalidRequest("Number is required".into()));
        }

        if let Some((user, server)) = trimmed.split_once('@') {
            if user.is_empty() || server.is_empty() || server.contains('@') {
                return Err(BridgeError::InvalidRequest(format!(
                    "Invalid phone number: malformed address `{trimmed}`"
                )));
            }
            return Ok(Self(trimmed.to_string()));
        }

        let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(BridgeError::InvalidRequest(format!(
                "Invalid phone number: `{trimmed}` must contain only digits"
            )));
        }
        Ok(Self(format!("{digits}@{USER_SERVER}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Server part of the address (`s.whatsapp.net`, `g.us`, ...).
    pub fn server(&self) -> &str {
        self.0.split_once('@').map(|(_, s)| s).unwrap_or("")
    }

    pub fn is_group(&self) -> bool {
        self.server() == GROUP_SERVER
    }

    /// Address without the device suffix. Group addresses are returned as-is.
    pub fn to_non_device(&self) -> ChatAddress {
        if self.is_group() {
            return self.clone();
        }
        match self.0.split_once('@') {
            Some((local, server)) => {
                let user = local.split(':').next().unwrap_or(local);
                ChatAddress(format!("{user}@{server}"))
            }
            None => self.clone(),
        }
    }
}

impl std::fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Outbound ---

/// Declared kind of a caller-supplied attachment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Document,
    Audio,
    Video,
}

/// Media-kind tag handed to the protocol client's upload and download primitives.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Document,
    Audio,
    Video,
}

impl From<AttachmentKind> for MediaKind {
    fn from(kind: AttachmentKind) -> Self {
        match kind {
            AttachmentKind::Image => MediaKind::Image,
            AttachmentKind::Document => MediaKind::Document,
            AttachmentKind::Audio => MediaKind::Audio,
            AttachmentKind::Video => MediaKind::Video,
        }
    }
}

/// One attachment of an [`OutboundRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentSpec {
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    /// HTTP/HTTPS source of the attachment bytes.
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl AttachmentSpec {
    pub fn new(kind: AttachmentKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            filename: None,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Caption, treating an empty string as absent.
    pub fn caption(&self) -> Option<&str> {
        non_empty(self.caption.as_deref())
    }

    /// Filename, treating an empty string as absent.
    pub fn filename(&self) -> Option<&str> {
        non_empty(self.filename.as_deref())
    }
}

/// A caller-supplied unit of outbound work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Target phone number (country code, no `+` required) or full address.
    #[serde(default)]
    pub number: String,
    /// Optional body text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentSpec>,
}

impl OutboundRequest {
    pub fn text(number: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            message: Some(message.into()),
            attachments: Vec::new(),
        }
    }

    /// Body text, treating an empty string as absent.
    pub fn body(&self) -> Option<&str> {
        non_empty(self.message.as_deref())
    }

    /// Checks the request shape without touching the network.
    pub fn validate(&self, max_text_chars: usize) -> Result<ChatAddress, BridgeError> {
        let address = ChatAddress::parse(&self.number)?;

        if self.body().is_none() && self.attachments.is_empty() {
            return Err(BridgeError::InvalidRequest(
                "Either message or attachments are required".into(),
            ));
        }

        if let Some(body) = self.body() {
            let len = body.chars().count();
            if len > max_text_chars {
                return Err(BridgeError::InvalidRequest(format!(
                    "message is {len} characters, the limit is {max_text_chars}"
                )));
            }
        }

        Ok(address)
    }
}

/// Descriptor returned by the protocol client's upload primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub url: String,
    pub direct_path: String,
    #[serde(with = "b64")]
    pub media_key: Vec<u8>,
    #[serde(with = "b64")]
    pub file_sha256: Vec<u8>,
    #[serde(with = "b64")]
    pub file_enc_sha256: Vec<u8>,
}

/// Uploaded-resource descriptor needed to build a typed media message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    pub url: String,
    pub direct_path: String,
    pub mime_type: String,
    pub file_length: u64,
    #[serde(with = "b64")]
    pub media_key: Vec<u8>,
    #[serde(with = "b64")]
    pub file_sha256: Vec<u8>,
    #[serde(with = "b64")]
    pub file_enc_sha256: Vec<u8>,
}

impl MediaReference {
    pub fn from_upload(uploaded: UploadedMedia, mime_type: impl Into<String>, file_length: u64) -> Self {
        Self {
            url: uploaded.url,
            direct_path: uploaded.direct_path,
            mime_type: mime_type.into(),
            file_length,
            media_key: uploaded.media_key,
            file_sha256: uploaded.file_sha256,
            file_enc_sha256: uploaded.file_enc_sha256,
        }
    }
}

/// One fully-formed outbound protocol unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComposedMessage {
    Text {
        body: String,
    },
    Image {
        media: MediaReference,
        caption: String,
    },
    Document {
        media: MediaReference,
        title: String,
        file_name: String,
    },
    Audio {
        media: MediaReference,
    },
    Video {
        media: MediaReference,
        caption: String,
    },
}

impl ComposedMessage {
    /// Caption carried by the message, if its kind has one.
    pub fn caption(&self) -> Option<&str> {
        match self {
            ComposedMessage::Image { caption, .. } | ComposedMessage::Video { caption, .. } => {
                Some(caption)
            }
            _ => None,
        }
    }

    pub fn media(&self) -> Option<&MediaReference> {
        match self {
            ComposedMessage::Text { .. } => None,
            ComposedMessage::Image { media, .. }
            | ComposedMessage::Document { media, .. }
            | ComposedMessage::Audio { media }
            | ComposedMessage::Video { media, .. } => Some(media),
        }
    }
}

/// Effective type of one sent unit, as reported back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SentKind {
    Text,
    ImageWithCaption,
    Image,
    Document,
    Audio,
    Video,
}

impl From<AttachmentKind> for SentKind {
    fn from(kind: AttachmentKind) -> Self {
        match kind {
            AttachmentKind::Image => SentKind::Image,
            AttachmentKind::Document => SentKind::Document,
            AttachmentKind::Audio => SentKind::Audio,
            AttachmentKind::Video => SentKind::Video,
        }
    }
}

/// Result entry for one successfully sent unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentUnit {
    /// 1-based position in the send order.
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: SentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

// --- Inbound ---

/// Envelope metadata of a received message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub id: String,
    pub sender: String,
    pub chat: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub push_name: String,
    #[serde(default)]
    pub is_from_me: bool,
}

impl MessageInfo {
    pub fn is_group(&self) -> bool {
        self.chat.ends_with(&format!("@{GROUP_SERVER}"))
    }

    /// Account part of the sender address.
    pub fn sender_user(&self) -> &str {
        user_part(&self.sender)
    }
}

/// Encrypted-media locator handed back to the protocol client's download primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadableMedia {
    pub kind: MediaKind,
    pub url: String,
    pub direct_path: String,
    #[serde(with = "b64")]
    pub media_key: Vec<u8>,
    #[serde(default, with = "b64")]
    pub file_sha256: Vec<u8>,
    #[serde(default, with = "b64")]
    pub file_enc_sha256: Vec<u8>,
    #[serde(default)]
    pub file_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagePayload {
    pub caption: Option<String>,
    pub mimetype: String,
    pub file_length: u64,
    pub width: u32,
    pub height: u32,
    /// Locator for retrieval; absent when the protocol did not provide one.
    pub media: Option<DownloadableMedia>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentPayload {
    pub title: Option<String>,
    pub mimetype: String,
    pub file_length: u64,
    pub page_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioPayload {
    pub mimetype: String,
    pub file_length: u64,
    pub seconds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoPayload {
    pub caption: Option<String>,
    pub mimetype: String,
    pub file_length: u64,
    pub seconds: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StickerPayload {
    pub mimetype: String,
    pub file_length: u64,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactPayload {
    pub display_name: String,
    pub vcard: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationPayload {
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Content of a received message. The variant set is closed: anything the
/// protocol client does not map lands in [`InboundPayload::Unrecognized`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundPayload {
    Text { text: String },
    Image(ImagePayload),
    Document(DocumentPayload),
    Audio(AudioPayload),
    Video(VideoPayload),
    Sticker(StickerPayload),
    Contact(ContactPayload),
    Location(LocationPayload),
    #[serde(other)]
    Unrecognized,
}

/// One received chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub info: MessageInfo,
    pub payload: InboundPayload,
}

/// Events emitted by the protocol client outside the pairing channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    Message(InboundMessage),
    Connected,
    Disconnected,
    PairSuccess { identity: DeviceIdentity },
    LoggedOut,
    StreamError {
        #[serde(default)]
        code: String,
    },
    ConnectFailure {
        #[serde(default)]
        reason: String,
    },
}

/// Items delivered on the pairing channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PairingEvent {
    /// A renderable pairing code. Codes are refreshed periodically until one is scanned.
    #[serde(rename = "code")]
    Code { code: String },
    #[serde(rename = "success")]
    Success,
    #[serde(rename = "timeout")]
    Timeout,
    #[serde(rename = "err-client-outdated")]
    ClientOutdated,
    #[serde(rename = "err-scanned-without-multidevice")]
    ScannedWithoutMultidevice,
    #[serde(rename = "err-device-limit-exceeded")]
    DeviceLimitExceeded,
    #[serde(rename = "err-already-connected")]
    AlreadyConnected,
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Unknown,
}

impl PairingEvent {
    /// Wire tag of the event.
    pub fn tag(&self) -> &'static str {
        match self {
            PairingEvent::Code { .. } => "code",
            PairingEvent::Success => "success",
            PairingEvent::Timeout => "timeout",
            PairingEvent::ClientOutdated => "err-client-outdated",
            PairingEvent::ScannedWithoutMultidevice => "err-scanned-without-multidevice",
            PairingEvent::DeviceLimitExceeded => "err-device-limit-exceeded",
            PairingEvent::AlreadyConnected => "err-already-connected",
            PairingEvent::Error { .. } => "error",
            PairingEvent::Unknown => "unknown",
        }
    }

    /// True for events after which no further pairing events follow.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PairingEvent::Code { .. } | PairingEvent::Unknown)
    }

    /// Error classification for the event; `None` for `code`.
    pub fn error_kind(&self) -> Option<PairingErrorKind> {
        match self {
            PairingEvent::Code { .. } => None,
            PairingEvent::ClientOutdated => Some(PairingErrorKind::ClientOutdated),
            PairingEvent::ScannedWithoutMultidevice => {
                Some(PairingErrorKind::ScannedWithoutMultidevice)
            }
            PairingEvent::DeviceLimitExceeded => Some(PairingErrorKind::DeviceLimitExceeded),
            PairingEvent::AlreadyConnected => Some(PairingErrorKind::AlreadyConnected),
            PairingEvent::Error { message } => Some(PairingErrorKind::Generic(message.clone())),
            other => Some(PairingErrorKind::Unexpected(other.tag().to_string())),
        }
    }
}

// --- Webhook ---

/// Variant-specific metadata block of a [`WebhookNotification`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AttachmentMetadata {
    Image {
        caption: String,
        mimetype: String,
        file_length: u64,
        width: u32,
        height: u32,
        /// Relative retrieval path of the downloaded file.
        url: String,
    },
    Document {
        title: String,
        mimetype: String,
        file_length: u64,
        page_count: u32,
    },
    Audio {
        mimetype: String,
        file_length: u64,
        seconds: u32,
    },
    Video {
        caption: String,
        mimetype: String,
        file_length: u64,
        seconds: u32,
        width: u32,
        height: u32,
    },
    Sticker {
        mimetype: String,
        file_length: u64,
        width: u32,
        height: u32,
    },
    Contact {
        display_name: String,
        vcard: String,
    },
    Location {
        name: String,
        address: String,
        latitude: f64,
        longitude: f64,
    },
}

/// JSON body POSTed to the webhook for each processed inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<String>,
    pub time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentMetadata>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Standard base64 (de)serialization for binary digests and keys.
mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_address_from_phone_number() {
        let addr = ChatAddress::parse("15551234567").unwrap();
        assert_eq!(addr.as_str(), "15551234567@s.whatsapp.net");
        assert!(!addr.is_group());

        let plus = ChatAddress::parse("+15551234567").unwrap();
        assert_eq!(plus, addr);
    }

    #[test]
    fn chat_address_keeps_group_addresses() {
        let addr = ChatAddress::parse("120363025246125486@g.us").unwrap();
        assert!(addr.is_group());
        assert_eq!(addr.to_non_device(), addr);
    }

    #[test]
    fn chat_address_strips_device_suffix() {
        let addr = ChatAddress::parse("15551234567:12@s.whatsapp.net").unwrap();
        assert_eq!(addr.to_non_device().as_str(), "15551234567@s.whatsapp.net");
    }

    #[test]
    fn chat_address_rejects_garbage() {
        assert!(matches!(
            ChatAddress::parse(""),
            Err(BridgeError::InvalidRequest(_))
        ));
        assert!(ChatAddress::parse("555-CALL-NOW").is_err());
        assert!(ChatAddress::parse("@g.us").is_err());
    }

    #[test]
    fn device_identity_user_strips_device_and_server() {
        let id = DeviceIdentity::new("15551234567:12@s.whatsapp.net");
        assert_eq!(id.user(), "15551234567");
    }

    #[test]
    fn pairing_state_flags() {
        assert!(PairingState::Connected.is_paired());
        assert!(PairingState::Connected.is_connected());
        assert!(PairingState::Paired.is_paired());
        assert!(!PairingState::Paired.is_connected());
        assert!(!PairingState::Disconnected.is_paired());
        assert!(!PairingState::PairingInProgress.is_paired());
        assert_eq!(PairingState::PairingInProgress.to_string(), "pairing_in_progress");
    }

    #[test]
    fn request_validation_requires_content() {
        let empty = OutboundRequest {
            number: "1".into(),
            message: Some(String::new()),
            attachments: vec![],
        };
        match empty.validate(4096) {
            Err(BridgeError::InvalidRequest(msg)) => {
                assert!(msg.contains("Either message or attachments"))
            }
            other => panic!("expected InvalidRequest, got {other:?}"),
        }
    }

    #[test]
    fn request_validation_enforces_text_limit() {
        let long = OutboundRequest::text("1", "x".repeat(4097));
        assert!(long.validate(4096).is_err());
        let ok = OutboundRequest::text("1", "x".repeat(4096));
        assert!(ok.validate(4096).is_ok());
    }

    #[test]
    fn request_deserializes_original_shape() {
        let json = r#"{
            "number": "1",
            "message": "hi",
            "attachments": [{"type": "image", "url": "https://x/a.png", "caption": ""}]
        }"#;
        let req: OutboundRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.body(), Some("hi"));
        assert_eq!(req.attachments[0].kind, AttachmentKind::Image);
        assert_eq!(req.attachments[0].caption(), None);
    }

    #[test]
    fn request_rejects_unknown_attachment_type() {
        let json = r#"{"number": "1", "attachments": [{"type": "gif", "url": "https://x"}]}"#;
        assert!(serde_json::from_str::<OutboundRequest>(json).is_err());
    }

    #[test]
    fn unknown_inbound_payload_is_unrecognized() {
        let json = serde_json::json!({
            "info": {
                "id": "ABC",
                "sender": "1@s.whatsapp.net",
                "chat": "1@s.whatsapp.net",
                "timestamp": "2026-01-01T00:00:00Z"
            },
            "payload": {"type": "poll_creation", "name": "lunch?"}
        });
        let msg: InboundMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg.payload, InboundPayload::Unrecognized);
        assert!(!msg.info.is_from_me);
    }

    #[test]
    fn pairing_event_wire_tags() {
        let evt: PairingEvent =
            serde_json::from_str(r#"{"event":"err-device-limit-exceeded"}"#).unwrap();
        assert_eq!(evt, PairingEvent::DeviceLimitExceeded);
        assert_eq!(evt.error_kind(), Some(PairingErrorKind::DeviceLimitExceeded));

        let code: PairingEvent =
            serde_json::from_str(r#"{"event":"code","code":"2@abc"}"#).unwrap();
        assert!(!code.is_terminal());
        assert_eq!(code.error_kind(), None);

        let odd: PairingEvent = serde_json::from_str(r#"{"event":"something-new"}"#).unwrap();
        assert_eq!(odd, PairingEvent::Unknown);
    }

    #[test]
    fn webhook_notification_shape() {
        let notification = WebhookNotification {
            event: "message".into(),
            message: Some("Image received: cat".into()),
            sender: Some("1@s.whatsapp.net".into()),
            chat: Some("1@s.whatsapp.net".into()),
            time: "2026-01-01T00:00:00Z".parse().unwrap(),
            attachment: Some(AttachmentMetadata::Image {
                caption: "cat".into(),
                mimetype: "image/jpeg".into(),
                file_length: 10,
                width: 1,
                height: 2,
                url: "/images/ABC.jpg".into(),
            }),
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["attachment"]["type"], "image");
        assert_eq!(value["attachment"]["url"], "/images/ABC.jpg");
        assert_eq!(value["time"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn media_reference_round_trips_digests_as_base64() {
        let media = MediaReference {
            url: "https://mmg/x".into(),
            direct_path: "/v/t62/x".into(),
            mime_type: "image/jpeg".into(),
            file_length: 3,
            media_key: vec![1, 2, 3],
            file_sha256: vec![4],
            file_enc_sha256: vec![5],
        };
        let value = serde_json::to_value(&media).unwrap();
        assert_eq!(value["media_key"], "AQID");
        let back: MediaReference = serde_json::from_value(value).unwrap();
        assert_eq!(back, media);
    }
}
