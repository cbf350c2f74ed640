// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message classification and forwarding.
//!
//! [`classify`] is pure: it maps each payload variant to a summary line and
//! a metadata block. [`InboundProcessor`] adds the side effects around it:
//! self-message filtering, read receipts, background image retrieval, and
//! the webhook POST.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use wabridge_core::ProtocolClient;
use wabridge_core::types::{
    AttachmentMetadata, DownloadableMedia, InboundMessage, InboundPayload, WebhookNotification,
};

use crate::media_store::MediaStore;
use crate::state::Session;
use crate::webhook::{DeliveryOutcome, WebhookDispatcher};

/// Result of classifying one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub summary: String,
    pub attachment: Option<AttachmentMetadata>,
    /// Media to retrieve in the background, for images.
    pub download: Option<DownloadableMedia>,
}

/// Classify a message by payload variant.
pub fn classify(message: &InboundMessage) -> Classification {
    let id = &message.info.id;
    let (summary, attachment, download) = match &message.payload {
        InboundPayload::Text { text } => (text.clone(), None, None),
        InboundPayload::Image(image) => {
            let caption = image.caption.clone().unwrap_or_default();
            (
                with_detail("Image received", &caption),
                Some(AttachmentMetadata::Image {
                    caption,
                    mimetype: image.mimetype.clone(),
                    file_length: image.file_length,
                    width: image.width,
                    height: image.height,
                    url: MediaStore::retrieval_path(id),
                }),
                image.media.clone(),
            )
        }
        InboundPayload::Document(doc) => {
            let title = doc.title.clone().unwrap_or_default();
            (
                with_detail("Document received", &title),
                Some(AttachmentMetadata::Document {
                    title,
                    mimetype: doc.mimetype.clone(),
                    file_length: doc.file_length,
                    page_count: doc.page_count,
                }),
                None,
            )
        }
        InboundPayload::Audio(audio) => (
            "Audio message received".to_string(),
            Some(AttachmentMetadata::Audio {
                mimetype: audio.mimetype.clone(),
                file_length: audio.file_length,
                seconds: audio.seconds,
            }),
            None,
        ),
        InboundPayload::Video(video) => {
            let caption = video.caption.clone().unwrap_or_default();
            (
                with_detail("Video received", &caption),
                Some(AttachmentMetadata::Video {
                    caption,
                    mimetype: video.mimetype.clone(),
                    file_length: video.file_length,
                    seconds: video.seconds,
                    width: video.width,
                    height: video.height,
                }),
                None,
            )
        }
        InboundPayload::Sticker(sticker) => (
            "Sticker received".to_string(),
            Some(AttachmentMetadata::Sticker {
                mimetype: sticker.mimetype.clone(),
                file_length: sticker.file_length,
                width: sticker.width,
                height: sticker.height,
            }),
            None,
        ),
        InboundPayload::Contact(contact) => (
            with_detail("Contact received", &contact.display_name),
            Some(AttachmentMetadata::Contact {
                display_name: contact.display_name.clone(),
                vcard: contact.vcard.clone(),
            }),
            None,
        ),
        InboundPayload::Location(location) => (
            with_detail("Location received", &location.name),
            Some(AttachmentMetadata::Location {
                name: location.name.clone(),
                address: location.address.clone(),
                latitude: location.latitude,
                longitude: location.longitude,
            }),
            None,
        ),
        InboundPayload::Unrecognized => ("Non-text message received".to_string(), None, None),
    };

    Classification {
        summary,
        attachment,
        download,
    }
}

fn with_detail(label: &str, detail: &str) -> String {
    if detail.is_empty() {
        label.to_string()
    } else {
        format!("{label}: {detail}")
    }
}

/// What happened to an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundDisposition {
    /// Sent by this device; nothing was done.
    Discarded,
    Processed {
        notification: WebhookNotification,
        delivery: DeliveryOutcome,
    },
}

/// Handles inbound messages on the event loop.
#[derive(Clone)]
pub struct InboundProcessor {
    client: Arc<dyn ProtocolClient>,
    session: Session,
    media: MediaStore,
    webhook: WebhookDispatcher,
    tracker: TaskTracker,
}

impl InboundProcessor {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        session: Session,
        media: MediaStore,
        webhook: WebhookDispatcher,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            client,
            session,
            media,
            webhook,
            tracker,
        }
    }

    pub async fn handle(&self, message: InboundMessage) -> InboundDisposition {
        if self.is_own(&message) {
            debug!(message_id = %message.info.id, "ignoring self-originated message");
            return InboundDisposition::Discarded;
        }

        let info = &message.info;
        if let Err(e) = self
            .client
            .mark_read(
                std::slice::from_ref(&info.id),
                info.timestamp,
                &info.chat,
                &info.sender,
            )
            .await
        {
            warn!(message_id = %info.id, error = %e, "failed to mark message as read");
        }

        let classification = classify(&message);
        info!(
            message_id = %info.id,
            sender = %info.sender,
            chat = %info.chat,
            group = info.is_group(),
            summary = %classification.summary,
            "inbound message"
        );

        if let Some(media) = classification.download {
            self.spawn_download(info.id.clone(), media);
        }

        let notification = WebhookNotification {
            event: "message".to_string(),
            message: Some(classification.summary),
            sender: Some(info.sender.clone()),
            chat: Some(info.chat.clone()),
            time: info.timestamp,
            attachment: classification.attachment,
        };
        let delivery = self.webhook.dispatch(&notification).await;

        InboundDisposition::Processed {
            notification,
            delivery,
        }
    }

    fn is_own(&self, message: &InboundMessage) -> bool {
        if message.info.is_from_me {
            return true;
        }
        self.session
            .identity()
            .is_some_and(|own| own.user() == message.info.sender_user())
    }

    fn spawn_download(&self, message_id: String, media: DownloadableMedia) {
        let client = self.client.clone();
        let store = self.media.clone();
        self.tracker.spawn(async move {
            let bytes = match client.download(&media).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "image download failed");
                    return;
                }
            };
            match store.save_image(&message_id, &bytes).await {
                Ok(path) => info!(message_id = %message_id, path = %path.display(), "image saved"),
                Err(e) => warn!(message_id = %message_id, error = %e, "failed to save image"),
            }
        });
    }
}
