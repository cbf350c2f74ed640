// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound composer: turns one [`OutboundRequest`] into an ordered list of
//! protocol messages and sends them sequentially.
//!
//! Packaging rule: body text plus exactly one image attachment becomes a
//! single image message captioned with the body. Any other combination sends
//! the text first, then one message per attachment in input order.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wabridge_config::model::OutboundConfig;
use wabridge_core::types::{
    AttachmentKind, AttachmentSpec, ComposedMessage, OutboundRequest, SentKind, SentUnit,
};
use wabridge_core::{BridgeError, ChatAddress, ProtocolClient};

use crate::attachment::AttachmentPipeline;
use crate::state::Session;

const DEFAULT_DOCUMENT_NAME: &str = "document";

/// One message the composer intends to send.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedMessage<'a> {
    Text(&'a str),
    /// An image captioned with the request body.
    CaptionedImage {
        attachment: &'a AttachmentSpec,
        caption: &'a str,
    },
    Attachment(&'a AttachmentSpec),
}

impl PlannedMessage<'_> {
    /// Result entry for this message once sent at 1-based `index`.
    pub fn sent_unit(&self, index: usize) -> SentUnit {
        match self {
            PlannedMessage::Text(body) => SentUnit {
                index,
                kind: SentKind::Text,
                content: Some(body.to_string()),
                filename: None,
            },
            PlannedMessage::CaptionedImage {
                attachment,
                caption,
            } => SentUnit {
                index,
                kind: SentKind::ImageWithCaption,
                content: Some(caption.to_string()),
                filename: attachment.filename().map(str::to_string),
            },
            PlannedMessage::Attachment(attachment) => SentUnit {
                index,
                kind: attachment.kind.into(),
                content: None,
                filename: attachment.filename().map(str::to_string),
            },
        }
    }
}

/// Decide how many messages a request becomes and in what order.
pub fn plan_messages(request: &OutboundRequest) -> Vec<PlannedMessage<'_>> {
    let body = request.body();

    if let (Some(caption), [only]) = (body, request.attachments.as_slice())
        && only.kind == AttachmentKind::Image
    {
        return vec![PlannedMessage::CaptionedImage {
            attachment: only,
            caption,
        }];
    }

    body.map(PlannedMessage::Text)
        .into_iter()
        .chain(request.attachments.iter().map(PlannedMessage::Attachment))
        .collect()
}

/// Validates, composes, and sends outbound requests.
pub struct Composer {
    client: Arc<dyn ProtocolClient>,
    pipeline: AttachmentPipeline,
    session: Session,
    max_text_chars: usize,
    typing_indicator: bool,
}

impl Composer {
    pub fn new(
        client: Arc<dyn ProtocolClient>,
        pipeline: AttachmentPipeline,
        session: Session,
        config: &OutboundConfig,
    ) -> Self {
        Self {
            client,
            pipeline,
            session,
            max_text_chars: config.max_text_chars,
            typing_indicator: config.typing_indicator,
        }
    }

    /// Send every message of `request` in order.
    ///
    /// Guard and attachment failures happen before anything is sent. A send
    /// failure aborts the rest and reports its 1-based position; earlier
    /// messages stay delivered.
    pub async fn send(&self, request: &OutboundRequest) -> Result<Vec<SentUnit>, BridgeError> {
        if !(self.session.state().is_connected() && self.client.is_connected()) {
            return Err(BridgeError::NotPaired);
        }

        let to = request.validate(self.max_text_chars)?;
        let plan = plan_messages(request);

        let mut composed = Vec::with_capacity(plan.len());
        for planned in &plan {
            composed.push(self.compose(planned).await?);
        }

        if self.typing_indicator {
            self.send_typing(&to).await;
        }

        let mut sent = Vec::with_capacity(plan.len());
        for (i, (planned, message)) in plan.iter().zip(&composed).enumerate() {
            let index = i + 1;
            let id = self
                .client
                .send_message(&to, message)
                .await
                .map_err(|e| BridgeError::SendFailed {
                    index,
                    message: e.to_string(),
                })?;
            debug!(to = %to, index, message_id = %id.0, "message sent");
            sent.push(planned.sent_unit(index));
        }

        info!(to = %to, count = sent.len(), "outbound request delivered");
        Ok(sent)
    }

    async fn compose(&self, planned: &PlannedMessage<'_>) -> Result<ComposedMessage, BridgeError> {
        let (attachment, caption) = match planned {
            PlannedMessage::Text(body) => {
                return Ok(ComposedMessage::Text {
                    body: body.to_string(),
                });
            }
            PlannedMessage::CaptionedImage {
                attachment,
                caption,
            } => (*attachment, caption.to_string()),
            PlannedMessage::Attachment(attachment) => {
                (*attachment, attachment.caption().unwrap_or_default().to_string())
            }
        };

        let media = self.pipeline.fetch_and_normalize(attachment).await?;
        Ok(match attachment.kind {
            AttachmentKind::Image => ComposedMessage::Image { media, caption },
            AttachmentKind::Video => ComposedMessage::Video { media, caption },
            AttachmentKind::Audio => ComposedMessage::Audio { media },
            AttachmentKind::Document => {
                let name = attachment
                    .filename()
                    .unwrap_or(DEFAULT_DOCUMENT_NAME)
                    .to_string();
                ComposedMessage::Document {
                    media,
                    title: name.clone(),
                    file_name: name,
                }
            }
        })
    }

    async fn send_typing(&self, to: &ChatAddress) {
        let target = to.to_non_device();
        if let Err(e) = self.client.send_typing(&target).await {
            warn!(to = %target, error = %e, "failed to send typing indicator");
        }
    }
}
