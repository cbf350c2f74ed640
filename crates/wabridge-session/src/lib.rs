// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message exchange and session lifecycle engine for wabridge.
//!
//! The [`SessionController`] composes:
//! - [`PairingManager`]: QR pairing and its background listener
//! - [`Composer`]: outbound packaging over the [`AttachmentPipeline`]
//! - [`InboundProcessor`]: classification, read receipts, image retrieval,
//!   and [`WebhookDispatcher`] notifications
//!
//! All of them share one [`Session`] handle.

pub mod attachment;
pub mod composer;
pub mod inbound;
pub mod lifecycle;
pub mod media_store;
pub mod pairing;
pub mod shutdown;
pub mod state;
pub mod webhook;

pub use attachment::AttachmentPipeline;
pub use composer::{Composer, PlannedMessage, plan_messages};
pub use inbound::{Classification, InboundDisposition, InboundProcessor, classify};
pub use lifecycle::{DeviceInfo, SessionController, SessionStatus};
pub use media_store::{MediaStore, StoredMedia};
pub use pairing::PairingManager;
pub use shutdown::install_signal_handler;
pub use state::{Session, SessionSnapshot};
pub use webhook::{DeliveryOutcome, WebhookDispatcher};
