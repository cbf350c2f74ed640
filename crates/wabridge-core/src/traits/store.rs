// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device credential store trait.

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::types::DeviceIdentity;

/// Persistent store holding the paired device identity.
#[async_trait]
pub trait DeviceStore: Send + Sync + 'static {
    /// Returns the stored identity, or `None` when the device is unpaired.
    async fn device_identity(&self) -> Result<Option<DeviceIdentity>, BridgeError>;

    /// Deletes the stored identity so the next connection must pair again.
    async fn delete_identity(&self) -> Result<(), BridgeError>;
}
