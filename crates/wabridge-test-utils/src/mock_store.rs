// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory device store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use wabridge_core::{BridgeError, DeviceIdentity, DeviceStore};

/// Device store holding at most one identity in memory.
#[derive(Default)]
pub struct MockDeviceStore {
    identity: Mutex<Option<DeviceIdentity>>,
    deletes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MockDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `jid`.
    pub fn with_identity(jid: &str) -> Self {
        Self {
            identity: Mutex::new(Some(DeviceIdentity::new(jid))),
            ..Self::default()
        }
    }

    pub async fn set_identity(&self, jid: &str) {
        *self.identity.lock().await = Some(DeviceIdentity::new(jid));
    }

    pub async fn current(&self) -> Option<DeviceIdentity> {
        self.identity.lock().await.clone()
    }

    /// Number of `delete_identity` calls, successful or not.
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceStore for MockDeviceStore {
    async fn device_identity(&self) -> Result<Option<DeviceIdentity>, BridgeError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BridgeError::Storage {
                source: Box::new(std::io::Error::other("mock store read failure")),
            });
        }
        Ok(self.identity.lock().await.clone())
    }

    async fn delete_identity(&self) -> Result<(), BridgeError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BridgeError::Storage {
                source: Box::new(std::io::Error::other("mock store delete failure")),
            });
        }
        *self.identity.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delete_clears_identity() {
        let store = MockDeviceStore::with_identity("1:2@s.whatsapp.net");
        assert!(store.device_identity().await.unwrap().is_some());
        store.delete_identity().await.unwrap();
        assert!(store.device_identity().await.unwrap().is_none());
        assert_eq!(store.delete_count(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MockDeviceStore::with_identity("1@s.whatsapp.net");
        store.fail_deletes(true);
        assert!(store.delete_identity().await.is_err());
        assert!(store.current().await.is_some());
    }
}
