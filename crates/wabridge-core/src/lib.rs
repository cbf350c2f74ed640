// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for wabridge.
//!
//! This crate provides the protocol seams, error types, and the shared data
//! model used by the session engine, the sidecar client, and the HTTP gateway.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BridgeError, PairingErrorKind};
pub use types::{ChatAddress, DeviceIdentity, MessageId, PairingState};

pub use traits::{DeviceStore, ProtocolClient};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_error_variants_construct() {
        let _config = BridgeError::Config("test".into());
        let _storage = BridgeError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _protocol = BridgeError::protocol("test");
        let _upload = BridgeError::UploadFailed {
            message: "test".into(),
            source: None,
        };
        let _internal = BridgeError::Internal("test".into());
    }

    #[test]
    fn pairing_state_round_trips_through_strum() {
        use std::str::FromStr;

        let variants = [
            PairingState::Unpaired,
            PairingState::PairingInProgress,
            PairingState::Paired,
            PairingState::Connected,
            PairingState::Disconnected,
        ];
        for variant in &variants {
            let parsed = PairingState::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn traits_are_object_safe() {
        fn _assert_protocol(_: &dyn ProtocolClient) {}
        fn _assert_store(_: &dyn DeviceStore) {}
    }
}
