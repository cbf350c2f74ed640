// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for wabridge.
//!
//! Deterministic stand-ins for the protocol daemon so the session engine
//! and the gateway can be exercised without a network.
//!
//! - [`MockProtocolClient`]: scripted pairing events, injectable protocol
//!   events and failures, recorded calls
//! - [`MockDeviceStore`]: in-memory device identity
//! - [`TestHarness`]: a [`SessionController`](wabridge_session::SessionController)
//!   wired to both mocks

pub mod harness;
pub mod mock_client;
pub mod mock_store;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_client::{MockProtocolClient, ProtocolCall};
pub use mock_store::MockDeviceStore;

/// Builds an inbound envelope from `sender` in a one-to-one chat.
pub fn inbound_info(id: &str, sender: &str) -> wabridge_core::types::MessageInfo {
    wabridge_core::types::MessageInfo {
        id: id.to_string(),
        sender: sender.to_string(),
        chat: sender.to_string(),
        timestamp: chrono::Utc::now(),
        push_name: String::new(),
        is_from_me: false,
    }
}
