// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seams between the session engine and the underlying protocol implementation.
//!
//! Both traits use `#[async_trait]` so they can be held as `Arc<dyn ...>`.

pub mod protocol;
pub mod store;

pub use protocol::ProtocolClient;
pub use store::DeviceStore;
