// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST facade over the wabridge session engine.
//!
//! Every route is a thin adapter: decode the request, call the
//! [`SessionController`](wabridge_session::SessionController), and wrap the
//! outcome in the [`ApiResponse`](handlers::ApiResponse) envelope.

pub mod auth;
pub mod handlers;
pub mod server;

pub use handlers::ApiResponse;
pub use server::{GatewayState, router, serve};
