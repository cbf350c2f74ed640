// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Termination signal handling.
//!
//! SIGTERM and SIGINT (Ctrl+C) cancel a shared [`CancellationToken`] that
//! the HTTP server and the event loop both watch.

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Spawns a task that cancels the returned token on SIGTERM or SIGINT.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            signal = termination() => {
                info!(signal, "termination signal received, shutting down");
                trigger.cancel();
            }
            _ = trigger.cancelled() => debug!("shutdown triggered elsewhere"),
        }
    });

    token
}

/// Resolves with the name of the first termination signal delivered.
#[cfg(unix)]
async fn termination() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!(error = %e, "failed to install SIGTERM handler, only Ctrl+C will stop the service");
            return interrupt().await;
        }
    };
    tokio::select! {
        name = interrupt() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn termination() -> &'static str {
    interrupt().await
}

async fn interrupt() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
