// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wabridge serve` command implementation.
//!
//! Wires the protocol daemon client into the session controller, reconnects
//! a stored device, then runs the event loop and the HTTP gateway until a
//! termination signal arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wabridge_config::WabridgeConfig;
use wabridge_core::BridgeError;
use wabridge_gateway::GatewayState;
use wabridge_session::{SessionController, install_signal_handler};
use wabridge_sidecar::SidecarClient;

/// Runs the `wabridge serve` command.
pub async fn run_serve(config: WabridgeConfig) -> Result<(), BridgeError> {
    init_tracing(&config.service.log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        "starting wabridge serve"
    );

    let sidecar = Arc::new(SidecarClient::new(&config.protocol));
    info!(address = sidecar.address(), "using protocol daemon");

    let controller = Arc::new(SessionController::new(
        sidecar.clone(),
        sidecar,
        &config,
    )?);

    let state = controller.startup().await;
    info!(%state, "session initialized");
    if config.webhook.target().is_none() {
        info!("no webhook configured, inbound messages are only logged");
    }

    let cancel = install_signal_handler();

    let events = {
        let controller = Arc::clone(&controller);
        let cancel = cancel.clone();
        tokio::spawn(async move { controller.run_events(cancel).await })
    };

    let grace = config.server.shutdown_grace();
    let gateway = {
        let server = config.server.clone();
        let state = GatewayState {
            controller: Arc::clone(&controller),
        };
        let cancel = cancel.clone();
        tokio::spawn(async move { wabridge_gateway::serve(&server, state, cancel).await })
    };
    let gateway = join_gateway(gateway, &cancel, grace).await;

    cancel.cancel();
    if let Err(e) = events.await {
        error!(error = %e, "event loop task failed");
    }

    controller.shutdown(grace).await;

    info!("wabridge serve shutdown complete");
    gateway
}

/// Waits for the gateway task. Once `cancel` fires, in-flight requests get
/// at most `grace` to finish before the task is aborted.
///
/// The gateway only returns on its own after a bind or serve failure.
async fn join_gateway(
    mut gateway: JoinHandle<Result<(), BridgeError>>,
    cancel: &CancellationToken,
    grace: Duration,
) -> Result<(), BridgeError> {
    let joined = tokio::select! {
        joined = &mut gateway => joined,
        _ = cancel.cancelled() => match tokio::time::timeout(grace, &mut gateway).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(grace = ?grace, "in-flight requests outlived the grace period, dropping them");
                gateway.abort();
                return Ok(());
            }
        },
    };
    joined.map_err(|e| BridgeError::Internal(format!("gateway task failed: {e}")))?
}

/// Initializes the tracing subscriber with the given log level.
///
/// `RUST_LOG` takes precedence when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("wabridge={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
