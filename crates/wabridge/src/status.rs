// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `wabridge status` command implementation.
//!
//! Queries the health endpoint of a running instance and reports the
//! session state. Falls back gracefully when nothing is listening.

use std::io::IsTerminal;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wabridge_config::WabridgeConfig;
use wabridge_core::BridgeError;
use wabridge_gateway::ApiResponse;

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// `data` block of GET /health.
#[derive(Debug, Default, Deserialize)]
struct HealthData {
    version: String,
    paired: bool,
    connected: bool,
    webhook_configured: bool,
    state: String,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub endpoint: String,
    pub version: Option<String>,
    pub state: Option<String>,
    pub paired: bool,
    pub connected: bool,
    pub webhook_configured: bool,
}

impl StatusReport {
    fn offline(endpoint: String) -> Self {
        Self {
            running: false,
            endpoint,
            version: None,
            state: None,
            paired: false,
            connected: false,
            webhook_configured: false,
        }
    }
}

/// Health URL of the local instance. A wildcard bind address is queried on loopback.
fn health_url(config: &WabridgeConfig) -> String {
    let host = match config.server.host.as_str() {
        "0.0.0.0" | "::" | "[::]" => "127.0.0.1",
        host => host,
    };
    format!("http://{host}:{}/health", config.server.port)
}

/// Fetch the status report from `url`. Connection failures yield an offline report.
async fn fetch_status(url: &str) -> Result<StatusReport, BridgeError> {
    let client = reqwest::Client::builder()
        .timeout(STATUS_TIMEOUT)
        .build()
        .map_err(|e| BridgeError::Internal(format!("failed to create HTTP client: {e}")))?;

    let response = match client.get(url).send().await {
        Ok(resp) if resp.status().is_success() => resp,
        _ => return Ok(StatusReport::offline(url.to_string())),
    };

    let envelope: ApiResponse<HealthData> = response.json().await.map_err(|e| {
        BridgeError::Internal(format!("failed to parse health response: {e}"))
    })?;
    let Some(health) = envelope.data else {
        return Err(BridgeError::Internal(
            "health response carries no data".to_string(),
        ));
    };

    Ok(StatusReport {
        running: true,
        endpoint: url.to_string(),
        version: Some(health.version),
        state: Some(health.state),
        paired: health.paired,
        connected: health.connected,
        webhook_configured: health.webhook_configured,
    })
}

/// Run the `wabridge status` command.
pub async fn run_status(config: &WabridgeConfig, json: bool, plain: bool) -> Result<(), BridgeError> {
    let report = fetch_status(&health_url(config)).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| BridgeError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    let use_color = !plain && std::io::stdout().is_terminal();
    if report.running {
        print_status_running(&report, use_color);
    } else {
        print_status_offline(&report.endpoint, use_color);
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn print_status_running(report: &StatusReport, use_color: bool) {
    let state = report.state.as_deref().unwrap_or("unknown");
    let version = report.version.as_deref().unwrap_or("?");

    println!();
    println!("  wabridge status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        let badge = if report.connected {
            state.green()
        } else {
            state.yellow()
        };
        println!("    State:     {} {} (v{version})", "✓".green(), badge);
    } else {
        println!("    State:     [OK] {state} (v{version})");
    }
    println!("    Paired:    {}", yes_no(report.paired));
    println!("    Connected: {}", yes_no(report.connected));
    println!("    Webhook:   {}", yes_no(report.webhook_configured));
    println!();
}

fn print_status_offline(endpoint: &str, use_color: bool) {
    println!();
    println!("  wabridge status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    State:    {} {}", "✗".red(), "not running".red());
    } else {
        println!("    State:    [FAIL] not running");
    }

    println!("    Endpoint: {endpoint}");
    println!();
    println!("  Start with: wabridge serve");
    println!();
}
