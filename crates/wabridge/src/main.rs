// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! wabridge - REST bridge to a WhatsApp multi-device session.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wabridge_config::WabridgeConfig;

/// wabridge - REST bridge to a WhatsApp multi-device session.
#[derive(Parser, Debug)]
#[command(name = "wabridge", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP API and the protocol session (default).
    Serve,
    /// Query the health endpoint of a running instance.
    Status {
        /// Output JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Load and validate configuration, then print a summary.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => wabridge_config::load_and_validate_path(path),
        None => wabridge_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            wabridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Status { json, plain } => status::run_status(&config, json, plain).await,
        Commands::CheckConfig => {
            print_config_summary(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("wabridge: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &WabridgeConfig) {
    let auth = if config.server.bearer_token.is_some() {
        "bearer token"
    } else {
        "off"
    };
    println!("wabridge: configuration OK");
    println!(
        "  server:   {} (auth: {auth})",
        config.server.bind_address()
    );
    println!("  daemon:   {}", config.protocol.sidecar_address);
    println!(
        "  webhook:  {}",
        config.webhook.target().unwrap_or("not configured")
    );
    println!("  media:    {}", config.media.download_dir);
    println!(
        "  pairing:  QR timeout {}s, {}px",
        config.pairing.qr_timeout_secs, config.pairing.qr_size_px
    );
}
