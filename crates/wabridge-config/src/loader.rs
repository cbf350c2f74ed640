// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `/etc/wabridge/wabridge.toml` < `~/.config/wabridge/wabridge.toml`
//! < `./wabridge.toml`, then `WABRIDGE_*` variables, then the legacy
//! `WA_WEBHOOK_URL` and `PORT` variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WabridgeConfig;

pub(crate) const SYSTEM_CONFIG: &str = "/etc/wabridge/wabridge.toml";
pub(crate) const LOCAL_CONFIG: &str = "wabridge.toml";

/// Config sections addressable through `WABRIDGE_<SECTION>_<KEY>`.
const ENV_SECTIONS: &[&str] = &[
    "service", "server", "protocol", "pairing", "webhook", "media", "outbound",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wabridge").join(LOCAL_CONFIG))
}

/// Files consulted by [`load_config`], lowest precedence first.
pub(crate) fn hierarchy() -> Vec<PathBuf> {
    let mut files = vec![PathBuf::from(SYSTEM_CONFIG)];
    files.extend(user_config_path());
    files.push(
        std::env::current_dir()
            .map(|dir| dir.join(LOCAL_CONFIG))
            .unwrap_or_else(|_| PathBuf::from(LOCAL_CONFIG)),
    );
    files
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wabridge/wabridge.toml`
/// 3. `~/.config/wabridge/wabridge.toml`
/// 4. `./wabridge.toml`
/// 5. `WABRIDGE_*` environment variables
/// 6. `WA_WEBHOOK_URL` and `PORT`
pub fn load_config() -> Result<WabridgeConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<WabridgeConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WabridgeConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WabridgeConfig, figment::Error> {
    with_env(
        Figment::new()
            .merge(Serialized::defaults(WabridgeConfig::default()))
            .merge(Toml::file(path)),
    )
    .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    with_env(
        Figment::new()
            .merge(Serialized::defaults(WabridgeConfig::default()))
            .merge(Toml::file(SYSTEM_CONFIG))
            .merge(Toml::file(user_config_path().unwrap_or_default()))
            .merge(Toml::file(LOCAL_CONFIG)),
    )
}

fn with_env(figment: Figment) -> Figment {
    figment
        .merge(env_provider())
        .merge(Env::raw().only(&["WA_WEBHOOK_URL"]).map(|_| "webhook.url".into()))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
}

/// Environment provider with an explicit section mapping.
///
/// `WABRIDGE_MEDIA_DOWNLOAD_DIR` must become `media.download_dir`, not
/// `media.download.dir`, so `Env::split("_")` is not usable here.
fn env_provider() -> Env {
    Env::prefixed("WABRIDGE_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env key to its dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("media_download_dir"), "media.download_dir");
        assert_eq!(map_env_key("server_shutdown_grace_secs"), "server.shutdown_grace_secs");
        assert_eq!(map_env_key("service_log_level"), "service.log_level");
        assert_eq!(map_env_key("protocol_sidecar_address"), "protocol.sidecar_address");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("bogus_key"), "bogus_key");
    }

    #[test]
    fn legacy_variables_override_prefixed_ones() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WABRIDGE_WEBHOOK_URL", "http://prefixed.example/hook");
            jail.set_env("WA_WEBHOOK_URL", "http://legacy.example/hook");
            jail.set_env("PORT", "9090");
            jail.set_env("WABRIDGE_PAIRING_QR_TIMEOUT_SECS", "30");

            let config: WabridgeConfig = build_figment().extract()?;
            assert_eq!(
                config.webhook.url.as_deref(),
                Some("http://legacy.example/hook")
            );
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.pairing.qr_timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn local_file_is_picked_up() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG,
                r#"
                [server]
                port = 8181
                "#,
            )?;
            let config: WabridgeConfig = build_figment().extract()?;
            assert_eq!(config.server.port, 8181);
            Ok(())
        });
    }
}
