// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::WabridgeConfig;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &WabridgeConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            fail(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    if config.server.port == 0 {
        fail("server.port must not be 0".to_string());
    }

    if let Some(token) = &config.server.bearer_token
        && token.trim().is_empty()
    {
        fail("server.bearer_token must not be empty when set".to_string());
    }

    if config.protocol.sidecar_address.trim().is_empty() {
        fail("protocol.sidecar_address must not be empty".to_string());
    }

    if config.protocol.request_timeout_secs == 0 {
        fail("protocol.request_timeout_secs must be greater than 0".to_string());
    }

    if config.pairing.qr_timeout_secs == 0 {
        fail("pairing.qr_timeout_secs must be greater than 0".to_string());
    }

    if config.pairing.attempt_timeout_secs < config.pairing.qr_timeout_secs {
        fail(format!(
            "pairing.attempt_timeout_secs ({}) must not be shorter than pairing.qr_timeout_secs ({})",
            config.pairing.attempt_timeout_secs, config.pairing.qr_timeout_secs
        ));
    }

    if config.pairing.qr_size_px < 21 {
        fail(format!(
            "pairing.qr_size_px must be at least 21, got {}",
            config.pairing.qr_size_px
        ));
    }

    if let Some(url) = config.webhook.target()
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        fail(format!("webhook.url `{url}` must be an http:// or https:// URL"));
    }

    if !(1..=100).contains(&config.media.jpeg_quality) {
        fail(format!(
            "media.jpeg_quality must be between 1 and 100, got {}",
            config.media.jpeg_quality
        ));
    }

    if config.media.download_dir.trim().is_empty() {
        fail("media.download_dir must not be empty".to_string());
    }

    if config.outbound.max_text_chars == 0 {
        fail("outbound.max_text_chars must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &WabridgeConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&WabridgeConfig::default()).is_ok());
    }

    #[test]
    fn empty_sidecar_address_fails_validation() {
        let mut config = WabridgeConfig::default();
        config.protocol.sidecar_address = "  ".to_string();
        assert!(messages(&config).iter().any(|m| m.contains("sidecar_address")));
    }

    #[test]
    fn non_http_webhook_fails_validation() {
        let mut config = WabridgeConfig::default();
        config.webhook.url = Some("ftp://example.com/hook".to_string());
        assert!(messages(&config).iter().any(|m| m.contains("webhook.url")));
    }

    #[test]
    fn blank_webhook_counts_as_unset() {
        let mut config = WabridgeConfig::default();
        config.webhook.url = Some(String::new());
        assert!(validate_config(&config).is_ok());
        assert!(config.webhook.target().is_none());
    }

    #[test]
    fn attempt_timeout_must_cover_first_code_wait() {
        let mut config = WabridgeConfig::default();
        config.pairing.attempt_timeout_secs = 5;
        assert!(
            messages(&config)
                .iter()
                .any(|m| m.contains("pairing.attempt_timeout_secs"))
        );
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = WabridgeConfig::default();
        config.server.port = 0;
        config.media.jpeg_quality = 0;
        config.outbound.max_text_chars = 0;
        assert_eq!(messages(&config).len(), 3);
    }
}
