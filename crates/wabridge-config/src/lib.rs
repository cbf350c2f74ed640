// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for wabridge.
//!
//! Layers compiled defaults, the `wabridge.toml` hierarchy, `WABRIDGE_*`
//! variables and the legacy `WA_WEBHOOK_URL` / `PORT` variables, then
//! validates the result. Every failure is reported as a [`ConfigError`]
//! that renders through miette.
//!
//! ```no_run
//! let config = match wabridge_config::load_and_validate() {
//!     Ok(config) => config,
//!     Err(errors) => {
//!         wabridge_config::render_errors(&errors);
//!         std::process::exit(1);
//!     }
//! };
//! println!("daemon at {}", config.protocol.sidecar_address);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, SourceFile, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WabridgeConfig;

/// Load from the standard hierarchy, then validate.
pub fn load_and_validate() -> Result<WabridgeConfig, Vec<ConfigError>> {
    checked(loader::load_config(), || {
        loader::hierarchy()
            .iter()
            .filter_map(|path| SourceFile::read(path))
            .collect()
    })
}

/// Load from `path` (plus environment overrides), then validate.
pub fn load_and_validate_path(path: &Path) -> Result<WabridgeConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_path(path), || {
        SourceFile::read(path).into_iter().collect()
    })
}

/// Load from an inline TOML document, then validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<WabridgeConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![SourceFile::inline(toml_content)]
    })
}

/// `sources` is only evaluated on an extraction failure, to attach spans.
fn checked(
    loaded: Result<WabridgeConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<SourceFile>,
) -> Result<WabridgeConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::from_figment(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}
