// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! miette diagnostics for configuration failures.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use figment::error::Kind;
use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a known key must beat to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(wabridge::config::unknown_key),
        help("{}", describe_keys(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Keys accepted in the section, comma separated.
        valid_keys: String,
        #[label("not a wabridge setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(wabridge::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(wabridge::config::missing_key),
        help("set `{key}` in wabridge.toml or through a WABRIDGE_* variable")
    )]
    MissingKey { key: String },

    #[error("validation error: {message}")]
    #[diagnostic(code(wabridge::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(wabridge::config::other))]
    Other(String),
}

fn describe_keys(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// A TOML document that took part in loading, kept for span lookup.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    /// Reads `path`; `None` when it does not exist or cannot be read.
    pub fn read(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Some(Self {
            name: path.display().to_string(),
            content,
        })
    }

    pub fn inline(content: &str) -> Self {
        Self {
            name: "<inline>".to_string(),
            content: content.to_string(),
        }
    }

    /// Labels the first occurrence of `key` inside `[section]`.
    fn label(&self, section: Option<&str>, key: &str) -> Option<(SourceSpan, NamedSource<String>)> {
        let offset = find_key_offset(&self.content, section, key)?;
        Some((
            SourceSpan::new(offset.into(), key.len()),
            NamedSource::new(&self.name, self.content.clone()),
        ))
    }
}

/// Expand a figment failure into one [`ConfigError`] per underlying error.
pub fn from_figment(err: figment::Error, sources: &[SourceFile]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| match &error.kind {
            Kind::UnknownField(field, expected) => {
                let origin = origin_of(&error, sources);
                let section = error.path.first().map(String::as_str);
                let (span, src) = origin
                    .and_then(|file| file.label(section, field))
                    .unzip();
                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: error.path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            _ => ConfigError::Other(error.to_string()),
        })
        .collect()
}

/// The source file an error came from. String sources carry no path, so a
/// lone candidate is assumed.
fn origin_of<'a>(error: &figment::Error, sources: &'a [SourceFile]) -> Option<&'a SourceFile> {
    let path = error
        .metadata
        .as_ref()
        .and_then(|meta| meta.source.as_ref())
        .and_then(|source| source.file_path());

    match path {
        Some(path) => {
            let name = path.display().to_string();
            sources.iter().find(|file| file.name == name)
        }
        None => match sources {
            [only] => Some(only),
            _ => None,
        },
    }
}

/// Byte offset of `key` as an assignment inside `[section]` (or before the
/// first header when `section` is `None`).
pub fn find_key_offset(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut in_section = section.is_none();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            let name = header.split(']').next().unwrap_or_default().trim();
            in_section = section == Some(name);
        } else if in_section {
            let rest = trimmed.strip_prefix(key).unwrap_or("x");
            if rest.trim_start().starts_with('=') {
                return Some(offset + (line.len() - trimmed.len()));
            }
        }
        offset += line.len();
    }
    None
}

/// Closest known key, if any is similar enough to `unknown`.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    let (score, key) = valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .max_by(|a, b| a.0.total_cmp(&b.0))?;
    (score > SUGGESTION_THRESHOLD).then(|| key.to_string())
}

/// Print every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut out = String::new();
        match handler.render_report(&mut out, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{out}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_keys() {
        let valid = &["download_dir", "jpeg_quality", "fetch_timeout_secs"];
        assert_eq!(
            suggest_key("jpeg_qualty", valid),
            Some("jpeg_quality".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", valid), None);
        assert_eq!(suggest_key("anything", &[]), None);
    }

    #[test]
    fn finds_key_inside_section() {
        let content = "[server]\njpeg_qualty = 1\n\n[media]\n  jpeg_qualty = 90\n";
        let offset = find_key_offset(content, Some("media"), "jpeg_qualty").unwrap();
        assert_eq!(&content[offset..offset + 11], "jpeg_qualty");
        assert!(offset > content.find("[media]").unwrap());
    }

    #[test]
    fn does_not_match_key_prefixes() {
        let content = "[webhook]\nurl_extra = \"x\"\n";
        assert_eq!(find_key_offset(content, Some("webhook"), "url"), None);
    }

    #[test]
    fn inline_source_is_labelled() {
        let file = SourceFile::inline("[webhook]\nurll = \"x\"\n");
        let (span, _) = file.label(Some("webhook"), "urll").unwrap();
        assert_eq!(span.offset(), 10);
        assert_eq!(span.len(), 4);
    }
}
