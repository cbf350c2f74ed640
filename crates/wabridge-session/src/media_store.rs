// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File store for downloaded inbound media, keyed by message id.

use std::path::{Path, PathBuf};

use tracing::debug;
use wabridge_core::BridgeError;

/// Route prefix under which stored files are served.
pub const RETRIEVAL_PREFIX: &str = "/images/";

/// Bytes of a stored file plus the content type inferred from its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Directory-backed media store.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File name used for an inbound image.
    pub fn image_file_name(message_id: &str) -> String {
        format!("{message_id}.jpg")
    }

    /// Relative URL of an inbound image, valid once the download completes.
    pub fn retrieval_path(message_id: &str) -> String {
        format!("{RETRIEVAL_PREFIX}{}", Self::image_file_name(message_id))
    }

    /// Write `bytes` as the image of `message_id`, creating the directory if needed.
    pub async fn save_image(&self, message_id: &str, bytes: &[u8]) -> Result<PathBuf, BridgeError> {
        let file_name = Self::image_file_name(message_id);
        validate_file_name(&file_name)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| BridgeError::Storage { source: Box::new(e) })?;

        let path = self.root.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| BridgeError::Storage { source: Box::new(e) })?;
        debug!(path = %path.display(), bytes = bytes.len(), "media saved");
        Ok(path)
    }

    /// Read a stored file by name.
    pub async fn load(&self, file_name: &str) -> Result<StoredMedia, BridgeError> {
        validate_file_name(file_name)?;
        let path = self.root.join(file_name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(StoredMedia {
                bytes,
                content_type: content_type_for(file_name),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BridgeError::NotFound(format!("image `{file_name}`")))
            }
            Err(e) => Err(BridgeError::Storage { source: Box::new(e) }),
        }
    }
}

/// Rejects names that could escape the store directory.
pub fn validate_file_name(name: &str) -> Result<(), BridgeError> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(BridgeError::InvalidRequest(format!(
            "invalid file name `{name}`"
        )));
    }
    Ok(())
}

/// Content type from a file extension (case-insensitive).
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path().join("downloads"));

        store.save_image("3EB0C431C26A1916", b"\xFF\xD8jpeg").await.unwrap();
        let media = store.load("3EB0C431C26A1916.jpg").await.unwrap();
        assert_eq!(media.bytes, b"\xFF\xD8jpeg");
        assert_eq!(media.content_type, "image/jpeg");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        assert!(matches!(
            store.load("nope.png").await,
            Err(BridgeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = MediaStore::new(dir.path());
        for name in ["../etc/passwd", "a/b.jpg", "a\\b.jpg", "..", ""] {
            assert!(
                matches!(store.load(name).await, Err(BridgeError::InvalidRequest(_))),
                "{name} should be rejected"
            );
        }
        assert!(store.save_image("../evil", b"x").await.is_err());
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.gif"), "image/gif");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.bin"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn retrieval_path_uses_images_route() {
        assert_eq!(MediaStore::retrieval_path("ABC"), "/images/ABC.jpg");
    }
}
