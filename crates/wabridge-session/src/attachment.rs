// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment pipeline: fetch a remote resource, detect its content type,
//! normalize images to JPEG, and upload the bytes through the protocol client.

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageEncoder};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use wabridge_config::model::MediaConfig;
use wabridge_core::types::{AttachmentKind, AttachmentSpec, MediaReference};
use wabridge_core::{BridgeError, ProtocolClient};

const OCTET_STREAM: &str = "application/octet-stream";
const JPEG: &str = "image/jpeg";

/// Bytes and content type of a fetched attachment source.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Turns an [`AttachmentSpec`] into an uploaded [`MediaReference`].
#[derive(Clone)]
pub struct AttachmentPipeline {
    http: reqwest::Client,
    client: Arc<dyn ProtocolClient>,
    jpeg_quality: u8,
}

impl AttachmentPipeline {
    pub fn new(client: Arc<dyn ProtocolClient>, config: &MediaConfig) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| BridgeError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            client,
            jpeg_quality: config.jpeg_quality,
        })
    }

    /// Fetch, normalize, and upload one attachment.
    pub async fn fetch_and_normalize(
        &self,
        spec: &AttachmentSpec,
    ) -> Result<MediaReference, BridgeError> {
        let fetched = self.fetch(&spec.url).await?;
        let (bytes, mime_type) = match spec.kind {
            AttachmentKind::Image if !is_jpeg(&fetched.content_type) => {
                let quality = self.jpeg_quality;
                let jpeg = tokio::task::spawn_blocking(move || to_jpeg(&fetched.bytes, quality))
                    .await
                    .map_err(|e| BridgeError::Internal(format!("image conversion task failed: {e}")))??;
                debug!(bytes = jpeg.len(), "re-encoded image as JPEG");
                (jpeg, JPEG.to_string())
            }
            _ => (fetched.bytes, fetched.content_type),
        };

        let file_length = bytes.len() as u64;
        let uploaded = self
            .client
            .upload(bytes, spec.kind.into())
            .await
            .map_err(|e| BridgeError::UploadFailed {
                message: e.to_string(),
                source: Some(Box::new(e)),
            })?;
        debug!(kind = %spec.kind, file_length, mime_type = %mime_type, "attachment uploaded");

        Ok(MediaReference::from_upload(uploaded, mime_type, file_length))
    }

    /// GET the source. Only `http` and `https` URLs are accepted.
    pub async fn fetch(&self, source: &str) -> Result<FetchedResource, BridgeError> {
        let url = Url::parse(source).map_err(|_| BridgeError::unsupported_source(source))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(BridgeError::unsupported_source(source));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| BridgeError::FetchFailed {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::FetchFailed {
                status: Some(status.as_u16()),
                message: format!("source responded with HTTP {status}"),
            });
        }

        let declared = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| !v.is_empty());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BridgeError::FetchFailed {
                status: Some(status.as_u16()),
                message: format!("failed to read response body: {e}"),
            })?
            .to_vec();

        let content_type = declared.unwrap_or_else(|| sniff_content_type(&bytes).to_string());
        debug!(bytes = bytes.len(), content_type = %content_type, "attachment fetched");
        Ok(FetchedResource {
            bytes,
            content_type,
        })
    }
}

fn is_jpeg(content_type: &str) -> bool {
    content_type.contains("jpeg") || content_type.contains("jpg")
}

/// Content type from the leading bytes of a resource.
pub fn sniff_content_type(bytes: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type();
    }
    if bytes.starts_with(b"%PDF-") {
        "application/pdf"
    } else if bytes.starts_with(b"OggS") {
        "audio/ogg"
    } else if bytes.starts_with(b"ID3") {
        "audio/mpeg"
    } else if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        "video/mp4"
    } else {
        OCTET_STREAM
    }
}

/// Decode any supported image format and re-encode it as baseline JPEG.
pub fn to_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, BridgeError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| BridgeError::ImageDecodeFailed {
        message: e.to_string(),
    })?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, quality)
        .write_image(
            rgb.as_bytes(),
            rgb.width(),
            rgb.height(),
            rgb.color().into(),
        )
        .map_err(|e| BridgeError::Internal(format!("failed to encode JPEG: {e}")))?;
    Ok(out.into_inner())
}
