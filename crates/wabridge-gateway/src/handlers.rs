// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.
//!
//! Handles GET /pair, POST /send, GET /health, GET /devices,
//! POST /disconnect and GET /images/{filename}.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};
use wabridge_core::BridgeError;
use wabridge_core::types::{AttachmentSpec, OutboundRequest, SentUnit};

use crate::server::GatewayState;

/// JSON envelope shared by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse {
    /// Success without a data block.
    pub fn done(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }

    pub fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            message: message.into(),
            data: None,
        })
    }
}

/// A [`BridgeError`] rendered as an HTTP failure.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error kind.
pub fn status_for(err: &BridgeError) -> StatusCode {
    match err {
        BridgeError::NotPaired | BridgeError::PairingBusy => StatusCode::CONFLICT,
        BridgeError::InvalidRequest(_) | BridgeError::UnsupportedSourceScheme { .. } => {
            StatusCode::BAD_REQUEST
        }
        BridgeError::PairingTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
        BridgeError::ImageDecodeFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        BridgeError::FetchFailed { .. }
        | BridgeError::UploadFailed { .. }
        | BridgeError::SendFailed { .. }
        | BridgeError::Protocol { .. } => StatusCode::BAD_GATEWAY,
        BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
        BridgeError::Config(_)
        | BridgeError::Pairing { .. }
        | BridgeError::Storage { .. }
        | BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!(error = %self.0, status = status.as_u16(), "request failed");
        }

        let data = match &self.0 {
            BridgeError::Pairing { kind } => Some(json!({
                "error": kind.tag(),
                "hint": kind.remediation(),
            })),
            BridgeError::SendFailed { index, .. } => Some(json!({ "failed_index": index })),
            BridgeError::FetchFailed {
                status: Some(upstream),
                ..
            } => Some(json!({ "upstream_status": upstream })),
            _ => None,
        };

        let body = ApiResponse {
            success: false,
            message: self.0.to_string(),
            data,
        };
        (status, Json(body)).into_response()
    }
}

/// `data` block of a successful POST /send.
#[derive(Debug, Serialize)]
pub struct SendData<'a> {
    pub number: &'a str,
    pub message: &'a str,
    pub attachments: &'a [AttachmentSpec],
    pub sent: Vec<SentUnit>,
}

/// GET /pair
///
/// Starts a pairing attempt and returns the first QR code as a PNG.
pub async fn get_pair(State(state): State<GatewayState>) -> Result<Response, ApiError> {
    let png = state.controller.begin_pairing().await?;
    Ok((
        [
            (CONTENT_TYPE, "image/png"),
            (CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (PRAGMA, "no-cache"),
            (EXPIRES, "0"),
        ],
        png,
    )
        .into_response())
}

/// POST /send
pub async fn post_send(
    State(state): State<GatewayState>,
    body: Result<Json<OutboundRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                ApiResponse::failure(format!("Invalid request body: {}", rejection.body_text())),
            )
                .into_response());
        }
    };

    let sent = state.controller.send(&request).await?;
    info!(number = %request.number, count = sent.len(), "send request completed");

    let message = format!("Successfully sent {} message(s)", sent.len());
    let data = SendData {
        number: &request.number,
        message: request.message.as_deref().unwrap_or_default(),
        attachments: &request.attachments,
        sent,
    };
    Ok(ApiResponse::ok(message, data).into_response())
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    ApiResponse::ok("wabridge is running", state.controller.status()).into_response()
}

/// GET /devices
pub async fn get_devices(State(state): State<GatewayState>) -> Response {
    let info = state.controller.device_info().await;
    ApiResponse::ok("Device information retrieved", info).into_response()
}

/// POST /disconnect
pub async fn post_disconnect(State(state): State<GatewayState>) -> Response {
    state.controller.disconnect().await;
    ApiResponse::done("Successfully disconnected and session cleared").into_response()
}

/// GET /images/{filename}
pub async fn get_image(
    State(state): State<GatewayState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let stored = state.controller.media_store().load(&filename).await?;
    Ok((
        [
            (CONTENT_TYPE, stored.content_type),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        stored.bytes,
    )
        .into_response())
}
