//! Webhook intake and call log retrieval.
//!
//! Provides:
//! - `POST /webhook`: verify, record and acknowledge a LiveKit event
//! - `GET /logs`: every event recorded since start-up

use crate::api::ApiError;
use crate::signature::{self, SIGNATURE_HEADER};
use crate::store::CallLogEntry;
use crate::AppState;
use axum::{body::Bytes, extract::Extension, http::HeaderMap, Json};
use parley_types::{is_empty_payload, ExtractedFields};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Response body for an accepted webhook.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub status: &'static str,
    pub event_processed: Option<String>,
}

/// Response body for `GET /logs`.
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub total_events: usize,
    pub logs: Vec<CallLogEntry>,
}

/// Handler for `POST /webhook`.
///
/// The signature is checked against the raw bytes before the body is
/// parsed. Without a configured secret every request is accepted.
pub async fn webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match state.webhook_secret.as_deref() {
        Some(secret) => {
            if !signature::verify(secret.as_bytes(), &body, provided) {
                tracing::error!("invalid webhook signature");
                return Err(ApiError::Unauthorized("Invalid signature".to_string()));
            }
        }
        None => tracing::warn!("webhook secret not set, skipping signature verification"),
    }

    let payload = parse_payload(&body)?;
    let fields = ExtractedFields::from_payload(&payload);

    tracing::info!(event = fields.event_label(), "webhook received");
    tracing::info!(
        room = fields.room_info.name.as_deref().unwrap_or("-"),
        room_sid = fields.room_info.sid.as_deref().unwrap_or("-"),
        "webhook room"
    );
    if let Some(participant) = &fields.participant_info {
        tracing::info!(
            participant = participant.identity.as_deref().unwrap_or("-"),
            "webhook participant"
        );
    }
    if let Ok(pretty) = serde_json::to_string_pretty(&fields) {
        tracing::debug!("extracted webhook fields:\n{}", pretty);
    }

    let event_processed = fields.event_type.clone();
    let total = state.logs.append(CallLogEntry::received_now(payload, fields));
    tracing::debug!(total, "call log updated");

    Ok(Json(WebhookAck {
        status: "success",
        event_processed,
    }))
}

/// Parses the raw body into a JSON object.
///
/// An empty body or an empty value is a client error; anything else that
/// fails to decode is reported as a server-side failure with its message.
fn parse_payload(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(no_data());
    }

    let payload: Value = serde_json::from_slice(body).map_err(|e| {
        tracing::error!(error = %e, "failed to decode webhook body");
        ApiError::Internal(format!("Failed to decode JSON object: {e}"))
    })?;

    if is_empty_payload(&payload) {
        return Err(no_data());
    }
    if !payload.is_object() {
        tracing::error!("webhook payload is not a JSON object");
        return Err(ApiError::Internal(
            "webhook payload must be a JSON object".to_string(),
        ));
    }

    Ok(payload)
}

fn no_data() -> ApiError {
    ApiError::BadRequest("No data provided".to_string())
}

/// Handler for `GET /logs`.
pub async fn logs_handler(Extension(state): Extension<Arc<AppState>>) -> Json<LogsResponse> {
    let logs = state.logs.snapshot();
    Json(LogsResponse {
        total_events: logs.len(),
        logs,
    })
}
