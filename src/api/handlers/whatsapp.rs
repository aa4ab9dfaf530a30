//! WhatsApp webhook: forwards administrator replies to the approval processor.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use futures_util::FutureExt;

use crate::api::dto::{WebhookAck, WhatsAppWebhookRequest};
use crate::app_state::AppState;

/// `POST /api/whatsapp`: Process an administrator's approval reply.
///
/// Only a request with a missing or empty `message` is answered with 400.
/// Every processing outcome, including a crash inside the processor, is
/// acknowledged with 200.
#[utoipa::path(
    post,
    path = "/api/whatsapp",
    tag = "Webhooks",
    summary = "WhatsApp approval webhook",
    description = "Extracts an `ok <verification id>` command from the message text and, if the referenced purchase is pending and valid, credits the user's coins.",
    request_body = WhatsAppWebhookRequest,
    responses(
        (status = 200, description = "Message handled (see body for outcome)", body = WebhookAck),
        (status = 400, description = "Missing or empty `message` field", body = WebhookAck),
    )
)]
pub async fn whatsapp_webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<WebhookAck>) {
    let message = match serde_json::from_slice::<WhatsAppWebhookRequest>(&body) {
        Ok(WhatsAppWebhookRequest {
            message: Some(message),
        }) if !message.is_empty() => message,
        Ok(WhatsAppWebhookRequest { .. }) => {
            tracing::warn!("webhook payload without message");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookAck::invalid("Missing message field")),
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "malformed webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookAck::invalid(format!(
                    "Missing message field: {err}"
                ))),
            );
        }
    };

    tracing::debug!(len = message.len(), "webhook message received");

    let service = Arc::clone(&state.verification_service);
    let outcome = AssertUnwindSafe(async move { service.process_approval_message(&message).await })
        .catch_unwind()
        .await;

    let ack = match outcome {
        Ok(outcome) if outcome.success => WebhookAck::approved(),
        Ok(outcome) => WebhookAck::not_applied(outcome.message),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%reason, "approval processor panicked");
            WebhookAck::failed(format!("Error processing message: {reason}"))
        }
    };

    (StatusCode::OK, Json(ack))
}

/// Webhook routes, mounted at the root.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/whatsapp", post(whatsapp_webhook))
}
