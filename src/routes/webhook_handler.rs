use crate::app_state::AppState;
use crate::error::WebhookError;
use crate::github::models::{PushEvent, PushEventPayload};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn, Instrument};

const EVENT_HEADER: &str = "x-github-event";

pub async fn webhook_handler(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, WebhookError> {
    // 1. Only push deliveries reach the pipeline
    if let Some(event) = headers.get(EVENT_HEADER) {
        let event = event.to_str().unwrap_or("");
        if event != "push" {
            info!("Ignoring {} event", event);
            return Ok(Json(json!({ "status": "ignored", "event": event })).into_response());
        }
    }

    // 2. Parse the payload
    let payload: PushEventPayload = serde_json::from_slice(&body).map_err(|e| {
        warn!("❌ Invalid JSON payload: {}", e);
        WebhookError::MalformedPayload(e.to_string())
    })?;
    let event = PushEvent::from_payload(&payload).inspect_err(|e| warn!("❌ {}", e))?;

    let span = tracing::info_span!(
        "webhook",
        repository = %event.repository,
        branch = %event.branch,
        sha = %event.sha,
    );

    async move {
        if let Some(commit) = &payload.head_commit {
            info!("📝 Commit message: {}", commit.message.lines().next().unwrap_or(""));
        }

        // 3. Commits touching only the chart need no new image
        if payload.is_charts_only() {
            info!("Skipping build for charts-only commit");
            return Ok(Json(json!({
                "status": "skipped",
                "reason": "charts-only commit",
                "tags": [],
                "sha": event.sha,
            }))
            .into_response());
        }

        // 4. Run the pipeline and map its result
        let result = state
            .pipeline
            .deploy(&event.branch, &event.sha, &event.repository)
            .await;

        let response = if !result.success {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "failed",
                    "tags": result.image_tags,
                    "sha": event.sha,
                    "error": result.error_message,
                })),
            )
                .into_response()
        } else if result.is_skipped() {
            Json(json!({
                "status": "skipped",
                "reason": format!("branch {} does not deploy", event.branch),
                "tags": [],
                "sha": event.sha,
            }))
            .into_response()
        } else {
            Json(json!({
                "status": "success",
                "tags": result.image_tags,
                "sha": event.sha,
            }))
            .into_response()
        };
        Ok(response)
    }
    .instrument(span)
    .await
}
