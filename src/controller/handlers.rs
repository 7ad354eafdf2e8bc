//! Controller HTTP handlers.

use super::service::Controller;
use super::types::{RunRequest, RunResponse};
use crate::dispatch::types::ItemId;

use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Json};
use std::sync::Arc;

/// Credential expected in the `x-api-key` header.
#[derive(Clone)]
pub struct ApiKey(pub String);

pub const API_KEY_HEADER: &str = "x-api-key";

/// `POST /run`: starts a scraping run.
///
/// A failed credential check is rejected synchronously with no side
/// effects. An accepted run returns 202 immediately; all further progress
/// and failure handling is asynchronous.
pub async fn handle_start_run(
    Extension(controller): Extension<Arc<Controller>>,
    Extension(api_key): Extension<ApiKey>,
    headers: HeaderMap,
    body: Option<Json<RunRequest>>,
) -> (StatusCode, Json<RunResponse>) {
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(api_key.0.as_str()) {
        tracing::warn!("Run request rejected: bad or missing api key");
        return (
            StatusCode::FORBIDDEN,
            Json(RunResponse {
                status: "unauthorized".to_string(),
                run_id: None,
                item_count: 0,
                chunk_count: 0,
            }),
        );
    }

    let ids = body.and_then(|Json(request)| parse_ids(request.ids.as_deref()));

    match controller.start_run(ids).await {
        Ok(accepted) => (
            StatusCode::ACCEPTED,
            Json(RunResponse {
                status: "accepted".to_string(),
                run_id: Some(accepted.run_id),
                item_count: accepted.item_count,
                chunk_count: accepted.chunk_count,
            }),
        ),
        Err(e) => {
            tracing::error!("Failed to start run: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RunResponse {
                    status: "error".to_string(),
                    run_id: None,
                    item_count: 0,
                    chunk_count: 0,
                }),
            )
        }
    }
}

/// Parses the comma-separated id list; empty input means "all known ids".
fn parse_ids(raw: Option<&str>) -> Option<Vec<ItemId>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    let ids: Vec<ItemId> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ItemId::new)
        .collect();

    if ids.is_empty() { None } else { Some(ids) }
}
