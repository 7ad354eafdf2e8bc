//! Worker HTTP handlers: the work-channel surface of an out-of-process
//! worker.

use super::service::Worker;
use crate::dispatch::types::{BatchId, WorkMessage};

use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct WorkAck {
    pub batch_id: BatchId,
    pub accepted: bool,
}

/// Accepts a work message and processes it in the background, acknowledging
/// immediately. The worker's internal gate keeps batch processing
/// sequential even if deliveries overlap.
pub async fn handle_work(
    Extension(worker): Extension<Arc<Worker>>,
    Json(message): Json<WorkMessage>,
) -> (StatusCode, Json<WorkAck>) {
    let batch_id = message.batch.batch_id.clone();

    tokio::spawn(async move {
        if let Err(e) = worker.process_batch(message.batch).await {
            tracing::error!("Failed to report batch outcome: {}", e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(WorkAck {
            batch_id,
            accepted: true,
        }),
    )
}
