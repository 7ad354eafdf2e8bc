//! Receiver HTTP handlers: the coordinator's internal ingest endpoints.
//!
//! Out-of-process workers post their outcomes here; the handlers bridge the
//! HTTP surface onto the in-process success/failure topics so the receiver
//! consumes one stream regardless of where a worker runs.

use crate::bus::Topic;
use crate::worker::types::{FailureReport, SuccessResult};

use axum::{Extension, Json, http::StatusCode};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub accepted: bool,
}

pub async fn handle_internal_success(
    Extension(success): Extension<Topic<Vec<SuccessResult>>>,
    Json(results): Json<Vec<SuccessResult>>,
) -> (StatusCode, Json<IngestAck>) {
    match success.publish(results) {
        Ok(()) => (StatusCode::ACCEPTED, Json(IngestAck { accepted: true })),
        Err(e) => {
            tracing::error!("Failed to enqueue success results: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IngestAck { accepted: false }),
            )
        }
    }
}

pub async fn handle_internal_failure(
    Extension(failure): Extension<Topic<FailureReport>>,
    Json(report): Json<FailureReport>,
) -> (StatusCode, Json<IngestAck>) {
    match failure.publish(report) {
        Ok(()) => (StatusCode::ACCEPTED, Json(IngestAck { accepted: true })),
        Err(e) => {
            tracing::error!("Failed to enqueue failure report: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(IngestAck { accepted: false }),
            )
        }
    }
}
