//! Worker Service
//!
//! The batch state machine at the heart of the system:
//!
//! ```text
//! Idle --receive(batch)--> Processing
//! Processing --success(id)--> Processing          (loop while ids remain)
//! Processing --no ids remain--> Completed --publish(successes)--> Idle
//! Processing --failure(id)--> Failed --publish(successes, report)--> Idle
//! ```
//!
//! Ids are attempted strictly in order; the first failure stops the batch
//! immediately, so "remaining" always means "not yet attempted, in original
//! order" (with the failing id at its head). The worker never retries
//! internally and never terminates itself — the controller's kill signal is
//! the only way a worker goes away.

use super::publish::ResultPublisher;
use super::types::{BatchOutcome, FailureReport, SuccessResult};
use super::upstream::PriceSource;
use crate::dispatch::types::Batch;
use crate::fleet::types::{Region, WorkerEndpoint};

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;

pub struct Worker {
    endpoint: WorkerEndpoint,
    region: Region,
    source: Arc<dyn PriceSource>,
    publisher: Arc<dyn ResultPublisher>,
    /// Serializes batches: one worker processes one batch at a time.
    gate: tokio::sync::Mutex<()>,
}

impl Worker {
    pub fn new(
        endpoint: WorkerEndpoint,
        region: Region,
        source: Arc<dyn PriceSource>,
        publisher: Arc<dyn ResultPublisher>,
    ) -> Self {
        Self {
            endpoint,
            region,
            source,
            publisher,
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn endpoint(&self) -> &WorkerEndpoint {
        &self.endpoint
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Processes one batch to its terminal state and publishes the outcome.
    ///
    /// Returns `Err` only when publishing itself fails; that error reaches
    /// the work-channel consumer and triggers bus-level redelivery of the
    /// whole batch, which is safe because warehouse appends are idempotent.
    pub async fn process_batch(&self, batch: Batch) -> Result<BatchOutcome> {
        let _processing = self.gate.lock().await;

        tracing::info!(
            "Worker {} processing batch {} ({} ids)",
            self.endpoint,
            batch.batch_id,
            batch.item_ids.len()
        );

        let mut successes: Vec<SuccessResult> = Vec::with_capacity(batch.item_ids.len());

        for (index, item_id) in batch.item_ids.iter().enumerate() {
            match self.source.fetch(item_id).await {
                Ok(listings) => {
                    tracing::debug!("Processed item {} ({} listings)", item_id, listings.len());
                    successes.push(SuccessResult {
                        item_id: item_id.clone(),
                        listings,
                        fetched_at: Utc::now(),
                    });
                }
                Err(e) => {
                    // Stop immediately: no further ids in this batch are
                    // attempted. The failing id stays in the remainder.
                    let remaining: Vec<_> = batch.item_ids[index..].to_vec();

                    tracing::error!(
                        "Item {} failed in batch {}, {} ids left unattempted: {}",
                        item_id,
                        batch.batch_id,
                        remaining.len(),
                        e
                    );

                    let succeeded = successes.len();
                    if !successes.is_empty() {
                        self.publisher.publish_success(successes).await?;
                    }

                    let report = FailureReport {
                        batch_id: batch.batch_id.clone(),
                        failed_at: item_id.clone(),
                        remaining: remaining.clone(),
                        endpoint: self.endpoint.clone(),
                        region: self.region.clone(),
                    };
                    self.publisher.publish_failure(report).await?;

                    return Ok(BatchOutcome::Failed {
                        succeeded,
                        remaining: remaining.len(),
                    });
                }
            }
        }

        let succeeded = successes.len();
        if !successes.is_empty() {
            self.publisher.publish_success(successes).await?;
        }

        tracing::info!(
            "Worker {} completed batch {} ({} results)",
            self.endpoint,
            batch.batch_id,
            succeeded
        );

        Ok(BatchOutcome::Completed { succeeded })
    }
}
