//! Receiver Service
//!
//! Consumes the success and failure channels. Successes become idempotent
//! warehouse appends; failures drive the recovery protocol: resubmit the
//! remainder, then rebalance the fleet, then record the event.

use crate::bus::Topic;
use crate::controller::service::Controller;
use crate::dispatch::types::DispatchMessage;
use crate::warehouse::sink::WarehouseSink;
use crate::warehouse::types::PriceRow;
use crate::worker::types::{FailureReport, SuccessResult};

use anyhow::Result;
use std::sync::Arc;

pub struct Receiver {
    warehouse: Arc<dyn WarehouseSink>,
    dispatch: Topic<DispatchMessage>,
    controller: Arc<Controller>,
}

impl Receiver {
    pub fn new(
        warehouse: Arc<dyn WarehouseSink>,
        dispatch: Topic<DispatchMessage>,
        controller: Arc<Controller>,
    ) -> Arc<Self> {
        Arc::new(Self {
            warehouse,
            dispatch,
            controller,
        })
    }

    /// Handler for the success channel: bulk-append to the warehouse.
    ///
    /// Duplicate deliveries collapse under the `(item_id, date)` key. A sink
    /// failure propagates as `Err` so the bus redelivers the message —
    /// dropping it here would silently lose data.
    pub async fn on_success(&self, results: Vec<SuccessResult>) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }

        let count = results.len();
        let rows: Vec<PriceRow> = results.into_iter().map(PriceRow::from).collect();
        let inserted = self.warehouse.append_rows(rows).await?;

        tracing::info!(
            "Stored {} of {} success results ({} were replays)",
            inserted,
            count,
            count - inserted
        );

        Ok(())
    }

    /// Handler for the failure channel. Three independent effects, in a
    /// fixed order chosen for data safety:
    ///
    /// 1. Resubmit the unprocessed remainder to the dispatch channel — this
    ///    is what keeps ids from ever being dropped, so it runs first and
    ///    its failure is the only one that propagates (forcing redelivery).
    /// 2. Ask the controller to rebalance the fleet around the failed
    ///    endpoint; a rebalance problem is alerted, never blocks recovery.
    /// 3. Emit the observability event.
    pub async fn on_failure(&self, report: FailureReport) -> Result<()> {
        let resubmit = self.dispatch.publish(DispatchMessage {
            item_ids: report.remaining.clone(),
        });

        if let Err(e) = &resubmit {
            tracing::error!(
                "Resubmission of {} ids from batch {} failed: {}",
                report.remaining.len(),
                report.batch_id,
                e
            );
        }

        let outcome = self
            .controller
            .rebalance(&report.endpoint, &report.region)
            .await;

        match outcome {
            Ok(summary) => {
                if summary.spawned.len() < 2 {
                    tracing::error!(
                        "Rebalance after {} spawned only {} replacement(s)",
                        report.endpoint,
                        summary.spawned.len()
                    );
                }
            }
            Err(e) => {
                tracing::error!("Rebalance after {} failed: {}", report.endpoint, e);
            }
        }

        tracing::warn!(
            "Worker {} in {} failed batch {} at item {}, {} ids resubmitted",
            report.endpoint,
            report.region,
            report.batch_id,
            report.failed_at,
            report.remaining.len()
        );

        resubmit
    }
}
