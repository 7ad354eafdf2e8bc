//! Dispatcher Service
//!
//! Consumes the dispatch channel, re-splits incoming id sequences into
//! worker-sized batches, assigns each batch to an active worker round-robin,
//! and delivers it with a staggered gap so worker load ramps instead of
//! bursting.
//!
//! ## Fleet Exhaustion
//! With zero active endpoints the remaining ids are requeued to the dispatch
//! channel after a backoff — held, never dropped. Consecutive holds past a
//! threshold are raised as an operational alert.

use super::registry::WorkerRegistry;
use super::transport::WorkSender;
use super::types::{Batch, BatchId, DispatchMessage, WorkMessage};
use crate::bus::Topic;
use crate::config::Config;

use anyhow::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub struct Dispatcher {
    registry: Arc<WorkerRegistry>,
    sender: Arc<dyn WorkSender>,
    /// Requeue handle for held batches and reroutes; a clone of the dispatch
    /// topic this dispatcher consumes.
    resubmit: Topic<DispatchMessage>,
    batch_size: usize,
    stagger: Duration,
    hold_backoff: Duration,
    hold_alert_threshold: usize,
    cursor: AtomicUsize,
    consecutive_holds: AtomicUsize,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<WorkerRegistry>,
        sender: Arc<dyn WorkSender>,
        resubmit: Topic<DispatchMessage>,
        config: &Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            sender,
            resubmit,
            batch_size: config.batch_size.max(1),
            stagger: Duration::from_millis(config.stagger_ms),
            hold_backoff: Duration::from_millis(config.hold_backoff_ms),
            hold_alert_threshold: config.hold_alert_threshold,
            cursor: AtomicUsize::new(0),
            consecutive_holds: AtomicUsize::new(0),
        })
    }

    pub fn registry(&self) -> Arc<WorkerRegistry> {
        self.registry.clone()
    }

    /// Registers a worker endpoint as eligible for batches. Invoked by the
    /// controller for both the initial fleet and rebalance replacements.
    pub fn register_worker(&self, endpoint: crate::fleet::types::WorkerEndpoint, region: crate::fleet::types::Region) {
        self.registry.register(endpoint, region);
    }

    pub fn deregister_worker(&self, endpoint: &crate::fleet::types::WorkerEndpoint) {
        self.registry.deregister(endpoint);
    }

    /// Handler for the dispatch channel.
    ///
    /// Splits `message.item_ids` into batches of `batch_size` and assigns
    /// each to the next active worker. Assignment failures never drop ids:
    /// an unreachable endpoint is marked dead and the batch requeued; an
    /// empty fleet holds the whole remainder for a later pass.
    pub async fn on_dispatch(&self, message: DispatchMessage) -> Result<()> {
        if message.item_ids.is_empty() {
            return Ok(());
        }

        tracing::info!(
            "Dispatching {} ids into batches of {}",
            message.item_ids.len(),
            self.batch_size
        );

        let chunks: Vec<&[_]> = message.item_ids.chunks(self.batch_size).collect();

        for (index, chunk) in chunks.iter().enumerate() {
            let active = self.registry.active_endpoints();

            if active.is_empty() {
                // Hold everything not yet assigned, including this chunk.
                let held: Vec<_> = chunks[index..].concat();
                self.hold(held).await?;
                return Ok(());
            }

            self.consecutive_holds.store(0, Ordering::SeqCst);

            let slot = self.cursor.fetch_add(1, Ordering::SeqCst) % active.len();
            let (endpoint, region) = active[slot].clone();

            let batch = Batch {
                batch_id: BatchId::new(),
                item_ids: chunk.to_vec(),
                origin_region: region,
                target: endpoint.clone(),
            };
            let work = WorkMessage { batch };

            match self.sender.send(&endpoint, &work).await {
                Ok(()) => {
                    tracing::info!(
                        "Published batch {} ({} ids) to worker {}",
                        work.batch.batch_id,
                        work.batch.item_ids.len(),
                        endpoint
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Delivery to {} failed, rerouting batch {}: {}",
                        endpoint,
                        work.batch.batch_id,
                        e
                    );
                    self.registry.mark_dead(&endpoint);
                    self.resubmit.publish(DispatchMessage {
                        item_ids: work.batch.item_ids,
                    })?;
                }
            }

            // Staggered publish: ramp load instead of bursting.
            if index + 1 < chunks.len() && !self.stagger.is_zero() {
                let jitter = rand::random::<u64>() % 50;
                tokio::time::sleep(self.stagger + Duration::from_millis(jitter)).await;
            }
        }

        Ok(())
    }

    /// Requeues unassignable ids after a backoff and tracks exhaustion.
    async fn hold(&self, item_ids: Vec<super::types::ItemId>) -> Result<()> {
        let holds = self.consecutive_holds.fetch_add(1, Ordering::SeqCst) + 1;

        if holds >= self.hold_alert_threshold {
            tracing::error!(
                "Fleet exhausted: no active workers for {} consecutive passes, {} ids held",
                holds,
                item_ids.len()
            );
        } else {
            tracing::warn!(
                "No active workers, holding {} ids (pass {})",
                item_ids.len(),
                holds
            );
        }

        tokio::time::sleep(self.hold_backoff).await;
        self.resubmit.publish(DispatchMessage { item_ids })
    }
}
