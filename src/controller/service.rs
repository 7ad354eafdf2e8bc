//! Controller Service
//!
//! The only externally addressable component. Accepts a run (explicit ids or
//! the warehouse universe), performs the first-level chunk split, and
//! publishes one dispatch message per chunk — fire-and-forget. Also owns the
//! rebalance action: kill the failed worker, grow two replacements in
//! neighboring regions, register them with the dispatcher.

use super::types::{RebalanceOutcome, RunAccepted};
use crate::bus::Topic;
use crate::dispatch::service::Dispatcher;
use crate::dispatch::types::{DispatchMessage, ItemId};
use crate::fleet::platform::WorkerPlatform;
use crate::fleet::topology::RegionTopology;
use crate::fleet::types::{Region, WorkerEndpoint};
use crate::warehouse::sink::WarehouseSink;

use anyhow::Result;
use std::sync::Arc;

pub struct Controller {
    warehouse: Arc<dyn WarehouseSink>,
    dispatch: Topic<DispatchMessage>,
    topology: Arc<RegionTopology>,
    platform: Arc<dyn WorkerPlatform>,
    dispatcher: Arc<Dispatcher>,
    chunk_size: usize,
}

impl Controller {
    pub fn new(
        warehouse: Arc<dyn WarehouseSink>,
        dispatch: Topic<DispatchMessage>,
        topology: Arc<RegionTopology>,
        platform: Arc<dyn WorkerPlatform>,
        dispatcher: Arc<Dispatcher>,
        chunk_size: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            warehouse,
            dispatch,
            topology,
            platform,
            dispatcher,
            chunk_size: chunk_size.max(1),
        })
    }

    /// Accepts a run and publishes its chunks to the dispatch channel.
    ///
    /// With `ids` absent the full id universe is resolved from the
    /// warehouse. Returns as soon as every chunk is published; completion is
    /// observed through the warehouse, not through this call.
    pub async fn start_run(&self, ids: Option<Vec<ItemId>>) -> Result<RunAccepted> {
        let ids = match ids {
            Some(ids) if !ids.is_empty() => ids,
            _ => self.warehouse.item_ids().await?,
        };

        let run_id = uuid::Uuid::new_v4().to_string();
        let item_count = ids.len();
        let mut chunk_count = 0;

        for chunk in ids.chunks(self.chunk_size) {
            self.dispatch.publish(DispatchMessage {
                item_ids: chunk.to_vec(),
            })?;
            chunk_count += 1;
        }

        tracing::info!(
            "Run {} accepted: {} ids in {} chunk(s)",
            run_id,
            item_count,
            chunk_count
        );

        Ok(RunAccepted {
            run_id,
            item_count,
            chunk_count,
        })
    }

    /// Reacts to a worker failure: one head cut off, two grow back.
    ///
    /// Effects are independent — a kill that does not land never blocks the
    /// spawns, and a spawn failure in one region never blocks the other.
    /// Spawn failures are alerted, not retried; the system continues with a
    /// reduced fleet.
    pub async fn rebalance(
        &self,
        failed_endpoint: &WorkerEndpoint,
        region: &Region,
    ) -> Result<RebalanceOutcome> {
        tracing::info!(
            "Rebalancing: killing {} in region {}",
            failed_endpoint,
            region
        );

        self.dispatcher.deregister_worker(failed_endpoint);

        if let Err(e) = self.platform.kill(failed_endpoint).await {
            tracing::error!("Kill signal to {} failed: {}", failed_endpoint, e);
        }

        let targets = self.topology.spawn_targets(region);
        if targets.len() < 2 {
            tracing::error!(
                "Topology offers only {} neighbor(s) for region {}",
                targets.len(),
                region
            );
        }

        let mut spawned = Vec::new();
        let mut failed_regions = Vec::new();

        for target in targets {
            match self.platform.spawn(&target).await {
                Ok(endpoint) => {
                    self.dispatcher
                        .register_worker(endpoint.clone(), target.clone());
                    spawned.push((target, endpoint));
                }
                Err(e) => {
                    tracing::error!("Spawn in region {} failed: {}", target, e);
                    failed_regions.push(target);
                }
            }
        }

        Ok(RebalanceOutcome {
            killed: failed_endpoint.clone(),
            spawned,
            failed_regions,
        })
    }
}
