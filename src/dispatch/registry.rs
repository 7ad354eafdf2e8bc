//! Worker Registry
//!
//! The single piece of shared mutable state with multiple writers: the
//! mapping from worker endpoint to region and status. All mutation goes
//! through dispatcher-owned operations; workers never write their own
//! entries. `DashMap` gives last-writer-wins per endpoint under concurrent
//! rebalances without losing unrelated entries.

use crate::fleet::types::{Region, WorkerEndpoint, WorkerInfo, WorkerStatus};
use dashmap::DashMap;

pub struct WorkerRegistry {
    workers: DashMap<WorkerEndpoint, WorkerInfo>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self {
            workers: DashMap::new(),
        }
    }

    /// Registers `endpoint` as an active worker in `region`. Re-registering
    /// an existing endpoint resets it to active.
    pub fn register(&self, endpoint: WorkerEndpoint, region: Region) {
        tracing::info!("Registering worker {} in region {}", endpoint, region);
        self.workers.insert(
            endpoint,
            WorkerInfo {
                region,
                status: WorkerStatus::Active,
            },
        );
    }

    /// Removes `endpoint` entirely. Idempotent.
    pub fn deregister(&self, endpoint: &WorkerEndpoint) {
        if self.workers.remove(endpoint).is_some() {
            tracing::info!("Deregistered worker {}", endpoint);
        }
    }

    /// Marks an endpoint dead without removing it, so an unreachable worker
    /// stops receiving batches but stays visible until deregistered.
    pub fn mark_dead(&self, endpoint: &WorkerEndpoint) {
        if let Some(mut entry) = self.workers.get_mut(endpoint) {
            entry.status = WorkerStatus::Dead;
            tracing::warn!("Marked worker {} dead", endpoint);
        }
    }

    pub fn mark_draining(&self, endpoint: &WorkerEndpoint) {
        if let Some(mut entry) = self.workers.get_mut(endpoint) {
            entry.status = WorkerStatus::Draining;
        }
    }

    /// Endpoints currently eligible for work, sorted for a deterministic
    /// round-robin order.
    pub fn active_endpoints(&self) -> Vec<(WorkerEndpoint, Region)> {
        let mut active: Vec<(WorkerEndpoint, Region)> = self
            .workers
            .iter()
            .filter(|entry| entry.value().status == WorkerStatus::Active)
            .map(|entry| (entry.key().clone(), entry.value().region.clone()))
            .collect();

        active.sort_by(|a, b| a.0.cmp(&b.0));
        active
    }

    pub fn contains(&self, endpoint: &WorkerEndpoint) -> bool {
        self.workers.contains_key(endpoint)
    }

    pub fn status_of(&self, endpoint: &WorkerEndpoint) -> Option<WorkerStatus> {
        self.workers.get(endpoint).map(|entry| entry.status.clone())
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
