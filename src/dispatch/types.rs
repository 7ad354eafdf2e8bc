use crate::fleet::types::{Region, WorkerEndpoint};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a priceable product. Sourced from the warehouse
/// catalog or supplied explicitly by the caller starting a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for one batch.
///
/// Wrapper around a UUID string. At-least-once delivery means a batch can be
/// processed twice; the id is a dedup hint for logs and diagnostics, never a
/// correctness mechanism — warehouse idempotence is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BatchId(pub String);

impl BatchId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A bounded, ordered set of item ids assigned to one worker.
///
/// Consumed sequentially by exactly one worker per delivery; order matters
/// because failure reporting defines "remaining" as "not yet attempted, in
/// original order".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub batch_id: BatchId,
    pub item_ids: Vec<ItemId>,
    pub origin_region: Region,
    pub target: WorkerEndpoint,
}

/// Wire form of a batch on the work channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkMessage {
    pub batch: Batch,
}

/// A run fragment on the dispatch channel: an ordered id sequence awaiting
/// re-batching and assignment. Published by the controller for new runs and
/// by the receiver when resubmitting the remainder of a failed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchMessage {
    pub item_ids: Vec<ItemId>,
}
