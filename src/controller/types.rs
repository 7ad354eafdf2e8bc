use crate::fleet::types::{Region, WorkerEndpoint};
use serde::{Deserialize, Serialize};

/// Body of `POST /run`. `ids` is a comma-separated list; absent or empty
/// means "all ids known to the warehouse".
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    pub ids: Option<String>,
}

/// Acknowledgement returned to the caller. The run proceeds asynchronously;
/// there is no synchronous result to wait for.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub status: String,
    pub run_id: Option<String>,
    pub item_count: usize,
    pub chunk_count: usize,
}

/// Summary of a run accepted by the controller.
#[derive(Debug, Clone)]
pub struct RunAccepted {
    pub run_id: String,
    pub item_count: usize,
    pub chunk_count: usize,
}

/// What one rebalance pass actually did. Spawn failures are recorded, not
/// retried; the fleet keeps operating at reduced size.
#[derive(Debug, Clone)]
pub struct RebalanceOutcome {
    pub killed: WorkerEndpoint,
    pub spawned: Vec<(Region, WorkerEndpoint)>,
    pub failed_regions: Vec<Region>,
}
