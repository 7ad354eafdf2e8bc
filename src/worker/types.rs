use crate::dispatch::types::{BatchId, ItemId};
use crate::fleet::types::{Region, WorkerEndpoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One seller listing returned by the upstream pricing search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub sku: Option<i64>,
    pub seller_id: Option<String>,
    pub seller_name: Option<String>,
    pub price: Option<f64>,
}

/// Pricing fetched for one item id. Accumulated per batch and published as a
/// list when the batch completes or fails part-way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResult {
    pub item_id: ItemId,
    pub listings: Vec<Listing>,
    pub fetched_at: DateTime<Utc>,
}

/// Published the instant a worker observes a non-success response.
///
/// `remaining` is the ordered tail of the batch that was not completed,
/// INCLUDING the id that failed — the failing id is retried by whichever
/// worker receives the resubmission. This inclusion is a fixed policy;
/// changing it moves the boundary of the no-loss invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub batch_id: BatchId,
    pub failed_at: ItemId,
    pub remaining: Vec<ItemId>,
    pub endpoint: WorkerEndpoint,
    pub region: Region,
}

/// Terminal disposition of one batch pass, for logs and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Every id succeeded; the full success list was published.
    Completed { succeeded: usize },
    /// Processing stopped at a failure; successes so far and a failure
    /// report were published.
    Failed { succeeded: usize, remaining: usize },
}
