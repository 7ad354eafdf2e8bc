use crate::dispatch::types::ItemId;
use crate::worker::types::{Listing, SuccessResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One appended warehouse row: the pricing observed for one item on one
/// date. The `(item_id, date)` pair is the idempotence key; flattening the
/// nested listings into the analytical schema's per-listing tables and
/// change-detection views belongs to the warehouse collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRow {
    pub item_id: ItemId,
    pub date: NaiveDate,
    pub listings: Vec<Listing>,
    pub fetched_at: DateTime<Utc>,
}

impl From<SuccessResult> for PriceRow {
    fn from(result: SuccessResult) -> Self {
        Self {
            item_id: result.item_id,
            date: result.fetched_at.date_naive(),
            listings: result.listings,
            fetched_at: result.fetched_at,
        }
    }
}
