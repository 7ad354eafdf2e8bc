//! Warehouse Sink Interface
//!
//! The analytical store reduced to what the core needs from it: append rows
//! idempotently by `(item_id, date)`, and enumerate the known item universe
//! for runs started without an explicit id list.

use super::types::PriceRow;
use crate::dispatch::types::ItemId;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait WarehouseSink: Send + Sync {
    /// Appends `rows`, skipping any whose `(item_id, date)` key already
    /// exists. Returns the number of rows actually inserted, so a replayed
    /// success batch reports zero instead of duplicating data.
    async fn append_rows(&self, rows: Vec<PriceRow>) -> Result<usize>;

    /// The full current id universe, in a stable order.
    async fn item_ids(&self) -> Result<Vec<ItemId>>;
}
