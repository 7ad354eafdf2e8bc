//! In-memory warehouse implementation.
//!
//! Backs local runs and tests. Rows live in a `DashMap` keyed by
//! `(item_id, date)` with first-write-wins inserts, which is the idempotence
//! contract the production store provides through its natural key. A
//! separate catalog set models the product table the controller resolves
//! "all known ids" from.

use super::sink::WarehouseSink;
use super::types::PriceRow;
use crate::dispatch::types::ItemId;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::{DashMap, DashSet};

pub struct MemoryWarehouse {
    rows: DashMap<(ItemId, NaiveDate), PriceRow>,
    catalog: DashSet<ItemId>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            catalog: DashSet::new(),
        }
    }

    /// Seeds the catalog with known item ids, as if they were already
    /// present in the product table.
    pub fn register_items(&self, ids: Vec<ItemId>) {
        for id in ids {
            self.catalog.insert(id);
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, item_id: &ItemId, date: &NaiveDate) -> Option<PriceRow> {
        self.rows
            .get(&(item_id.clone(), *date))
            .map(|entry| entry.value().clone())
    }

    /// Distinct item ids that have at least one stored row, sorted.
    pub fn stored_item_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self
            .rows
            .iter()
            .map(|entry| entry.key().0.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl Default for MemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WarehouseSink for MemoryWarehouse {
    async fn append_rows(&self, rows: Vec<PriceRow>) -> Result<usize> {
        let mut inserted = 0;

        for row in rows {
            let key = (row.item_id.clone(), row.date);
            self.catalog.insert(row.item_id.clone());

            // First write wins; a replayed append is a no-op.
            if !self.rows.contains_key(&key) {
                self.rows.insert(key, row);
                inserted += 1;
            }
        }

        if inserted > 0 {
            tracing::info!("Appended {} new warehouse rows", inserted);
        }

        Ok(inserted)
    }

    async fn item_ids(&self) -> Result<Vec<ItemId>> {
        let mut ids: Vec<ItemId> = self.catalog.iter().map(|id| id.clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
