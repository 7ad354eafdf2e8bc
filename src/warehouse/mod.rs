//! Warehouse Module
//!
//! Append-only analytical target for scraped pricing. The core depends on
//! two operations only: idempotent row append keyed by `(item_id, date)`,
//! and enumerating the known item universe. Everything else about the
//! analytical schema lives with the external collaborator.

pub mod memory;
pub mod sink;
pub mod types;
