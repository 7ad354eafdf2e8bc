//! Hydra — Self-Healing Scraping Fleet
//!
//! Coordinates short-lived scraping workers that fetch per-item pricing from
//! a rate-limited upstream, recovering from partial failures by rerouting
//! unfinished work and regrowing the fleet: kill one failed worker, spawn
//! two replacements in neighboring regions.
//!
//! ## Architecture Modules
//! The system is composed of loosely coupled stages wired by asynchronous
//! messages — no shared memory between them beyond the dispatcher-owned
//! worker registry:
//!
//! - **`bus`**: in-process at-least-once topics, one per logical stage.
//! - **`controller`**: the external entry point; accepts runs and performs
//!   the kill-one-spawn-two rebalance on failure.
//! - **`dispatch`**: re-batches incoming id sequences and assigns them to
//!   active workers round-robin with staggered publishes.
//! - **`worker`**: sequential per-batch processing against the upstream
//!   price source; stops at the first failure and reports the remainder.
//! - **`receiver`**: persists successes idempotently and feeds failures
//!   back into dispatch and rebalancing.
//! - **`warehouse`**: the append-only analytical target behind a sink trait.
//! - **`fleet`**: regions, topology, and the spawn/kill worker platform.

pub mod bus;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod fleet;
pub mod receiver;
pub mod warehouse;
pub mod worker;
