//! Dispatch Module
//!
//! The fan-out stage between a run and the worker fleet.
//!
//! ## Responsibilities
//! - **Re-batching**: controller chunks arrive on the dispatch channel and
//!   are split again into worker-sized batches (two-level fan-out).
//! - **Assignment**: round-robin over active endpoints in the registry,
//!   skipping draining and dead workers.
//! - **Staggering**: a jittered gap between successive publishes smooths
//!   worker load.
//! - **Holding**: with no active workers, batches are requeued with backoff
//!   rather than dropped — the no-loss invariant starts here.

pub mod registry;
pub mod service;
pub mod transport;
pub mod types;
