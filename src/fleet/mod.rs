//! Fleet Module
//!
//! Regions, the region adjacency topology, and the worker platform — the
//! external compute collaborator reduced to `spawn(region) -> endpoint` and
//! `kill(endpoint)`.
//!
//! ## Core Concepts
//! - **Region**: deployment locality; workers are bound to exactly one.
//! - **Topology**: static adjacency with declared ordering, the deterministic
//!   basis for picking the two replacement regions during a rebalance.
//! - **Platform**: process-backed in production, task-backed in-process for
//!   local runs and tests.

pub mod platform;
pub mod topology;
pub mod types;
