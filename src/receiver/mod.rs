//! Receiver Module
//!
//! The convergence point of the pipeline: successes are persisted, failures
//! re-enter the dispatch channel and trigger fleet rebalancing. The
//! resubmission step is the mechanism behind the system's core invariant —
//! no id placed in a batch is ever silently dropped.

pub mod handlers;
pub mod service;
