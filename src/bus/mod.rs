//! Message Bus Module
//!
//! In-process publish/subscribe topics with at-least-once delivery semantics.
//! One topic exists per logical stage (dispatch, success, failure); work
//! delivery to a specific worker endpoint goes through the dispatch
//! transport instead, since it is addressed rather than broadcast.
//!
//! ## Delivery Contract
//! - **Fire-and-forget publish**: publishers never block on consumers.
//! - **Redelivery on failure**: a consumer handler returning `Err` causes the
//!   message to be re-published to the same topic after a short delay, so
//!   every handler must be safely re-invocable (idempotent consumers).
//! - **No cross-message ordering**: redelivered messages interleave with new
//!   ones; nothing may rely on topic-level ordering.

pub mod topic;

pub use topic::{Topic, TopicReceiver, spawn_consumer};
