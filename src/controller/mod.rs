//! Controller Module
//!
//! The fleet's externally addressable head. Two contracts:
//!
//! - **StartRun** (`POST /run`, credential-gated): resolve the id set, split
//!   it into chunks, publish each to the dispatch channel, acknowledge with
//!   202. Fire-and-forget: the caller never waits on downstream completion.
//! - **Rebalance**: invoked by the receiver on worker failure — kill the
//!   failed endpoint, spawn two replacements in neighboring regions, and
//!   register them with the dispatcher.

pub mod handlers;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;
