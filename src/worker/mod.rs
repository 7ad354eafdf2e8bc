//! Worker Module
//!
//! A stateless process bound to one region and one endpoint, processing one
//! batch of item ids at a time against the upstream price source.
//!
//! ## Submodules
//! - **`service`**: the Idle → Processing → Completed/Failed batch machine.
//! - **`upstream`**: the price source trait and its HTTP implementation.
//! - **`publish`**: how outcomes travel back to the coordinator (topics
//!   in-process, HTTP across processes).
//! - **`handlers`**: the `POST /work` surface of an out-of-process worker.

pub mod handlers;
pub mod publish;
pub mod service;
pub mod types;
pub mod upstream;
