use serde::{Deserialize, Serialize};

/// A deployment locality. Scopes a worker's endpoint and determines where
/// replacements are spawned after a failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Region(pub String);

impl Region {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Network address of one worker process. Workers are reachable at this
/// endpoint for work delivery once spawned; the value is opaque to everything
/// except the transport that delivers to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerEndpoint(pub String);

impl std::fmt::Display for WorkerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a registered worker.
///
/// Only `Active` workers receive batches. `Draining` and `Dead` entries stay
/// visible for observability until deregistered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum WorkerStatus {
    Active,
    Draining,
    Dead,
}

/// Registry entry for one worker endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub region: Region,
    pub status: WorkerStatus,
}
