//! Work Transport
//!
//! Delivery of addressed work messages to a specific worker endpoint. Unlike
//! the broadcast topics, work is point-to-point: the dispatcher picks the
//! target, the transport gets the message there.

use super::types::WorkMessage;
use crate::fleet::types::WorkerEndpoint;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

#[async_trait]
pub trait WorkSender: Send + Sync {
    /// Delivers `message` to the worker at `target`. An error means the
    /// endpoint could not be reached; the dispatcher reroutes the batch.
    async fn send(&self, target: &WorkerEndpoint, message: &WorkMessage) -> Result<()>;
}

/// HTTP transport: posts the work message to `http://{endpoint}/work`.
/// Retries transient transport errors with jittered exponential backoff
/// before giving up on the endpoint.
pub struct HttpWorkSender {
    http_client: reqwest::Client,
}

impl HttpWorkSender {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpWorkSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkSender for HttpWorkSender {
    async fn send(&self, target: &WorkerEndpoint, message: &WorkMessage) -> Result<()> {
        let url = format!("http://{}/work", target);
        let mut delay_ms = 150u64;
        let attempts = 3;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(&url)
                .json(message)
                .timeout(std::time::Duration::from_secs(5))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    return Err(anyhow::anyhow!(
                        "Worker {} rejected work: {}",
                        target,
                        resp.status()
                    ));
                }
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

/// In-process transport: a route table from endpoint to a worker inbox.
/// The in-process platform attaches a route per spawned worker and detaches
/// it on kill, so sends to a killed endpoint fail like a dead network peer.
pub struct ChannelWorkSender {
    routes: DashMap<WorkerEndpoint, mpsc::UnboundedSender<WorkMessage>>,
}

impl ChannelWorkSender {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    /// Creates an inbox for `endpoint` and routes future sends to it.
    pub fn attach(&self, endpoint: WorkerEndpoint) -> mpsc::UnboundedReceiver<WorkMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.insert(endpoint, tx);
        rx
    }

    pub fn detach(&self, endpoint: &WorkerEndpoint) {
        self.routes.remove(endpoint);
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Default for ChannelWorkSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkSender for ChannelWorkSender {
    async fn send(&self, target: &WorkerEndpoint, message: &WorkMessage) -> Result<()> {
        let route = self
            .routes
            .get(target)
            .ok_or_else(|| anyhow::anyhow!("No route to worker {}", target))?;

        route
            .send(message.clone())
            .map_err(|_| anyhow::anyhow!("Worker {} inbox closed", target))
    }
}
