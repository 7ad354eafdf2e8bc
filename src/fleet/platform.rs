//! Worker Platform
//!
//! The compute collaborator behind a two-operation interface: spawn a worker
//! in a region, kill a worker at an endpoint. The controller's rebalance
//! action is written against this trait so the platform can be a real
//! process manager, an orchestrator API, or an in-process simulation.

use super::types::{Region, WorkerEndpoint};
use crate::dispatch::transport::ChannelWorkSender;
use crate::worker::service::Worker;
use crate::worker::upstream::PriceSource;
use crate::worker::publish::ResultPublisher;

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use tokio::task::JoinHandle;

#[async_trait]
pub trait WorkerPlatform: Send + Sync {
    /// Starts one worker in `region` and returns the endpoint it is
    /// reachable at over the work transport.
    async fn spawn(&self, region: &Region) -> Result<WorkerEndpoint>;

    /// Tears down the worker at `endpoint`. Advisory: a worker mid-batch may
    /// finish its current item before the kill lands, and the system
    /// tolerates that.
    async fn kill(&self, endpoint: &WorkerEndpoint) -> Result<()>;
}

/// Platform that runs workers as child processes of the current executable
/// (`--role worker`). Each spawn gets the next port on the local host.
pub struct ProcessPlatform {
    exe: std::path::PathBuf,
    host: String,
    coordinator_url: String,
    next_port: AtomicU16,
    children: DashMap<WorkerEndpoint, tokio::process::Child>,
}

impl ProcessPlatform {
    pub fn new(host: &str, first_port: u16, coordinator_url: &str) -> Result<Self> {
        Ok(Self {
            exe: std::env::current_exe()?,
            host: host.to_string(),
            coordinator_url: coordinator_url.to_string(),
            next_port: AtomicU16::new(first_port),
            children: DashMap::new(),
        })
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

#[async_trait]
impl WorkerPlatform for ProcessPlatform {
    async fn spawn(&self, region: &Region) -> Result<WorkerEndpoint> {
        let port = self.next_port.fetch_add(1, Ordering::SeqCst);
        let bind = format!("{}:{}", self.host, port);

        let child = tokio::process::Command::new(&self.exe)
            .arg("--role")
            .arg("worker")
            .arg("--bind")
            .arg(&bind)
            .arg("--region")
            .arg(&region.0)
            .arg("--controller")
            .arg(&self.coordinator_url)
            .kill_on_drop(true)
            .spawn()?;

        let endpoint = WorkerEndpoint(bind);
        self.children.insert(endpoint.clone(), child);

        tracing::info!("Spawned worker process at {} in region {}", endpoint, region);
        Ok(endpoint)
    }

    async fn kill(&self, endpoint: &WorkerEndpoint) -> Result<()> {
        match self.children.remove(endpoint) {
            Some((_, mut child)) => {
                child.start_kill()?;
                tracing::info!("Sent kill to worker process at {}", endpoint);
                Ok(())
            }
            None => {
                tracing::warn!("Kill requested for unknown endpoint {}", endpoint);
                Ok(())
            }
        }
    }
}

/// Platform that runs workers as in-process tasks wired to a
/// [`ChannelWorkSender`] route table. Backs single-process (`--role local`)
/// runs and the test suite; records every spawn and kill so rebalance
/// fan-out can be asserted.
pub struct InProcessPlatform {
    routes: Arc<ChannelWorkSender>,
    source: Arc<dyn PriceSource>,
    publisher: Arc<dyn ResultPublisher>,
    counter: AtomicUsize,
    tasks: DashMap<WorkerEndpoint, JoinHandle<()>>,
    spawn_log: Mutex<Vec<(Region, WorkerEndpoint)>>,
    kill_log: Mutex<Vec<WorkerEndpoint>>,
}

impl InProcessPlatform {
    pub fn new(
        routes: Arc<ChannelWorkSender>,
        source: Arc<dyn PriceSource>,
        publisher: Arc<dyn ResultPublisher>,
    ) -> Self {
        Self {
            routes,
            source,
            publisher,
            counter: AtomicUsize::new(0),
            tasks: DashMap::new(),
            spawn_log: Mutex::new(Vec::new()),
            kill_log: Mutex::new(Vec::new()),
        }
    }

    pub fn spawned(&self) -> Vec<(Region, WorkerEndpoint)> {
        self.spawn_log.lock().unwrap().clone()
    }

    pub fn killed(&self) -> Vec<WorkerEndpoint> {
        self.kill_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkerPlatform for InProcessPlatform {
    async fn spawn(&self, region: &Region) -> Result<WorkerEndpoint> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let endpoint = WorkerEndpoint(format!("local-{}-{}", region, n));

        let worker = Arc::new(Worker::new(
            endpoint.clone(),
            region.clone(),
            self.source.clone(),
            self.publisher.clone(),
        ));

        let mut inbox = self.routes.attach(endpoint.clone());
        let task = tokio::spawn(async move {
            while let Some(message) = inbox.recv().await {
                if let Err(e) = worker.process_batch(message.batch).await {
                    tracing::error!("In-process worker failed to report a batch: {}", e);
                }
            }
        });

        self.tasks.insert(endpoint.clone(), task);
        self.spawn_log
            .lock()
            .unwrap()
            .push((region.clone(), endpoint.clone()));

        tracing::info!("Spawned in-process worker {} in region {}", endpoint, region);
        Ok(endpoint)
    }

    async fn kill(&self, endpoint: &WorkerEndpoint) -> Result<()> {
        // Detaching closes the inbox; the task drains work it already
        // accepted and then exits. Kills are advisory, accepted batches are
        // never abandoned mid-flight.
        self.routes.detach(endpoint);
        self.tasks.remove(endpoint);
        self.kill_log.lock().unwrap().push(endpoint.clone());

        tracing::info!("Killed in-process worker {}", endpoint);
        Ok(())
    }
}
