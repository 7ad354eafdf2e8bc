//! Result Publishing
//!
//! How a worker hands its batch outcome back to the coordinator: success
//! lists on the success channel, failure reports on the failure channel.
//! In-process workers publish straight onto the topics; out-of-process
//! workers post to the coordinator's internal ingest endpoints.

use super::types::{FailureReport, SuccessResult};
use crate::bus::Topic;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ResultPublisher: Send + Sync {
    async fn publish_success(&self, results: Vec<SuccessResult>) -> Result<()>;
    async fn publish_failure(&self, report: FailureReport) -> Result<()>;
}

/// Publishes onto in-process bus topics.
pub struct TopicPublisher {
    success: Topic<Vec<SuccessResult>>,
    failure: Topic<FailureReport>,
}

impl TopicPublisher {
    pub fn new(success: Topic<Vec<SuccessResult>>, failure: Topic<FailureReport>) -> Self {
        Self { success, failure }
    }
}

#[async_trait]
impl ResultPublisher for TopicPublisher {
    async fn publish_success(&self, results: Vec<SuccessResult>) -> Result<()> {
        self.success.publish(results)
    }

    async fn publish_failure(&self, report: FailureReport) -> Result<()> {
        self.failure.publish(report)
    }
}

/// Publishes over HTTP to the coordinator's internal ingest endpoints,
/// retrying transport errors with jittered backoff. A worker that cannot
/// reach the coordinator at all keeps the error; the batch is then covered
/// by bus-level redelivery of the original work message.
pub struct HttpResultPublisher {
    http_client: reqwest::Client,
    coordinator_url: String,
}

impl HttpResultPublisher {
    pub fn new(coordinator_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            coordinator_url: coordinator_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_with_retry<T: serde::Serialize>(&self, path: &str, payload: &T) -> Result<()> {
        let url = format!("{}{}", self.coordinator_url, path);
        let mut delay_ms = 150u64;
        let attempts = 3;

        for attempt in 0..attempts {
            let response = self
                .http_client
                .post(&url)
                .json(payload)
                .timeout(std::time::Duration::from_secs(5))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    return Err(anyhow::anyhow!("Coordinator rejected {}: {}", path, resp.status()));
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

#[async_trait]
impl ResultPublisher for HttpResultPublisher {
    async fn publish_success(&self, results: Vec<SuccessResult>) -> Result<()> {
        self.post_with_retry("/internal/success", &results).await
    }

    async fn publish_failure(&self, report: FailureReport) -> Result<()> {
        self.post_with_retry("/internal/failure", &report).await
    }
}
