//! Topic primitives: cloneable publishers and consumer loops with
//! redelivery-on-error.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Pause before a failed message is re-published, to avoid hot-looping on a
/// persistently failing handler.
const REDELIVERY_DELAY: Duration = Duration::from_millis(100);

/// A cloneable publisher handle for one logical channel.
pub struct Topic<T> {
    name: &'static str,
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

/// The consuming end of a topic. Exactly one consumer owns this.
pub struct TopicReceiver<T> {
    name: &'static str,
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> Topic<T> {
    /// Creates a topic, returning the publisher handle and the single
    /// consuming end.
    pub fn channel(name: &'static str) -> (Topic<T>, TopicReceiver<T>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Topic { name, tx }, TopicReceiver { name, rx })
    }

    /// Publishes a message. Fails only if the consuming end is gone, which
    /// counts as bus unavailability and must be surfaced, not swallowed.
    pub fn publish(&self, message: T) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| anyhow::anyhow!("topic '{}' has no consumer", self.name))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> TopicReceiver<T> {
    /// Receives the next message, or `None` once all publishers are dropped.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Spawns the consumer loop for a topic.
///
/// Each message is handed to `handler`; on `Err` the message is re-published
/// to `redeliver` (normally a clone of the same topic) after a short delay.
/// The loop ends when every publisher handle has been dropped.
pub fn spawn_consumer<T, F, Fut>(
    mut rx: TopicReceiver<T>,
    redeliver: Topic<T>,
    handler: F,
) -> JoinHandle<()>
where
    T: Clone + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        tracing::info!("Consumer started for topic '{}'", rx.name());

        while let Some(message) = rx.recv().await {
            if let Err(e) = handler(message.clone()).await {
                tracing::warn!(
                    "Handler on topic '{}' failed, scheduling redelivery: {}",
                    rx.name(),
                    e
                );
                tokio::time::sleep(REDELIVERY_DELAY).await;

                if redeliver.publish(message).is_err() {
                    tracing::error!(
                        "Redelivery on topic '{}' impossible, consumer gone",
                        rx.name()
                    );
                    break;
                }
            }
        }

        tracing::info!("Consumer for topic '{}' stopped", rx.name());
    })
}
