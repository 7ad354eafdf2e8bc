//! Controller Module Tests
//!
//! Validates run acceptance (chunking, id universe resolution, credential
//! gate) and the kill-one-spawn-two rebalance.

#[cfg(test)]
mod tests {
    use crate::bus::{Topic, TopicReceiver};
    use crate::config::Config;
    use crate::controller::handlers::{handle_start_run, ApiKey, API_KEY_HEADER};
    use crate::controller::service::Controller;
    use crate::controller::types::RunRequest;
    use crate::dispatch::registry::WorkerRegistry;
    use crate::dispatch::service::Dispatcher;
    use crate::dispatch::transport::ChannelWorkSender;
    use crate::dispatch::types::{DispatchMessage, ItemId};
    use crate::fleet::platform::WorkerPlatform;
    use crate::fleet::topology::RegionTopology;
    use crate::fleet::types::{Region, WorkerEndpoint, WorkerStatus};
    use crate::warehouse::memory::MemoryWarehouse;
    use crate::warehouse::sink::WarehouseSink;
    use anyhow::Result;
    use async_trait::async_trait;
    use axum::extract::Extension;
    use axum::http::{HeaderMap, StatusCode};
    use axum::Json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Platform fake: hands out deterministic endpoints and records calls.
    struct FakePlatform {
        counter: AtomicUsize,
        spawned: Mutex<Vec<(Region, WorkerEndpoint)>>,
        killed: Mutex<Vec<WorkerEndpoint>>,
        fail_spawns: bool,
    }

    impl FakePlatform {
        fn new() -> Self {
            Self {
                counter: AtomicUsize::new(0),
                spawned: Mutex::new(Vec::new()),
                killed: Mutex::new(Vec::new()),
                fail_spawns: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_spawns: true,
                ..Self::new()
            }
        }

        fn killed(&self) -> Vec<WorkerEndpoint> {
            self.killed.lock().unwrap().clone()
        }

        fn spawned(&self) -> Vec<(Region, WorkerEndpoint)> {
            self.spawned.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl WorkerPlatform for FakePlatform {
        async fn spawn(&self, region: &Region) -> Result<WorkerEndpoint> {
            if self.fail_spawns {
                return Err(anyhow::anyhow!("no capacity in {}", region));
            }
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let endpoint = WorkerEndpoint(format!("fake-{}-{}", region, n));
            self.spawned
                .lock()
                .unwrap()
                .push((region.clone(), endpoint.clone()));
            Ok(endpoint)
        }

        async fn kill(&self, endpoint: &WorkerEndpoint) -> Result<()> {
            self.killed.lock().unwrap().push(endpoint.clone());
            Ok(())
        }
    }

    struct Fixture {
        controller: Arc<Controller>,
        registry: Arc<WorkerRegistry>,
        platform: Arc<FakePlatform>,
        dispatch_rx: TopicReceiver<DispatchMessage>,
    }

    fn fixture_with(platform: FakePlatform, chunk_size: usize) -> Fixture {
        let config = Config {
            api_key: "test-key".to_string(),
            api_url: "http://127.0.0.1:1/price".to_string(),
            coordinator_url: "http://127.0.0.1:1".to_string(),
            chunk_size,
            batch_size: 2,
            stagger_ms: 0,
            hold_backoff_ms: 10,
            hold_alert_threshold: 3,
        };

        let (dispatch_topic, dispatch_rx) = Topic::<DispatchMessage>::channel("dispatch");
        let registry = Arc::new(WorkerRegistry::new());
        let dispatcher = Dispatcher::new(
            registry.clone(),
            Arc::new(ChannelWorkSender::new()),
            dispatch_topic.clone(),
            &config,
        );

        let warehouse: Arc<dyn WarehouseSink> = Arc::new(MemoryWarehouse::new());
        let platform = Arc::new(platform);
        let controller = Controller::new(
            warehouse,
            dispatch_topic,
            Arc::new(RegionTopology::ring(&[
                "us-east", "us-west", "eu-west", "ap-south",
            ])),
            platform.clone(),
            dispatcher,
            config.chunk_size,
        );

        Fixture {
            controller,
            registry,
            platform,
            dispatch_rx,
        }
    }

    fn ids(raw: &[&str]) -> Vec<ItemId> {
        raw.iter().map(|id| ItemId::new(id)).collect()
    }

    async fn next_message(rx: &mut TopicReceiver<DispatchMessage>) -> DispatchMessage {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    // ============================================================
    // START RUN TESTS
    // ============================================================

    #[tokio::test]
    async fn test_start_run_chunks_explicit_ids() {
        // ARRANGE: seven ids, chunks of three.
        let mut fixture = fixture_with(FakePlatform::new(), 3);

        // ACT
        let accepted = fixture
            .controller
            .start_run(Some(ids(&["1", "2", "3", "4", "5", "6", "7"])))
            .await
            .unwrap();

        // ASSERT: three ordered chunks, the last one short
        assert_eq!(accepted.item_count, 7);
        assert_eq!(accepted.chunk_count, 3);

        let first = next_message(&mut fixture.dispatch_rx).await;
        assert_eq!(first.item_ids, ids(&["1", "2", "3"]));
        let second = next_message(&mut fixture.dispatch_rx).await;
        assert_eq!(second.item_ids, ids(&["4", "5", "6"]));
        let third = next_message(&mut fixture.dispatch_rx).await;
        assert_eq!(third.item_ids, ids(&["7"]));
    }

    #[tokio::test]
    async fn test_start_run_without_ids_uses_warehouse_universe() {
        // ARRANGE
        let mut fixture = fixture_with(FakePlatform::new(), 10);
        let warehouse = Arc::new(MemoryWarehouse::new());
        warehouse.register_items(ids(&["200", "100", "300"]));

        // Rebuild the controller around the seeded warehouse.
        let (dispatch_topic, dispatch_rx) = Topic::<DispatchMessage>::channel("dispatch");
        fixture.dispatch_rx = dispatch_rx;
        let sink: Arc<dyn WarehouseSink> = warehouse;
        let config = Config {
            api_key: "test-key".to_string(),
            api_url: "http://127.0.0.1:1/price".to_string(),
            coordinator_url: "http://127.0.0.1:1".to_string(),
            chunk_size: 10,
            batch_size: 2,
            stagger_ms: 0,
            hold_backoff_ms: 10,
            hold_alert_threshold: 3,
        };
        let dispatcher = Dispatcher::new(
            fixture.registry.clone(),
            Arc::new(ChannelWorkSender::new()),
            dispatch_topic.clone(),
            &config,
        );
        let controller = Controller::new(
            sink,
            dispatch_topic,
            Arc::new(RegionTopology::ring(&["us-east", "us-west"])),
            fixture.platform.clone(),
            dispatcher,
            10,
        );

        // ACT
        let accepted = controller.start_run(None).await.unwrap();

        // ASSERT: the catalog resolves sorted
        assert_eq!(accepted.item_count, 3);
        assert_eq!(accepted.chunk_count, 1);

        let message = next_message(&mut fixture.dispatch_rx).await;
        assert_eq!(message.item_ids, ids(&["100", "200", "300"]));
    }

    // ============================================================
    // REBALANCE TESTS
    // ============================================================

    #[tokio::test]
    async fn test_rebalance_kills_one_and_spawns_two_neighbors() {
        // ARRANGE: one registered worker in us-east.
        let fixture = fixture_with(FakePlatform::new(), 3);
        let failed = WorkerEndpoint("w:1".to_string());
        fixture
            .registry
            .register(failed.clone(), Region::new("us-east"));

        // ACT
        let outcome = fixture
            .controller
            .rebalance(&failed, &Region::new("us-east"))
            .await
            .unwrap();

        // ASSERT: one kill, two replacements in distinct neighbor regions
        assert_eq!(outcome.killed, failed);
        assert_eq!(fixture.platform.killed(), vec![failed.clone()]);

        assert_eq!(outcome.spawned.len(), 2);
        assert_eq!(outcome.spawned[0].0, Region::new("us-west"));
        assert_eq!(outcome.spawned[1].0, Region::new("ap-south"));
        assert!(outcome.failed_regions.is_empty());

        // Registry reflects the new fleet shape.
        assert!(!fixture.registry.contains(&failed));
        assert_eq!(fixture.registry.len(), 2);
        for (_, endpoint) in &outcome.spawned {
            assert_eq!(
                fixture.registry.status_of(endpoint),
                Some(WorkerStatus::Active)
            );
        }
    }

    #[tokio::test]
    async fn test_rebalance_survives_spawn_failures() {
        // ARRANGE: the platform has no capacity anywhere.
        let fixture = fixture_with(FakePlatform::failing(), 3);
        let failed = WorkerEndpoint("w:1".to_string());
        fixture
            .registry
            .register(failed.clone(), Region::new("eu-west"));

        // ACT
        let outcome = fixture
            .controller
            .rebalance(&failed, &Region::new("eu-west"))
            .await
            .unwrap();

        // ASSERT: the kill still lands, both spawn failures are reported
        assert_eq!(fixture.platform.killed(), vec![failed.clone()]);
        assert!(outcome.spawned.is_empty());
        assert_eq!(outcome.failed_regions.len(), 2);
        assert!(fixture.registry.is_empty());
    }

    // ============================================================
    // HTTP HANDLER TESTS
    // ============================================================

    #[tokio::test]
    async fn test_run_handler_rejects_bad_credential() {
        // ARRANGE
        let mut fixture = fixture_with(FakePlatform::new(), 3);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "wrong-key".parse().unwrap());

        // ACT
        let (status, Json(response)) = handle_start_run(
            Extension(fixture.controller.clone()),
            Extension(ApiKey("test-key".to_string())),
            headers,
            Some(Json(RunRequest {
                ids: Some("1,2,3".to_string()),
            })),
        )
        .await;

        // ASSERT: rejected synchronously, nothing dispatched
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response.status, "unauthorized");
        assert!(response.run_id.is_none());

        let nothing =
            tokio::time::timeout(Duration::from_millis(50), fixture.dispatch_rx.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_run_handler_accepts_valid_credential() {
        // ARRANGE
        let mut fixture = fixture_with(FakePlatform::new(), 3);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, "test-key".parse().unwrap());

        // ACT
        let (status, Json(response)) = handle_start_run(
            Extension(fixture.controller.clone()),
            Extension(ApiKey("test-key".to_string())),
            headers,
            Some(Json(RunRequest {
                ids: Some("1,2,3,4".to_string()),
            })),
        )
        .await;

        // ASSERT
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(response.status, "accepted");
        assert!(response.run_id.is_some());
        assert_eq!(response.item_count, 4);
        assert_eq!(response.chunk_count, 2);

        let first = next_message(&mut fixture.dispatch_rx).await;
        assert_eq!(first.item_ids, ids(&["1", "2", "3"]));
    }
}
