use axum::{
    Router,
    extract::Extension,
    routing::post,
};
use hydra::bus::{Topic, spawn_consumer};
use hydra::config::Config;
use hydra::controller::handlers::{ApiKey, handle_start_run};
use hydra::controller::service::Controller;
use hydra::dispatch::registry::WorkerRegistry;
use hydra::dispatch::service::Dispatcher;
use hydra::dispatch::transport::{ChannelWorkSender, HttpWorkSender, WorkSender};
use hydra::dispatch::types::DispatchMessage;
use hydra::fleet::platform::{InProcessPlatform, ProcessPlatform, WorkerPlatform};
use hydra::fleet::topology::RegionTopology;
use hydra::fleet::types::{Region, WorkerEndpoint};
use hydra::receiver::handlers::{handle_internal_failure, handle_internal_success};
use hydra::receiver::service::Receiver;
use hydra::warehouse::memory::MemoryWarehouse;
use hydra::warehouse::sink::WarehouseSink;
use hydra::worker::handlers::handle_work;
use hydra::worker::publish::{HttpResultPublisher, TopicPublisher};
use hydra::worker::service::Worker;
use hydra::worker::types::{FailureReport, SuccessResult};
use hydra::worker::upstream::HttpPriceSource;
use std::net::SocketAddr;
use std::sync::Arc;

const DEFAULT_REGIONS: [&str; 4] = ["us-east", "us-west", "eu-west", "ap-south"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut role = "coordinator".to_string();
    let mut bind = "127.0.0.1:9000".to_string();
    let mut region = "us-east".to_string();
    let mut controller_url: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--role" => {
                role = args[i + 1].clone();
                i += 2;
            }
            "--bind" => {
                bind = args[i + 1].clone();
                i += 2;
            }
            "--region" => {
                region = args[i + 1].clone();
                i += 2;
            }
            "--controller" => {
                controller_url = Some(args[i + 1].clone());
                i += 2;
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: {} [--role coordinator|worker|local] [--bind addr:port]",
                    args[0]
                );
                eprintln!("       worker role also takes --region <name> --controller <url>");
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    let config = Config::from_env();

    match role.as_str() {
        "worker" => run_worker(&config, &bind, &region, controller_url).await,
        "local" => run_coordinator(&config, &bind, true).await,
        _ => run_coordinator(&config, &bind, false).await,
    }
}

/// Runs the coordinator: controller entry point, dispatcher, receiver, and
/// the worker platform. With `in_process` the fleet runs as local tasks
/// instead of child processes (single-process dev mode).
async fn run_coordinator(config: &Config, bind: &str, in_process: bool) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = bind.parse()?;
    tracing::info!("Starting coordinator on {}", bind_addr);

    // 1. Bus topics, one per stage:
    let (dispatch_topic, dispatch_rx) = Topic::<DispatchMessage>::channel("dispatch");
    let (success_topic, success_rx) = Topic::<Vec<SuccessResult>>::channel("success");
    let (failure_topic, failure_rx) = Topic::<FailureReport>::channel("failure");

    // 2. Warehouse, registry, dispatcher:
    let warehouse = Arc::new(MemoryWarehouse::new());
    let registry = Arc::new(WorkerRegistry::new());
    let topology = Arc::new(RegionTopology::ring(&DEFAULT_REGIONS));

    let channel_sender = Arc::new(ChannelWorkSender::new());
    let sender: Arc<dyn WorkSender> = if in_process {
        channel_sender.clone()
    } else {
        Arc::new(HttpWorkSender::new())
    };

    let dispatcher = Dispatcher::new(registry.clone(), sender, dispatch_topic.clone(), config);

    // 3. Worker platform:
    let platform: Arc<dyn WorkerPlatform> = if in_process {
        let source = Arc::new(HttpPriceSource::new(&config.api_url));
        let publisher = Arc::new(TopicPublisher::new(
            success_topic.clone(),
            failure_topic.clone(),
        ));
        Arc::new(InProcessPlatform::new(channel_sender, source, publisher))
    } else {
        let coordinator_url = format!("http://{}", bind_addr);
        Arc::new(ProcessPlatform::new(
            &bind_addr.ip().to_string(),
            bind_addr.port() + 100,
            &coordinator_url,
        )?)
    };

    // 4. Controller and receiver:
    let controller_warehouse: Arc<dyn WarehouseSink> = warehouse.clone();
    let receiver_warehouse: Arc<dyn WarehouseSink> = warehouse.clone();
    let controller = Controller::new(
        controller_warehouse,
        dispatch_topic.clone(),
        topology.clone(),
        platform.clone(),
        dispatcher.clone(),
        config.chunk_size,
    );
    let receiver = Receiver::new(
        receiver_warehouse,
        dispatch_topic.clone(),
        controller.clone(),
    );

    // 5. Initial fleet, one worker per region:
    for region in topology.regions() {
        match platform.spawn(&region).await {
            Ok(endpoint) => dispatcher.register_worker(endpoint, region),
            Err(e) => tracing::error!("Initial spawn in region {} failed: {}", region, e),
        }
    }

    // 6. Stage consumers:
    {
        let dispatcher = dispatcher.clone();
        spawn_consumer(dispatch_rx, dispatch_topic.clone(), move |message| {
            let dispatcher = dispatcher.clone();
            async move { dispatcher.on_dispatch(message).await }
        });
    }
    {
        let receiver = receiver.clone();
        spawn_consumer(success_rx, success_topic.clone(), move |results| {
            let receiver = receiver.clone();
            async move { receiver.on_success(results).await }
        });
    }
    {
        let receiver = receiver.clone();
        spawn_consumer(failure_rx, failure_topic.clone(), move |report| {
            let receiver = receiver.clone();
            async move { receiver.on_failure(report).await }
        });
    }

    // 7. Stats reporter:
    {
        let registry = registry.clone();
        let warehouse = warehouse.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(10));
            loop {
                interval.tick().await;
                tracing::info!(
                    "Fleet stats: {} registered worker(s), {} active, {} warehouse row(s)",
                    registry.len(),
                    registry.active_endpoints().len(),
                    warehouse.row_count()
                );
            }
        });
    }

    // 8. HTTP surface:
    let app = Router::new()
        .route("/run", post(handle_start_run))
        .route("/internal/success", post(handle_internal_success))
        .route("/internal/failure", post(handle_internal_failure))
        .layer(Extension(controller))
        .layer(Extension(ApiKey(config.api_key.clone())))
        .layer(Extension(success_topic))
        .layer(Extension(failure_topic));

    tracing::info!("Coordinator listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Runs one worker process: a single `/work` endpoint in front of the
/// sequential batch machine, publishing outcomes back to the coordinator.
async fn run_worker(
    config: &Config,
    bind: &str,
    region: &str,
    controller_url: Option<String>,
) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = bind.parse()?;
    let coordinator_url = controller_url.unwrap_or_else(|| config.coordinator_url.clone());

    tracing::info!(
        "Starting worker on {} in region {} (coordinator {})",
        bind_addr,
        region,
        coordinator_url
    );

    let worker = Arc::new(Worker::new(
        WorkerEndpoint(bind.to_string()),
        Region::new(region),
        Arc::new(HttpPriceSource::new(&config.api_url)),
        Arc::new(HttpResultPublisher::new(&coordinator_url)),
    ));

    let app = Router::new()
        .route("/work", post(handle_work))
        .layer(Extension(worker));

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
