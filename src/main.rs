//! Weather Bridge - Main Entry Point
//!
//! Moves weather observations from RabbitMQ to the ingestion API.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use weather_bridge::messaging::{ConnectionManager, ConsumptionLoop};
use weather_bridge::output::DeliveryClient;
use weather_bridge::processing::{Normalizer, WeatherPipeline};
use weather_bridge::types::{BridgeConfig, LogFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = BridgeConfig::from_env().context("failed to load configuration")?;

    init_tracing(config.log_format);

    info!("Starting Weather Bridge v{}", env!("CARGO_PKG_VERSION"));
    info!(
        queue = %config.queue.queue_name,
        max_attempts = config.delivery.max_attempts,
        "Configuration loaded"
    );
    if config.worker_concurrency > 1 {
        warn!(
            worker_concurrency = config.worker_concurrency,
            "WORKER_CONCURRENCY is ignored; messages are processed one at a time"
        );
    }

    // Initialize components
    let delivery = DeliveryClient::new(&config.delivery).context("failed to build HTTP client")?;
    info!(endpoint = %delivery.endpoint(), "Delivery client ready");
    let normalizer = Normalizer::new(config.normalizer.clone());
    let pipeline = WeatherPipeline::new(normalizer, delivery);

    let source = ConnectionManager::new(config.queue.clone())
        .open()
        .await
        .context("failed to start consuming")?;

    let shutdown = CancellationToken::new();
    spawn_signal_handlers(shutdown.clone());

    let stats = ConsumptionLoop::new(source, pipeline)
        .run(shutdown)
        .await
        .context("consumer stopped")?;

    info!(
        received = stats.received,
        acked = stats.acked,
        rejected = stats.rejected,
        settle_failures = stats.settle_failures,
        "Weather Bridge stopped"
    );
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "weather_bridge=info".into()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Cancel `token` on Ctrl-C or SIGTERM.
fn spawn_signal_handlers(token: CancellationToken) {
    let interrupt_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt signal");
                interrupt_token.cancel();
            }
            Err(err) => error!("Error setting up signal handler: {}", err),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => error!("Error setting up SIGTERM handler: {}", err),
        }
    });
}
