//! Frigate review stitcher
//!
//! Groups Frigate object detections into profile-based reviews and publishes
//! their `new`/`update`/`end` lifecycle.
//!
//! Module structure:
//! - `domain/` - Detections, profiles, reviews
//! - `io/` - External interfaces (MQTT in/out, JSONL egress, Frigate API, Prometheus)
//! - `services/` - Correlation engine and its parts
//! - `infra/` - Infrastructure (Config, Metrics)

use anyhow::Context;
use clap::Parser;
use review_stitcher::infra::{Config, EgressMode, LogFormat, Metrics};
use review_stitcher::io::frigate::replay_snapshot;
use review_stitcher::io::{FrigateClient, JsonlPublisher, MqttReviewPublisher, ReviewPublisher};
use review_stitcher::services::{create_ingest_channel, Engine};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Frigate review stitcher - correlates detections into reviews
#[derive(Parser, Debug)]
#[command(name = "review-stitcher", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Do not replay in-progress detections from the Frigate API at startup
    #[arg(long)]
    skip_snapshot: bool,
}

fn init_logging(config: &Config) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    match config.log_format() {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments using clap
    let args = Args::parse();

    // Load configuration from TOML file (needed for log level)
    let config = Config::from_file(&args.config).context("configuration")?;

    init_logging(&config);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        "review-stitcher starting"
    );

    // Log configuration
    let egress_mode_str = match config.egress_mode() {
        EgressMode::Mqtt => "mqtt",
        EgressMode::Jsonl => "jsonl",
    };
    let profile_names: Vec<&str> = config.profiles().iter().map(|p| p.name.as_str()).collect();
    info!(
        config_file = %config.config_file(),
        mqtt_host = %config.mqtt_host(),
        mqtt_port = %config.mqtt_port(),
        events_topic = %config.mqtt_events_topic(),
        reviews_topic = %config.mqtt_reviews_topic(),
        egress_mode = %egress_mode_str,
        publish_updates = %config.publish_updates(),
        ghost_timeout_secs = %config.ghost_timeout_secs(),
        profiles = ?profile_names,
        prometheus_port = %config.prometheus_port(),
        "config_loaded"
    );
    if config.profiles().is_empty() {
        warn!("no_profiles_configured");
    }

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics = Arc::new(Metrics::new());

    // Start Prometheus metrics HTTP server (if port > 0)
    let prometheus_port = config.prometheus_port();
    if prometheus_port > 0 {
        let prom_metrics = metrics.clone();
        let prom_instance = config.mqtt_client_id().to_string();
        let prom_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = review_stitcher::io::prometheus::start_metrics_server(
                prometheus_port,
                prom_metrics,
                prom_instance,
                prom_shutdown,
            )
            .await
            {
                error!(error = %e, "Prometheus metrics server error");
            }
        });
    }

    // Start metrics reporter
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs().max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Select the review publisher
    let publisher: Box<dyn ReviewPublisher> = match config.egress_mode() {
        EgressMode::Mqtt => Box::new(MqttReviewPublisher::new(&config)),
        EgressMode::Jsonl => Box::new(JsonlPublisher::new(config.egress_file())),
    };

    // Ingest queue (bounded; producers wait when full)
    let (event_tx, event_rx) = create_ingest_channel();

    // Snapshot replay, then the live subscription, on one producer task so the
    // engine is already draining the queue while the snapshot is fed in
    let ingest_config = config.clone();
    let ingest_metrics = metrics.clone();
    let ingest_shutdown = shutdown_rx.clone();
    let skip_snapshot = args.skip_snapshot;
    tokio::spawn(async move {
        match ingest_config.frigate_url() {
            Some(url) if !skip_snapshot => {
                let timeout = Duration::from_millis(ingest_config.frigate_timeout_ms());
                match FrigateClient::new(url, timeout) {
                    Ok(client) => {
                        replay_snapshot(&client, &event_tx, &ingest_metrics).await;
                    }
                    Err(e) => warn!(error = %e, "snapshot_failed"),
                }
            }
            _ => info!("snapshot_skipped"),
        }

        if let Err(e) = review_stitcher::io::mqtt::start_mqtt_client(
            &ingest_config,
            event_tx,
            ingest_metrics,
            ingest_shutdown,
        )
        .await
        {
            error!(error = %e, "MQTT client error");
        }
    });

    // Handle shutdown on Ctrl+C
    let shutdown_signal = shutdown_tx;
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_signal.send(true);
    });

    // Run engine - consumes detections until the subscriber stops
    let mut engine = Engine::from_config(&config, publisher, metrics);
    engine.run(event_rx).await;

    info!("review-stitcher shutdown complete");
    Ok(())
}
