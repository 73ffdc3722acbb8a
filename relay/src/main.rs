mod channel;
mod clock;
mod config;
mod dispatch;
mod errors;
mod liveness;
mod metrics;
mod model;
mod mqtt;
mod reconcile;
mod rest;
mod schedule;
mod session;
mod telemetry;
mod topics;

use axum::{routing::get, Router};
use channel::MqttPublisher;
use clock::SystemClock;
use config::Config;
use rest::AppState;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting office relay");
    info!("MQTT broker: {}:{}", config.mqtt_broker, config.mqtt_port);
    info!("HTTP server: {}", config.http_addr);

    if let Err(e) = metrics::init_metrics() {
        error!("Failed to register metrics: {}", e);
        std::process::exit(1);
    }

    let client_id = format!("{}-{}", config.mqtt_client_prefix, uuid::Uuid::new_v4());
    let (client, eventloop) = mqtt::connect(&config, client_id);

    let state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(MqttPublisher::new(client.clone())),
        config.credentials.clone(),
    );

    // Device reports flow MQTT task -> channel -> reconciler
    info!("Channel capacity: {}", config.channel_capacity);
    let (tx, rx) = mpsc::channel(config.channel_capacity);

    let mqtt_handle = tokio::spawn(async move {
        if let Err(e) = mqtt::run_mqtt(client, eventloop, tx).await {
            error!("MQTT task failed: {}", e);
        }
    });

    let controller = state.schedule.clone();
    let reconciler_handle = tokio::spawn(async move {
        schedule::run_reconciler(rx, controller).await;
    });

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(state));

    let listener = tokio::net::TcpListener::bind(config.http_addr)
        .await
        .unwrap_or_else(|e| {
            error!("Failed to bind to {}: {}", config.http_addr, e);
            std::process::exit(1);
        });

    info!("HTTP server listening on {}", config.http_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap_or_else(|e| {
            error!("HTTP server error: {}", e);
        });
    });

    tokio::select! {
        _ = mqtt_handle => {
            error!("MQTT task terminated");
        }
        _ = reconciler_handle => {
            error!("Reconciler task terminated");
        }
        _ = server_handle => {
            error!("HTTP server terminated");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Shutting down");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
