//! Order Service Binary
//!
//! # Usage
//!
//! ```bash
//! INVENTORY_SERVICE_URL=http://localhost:50051 cargo run --bin order-service
//! ```
//!
//! # Environment Variables
//!
//! - `INVENTORY_SERVICE_URL`: inventory gRPC endpoint (required)
//! - `ORDER_GRPC_PORT`: gRPC server port (default: 50052)
//! - `ORDER_HEALTH_PORT`: health and metrics HTTP port (default: 8082)
//! - `ORDER_INVENTORY_TIMEOUT_MS`: per-call inventory timeout (default: 5000)
//! - `ORDER_STREAM_BUFFER`: per-stream channel capacity (default: 128)
//! - `OTEL_ENABLED`: export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: service name (default: stockroom-order-service)
//! - `RUST_LOG`: extra log filter directives

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use order_service::infrastructure::health::{HealthServer, HealthServerState};
use order_service::infrastructure::telemetry;
use order_service::{
    GrpcInventoryClient, OrderConfig, OrderOrchestrator, OrderServer, OrderSessionStore,
    init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting order service");

    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = OrderConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let inventory = GrpcInventoryClient::connect_lazy(&config.inventory_url, config.inventory_timeout)
        .with_context(|| format!("invalid inventory endpoint {}", config.inventory_url))?;
    let sessions = Arc::new(OrderSessionStore::new());
    let orchestrator = Arc::new(OrderOrchestrator::new(
        Arc::new(inventory),
        Arc::clone(&sessions),
    ));

    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        config.inventory_url.clone(),
        sessions,
    ));
    let health_server = HealthServer::new(config.health_port, health_state, shutdown_token.clone());

    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    let grpc_server = OrderServer::new(orchestrator, config.stream_buffer, shutdown_token.clone());
    let grpc_addr = SocketAddr::from(([0, 0, 0, 0], config.grpc_port));
    let grpc_shutdown = shutdown_token.clone();

    let grpc_task = tokio::spawn(async move {
        tracing::info!(addr = %grpc_addr, "gRPC server listening");
        if let Err(e) = Server::builder()
            .add_service(grpc_server.into_service())
            .serve_with_shutdown(grpc_addr, grpc_shutdown.cancelled())
            .await
        {
            tracing::error!(error = %e, "gRPC server error");
        }
        tracing::info!("gRPC server stopped");
    });

    tracing::info!("Order service ready");

    await_shutdown(shutdown_token).await;

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, grpc_task).await.is_err() {
        tracing::warn!("gRPC server did not drain before the shutdown timeout");
    }

    tracing::info!("Order service stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &OrderConfig) {
    tracing::info!(
        grpc_port = config.grpc_port,
        health_port = config.health_port,
        inventory_url = %config.inventory_url,
        inventory_timeout_ms = config.inventory_timeout.as_millis(),
        stream_buffer = config.stream_buffer,
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
