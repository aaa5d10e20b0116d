//! Infrastructure Layer - Adapters and external integrations.

/// Environment configuration.
pub mod config;

/// gRPC server implementation and generated stubs.
pub mod grpc;

/// Health check HTTP endpoint.
pub mod health;

/// gRPC adapter for the inventory port.
pub mod inventory_client;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
