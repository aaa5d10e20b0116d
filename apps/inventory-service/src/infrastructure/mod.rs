//! Infrastructure Layer - Adapters and external integrations.

/// Environment configuration.
pub mod config;

/// gRPC server implementation.
pub mod grpc;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Logging and OpenTelemetry tracing.
pub mod telemetry;
