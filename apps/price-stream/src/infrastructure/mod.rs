//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete transports and ambient services around the application layer.

/// JSON wire protocol for WebSocket clients.
pub mod protocol;

/// WebSocket connection gateway and outbound delivery.
pub mod gateway;

/// REST facade and HTTP server.
pub mod http;

/// Configuration loading.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing and OpenTelemetry integration.
pub mod telemetry;
