//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Connections**: live WebSocket clients
//! - **Subscriptions**: active (connection, symbol) pairs
//! - **Broadcast**: ticks generated, messages sent, delivery failures
//! - **Inbound**: malformed client frames
//! - **Latency**: broadcast cycle duration
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the service port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::subscription::SubscriptionStats;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Installs the global recorder together with its upkeep thread, which
/// drains histogram buckets between scrapes. Safe to call more than once;
/// later calls return the first handle. If a global recorder is already
/// installed by someone else, the returned handle renders an empty registry
/// and a warning is logged.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Prometheus recorder not installed");
                    PrometheusBuilder::new().build_recorder().handle()
                });

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_gauge!(
        "price_stream_connections",
        "Number of open WebSocket client connections"
    );
    describe_gauge!(
        "price_stream_subscriptions",
        "Number of active (connection, symbol) subscriptions"
    );
    describe_gauge!(
        "price_stream_active_symbols",
        "Number of symbols with at least one subscriber"
    );

    describe_counter!(
        "price_stream_ticks_generated_total",
        "Total price ticks generated"
    );
    describe_counter!(
        "price_stream_messages_sent_total",
        "Total messages queued to clients by type"
    );
    describe_counter!(
        "price_stream_delivery_failures_total",
        "Total failed deliveries by reason"
    );
    describe_counter!(
        "price_stream_malformed_messages_total",
        "Total malformed inbound client frames"
    );

    describe_histogram!(
        "price_stream_cycle_duration_seconds",
        "Time spent in one broadcast cycle"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Where a tick was generated.
#[derive(Debug, Clone, Copy)]
pub enum TickSource {
    /// Broadcast loop.
    Broadcast,
    /// REST request.
    Rest,
}

impl TickSource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Broadcast => "broadcast",
            Self::Rest => "rest",
        }
    }
}

/// Update the open connection count.
pub fn set_connections(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("price_stream_connections").set(count as f64);
}

/// Update subscription gauges from registry stats.
#[allow(clippy::cast_precision_loss)]
pub fn set_subscriptions(stats: SubscriptionStats) {
    gauge!("price_stream_subscriptions").set(stats.subscription_count as f64);
    gauge!("price_stream_active_symbols").set(stats.symbol_count as f64);
}

/// Record generated ticks.
pub fn record_ticks_generated(source: TickSource, count: u64) {
    counter!(
        "price_stream_ticks_generated_total",
        "source" => source.as_str()
    )
    .increment(count);
}

/// Record messages queued to clients.
pub fn record_messages_sent(msg_type: &'static str, count: u64) {
    counter!(
        "price_stream_messages_sent_total",
        "message_type" => msg_type
    )
    .increment(count);
}

/// Record a failed delivery.
pub fn record_delivery_failure(reason: &'static str) {
    counter!(
        "price_stream_delivery_failures_total",
        "reason" => reason
    )
    .increment(1);
}

/// Record a malformed inbound frame.
pub fn record_malformed_message() {
    counter!("price_stream_malformed_messages_total").increment(1);
}

/// Record broadcast cycle duration.
pub fn record_cycle_duration(duration: Duration) {
    histogram!("price_stream_cycle_duration_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================
