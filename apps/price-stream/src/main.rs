//! Price Stream Binary
//!
//! Starts the mock real-time price broadcaster.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin price-stream
//! ```
//!
//! # Environment Variables
//!
//! - `PORT`: HTTP/WebSocket port (default: 5001)
//! - `PRICE_STREAM_BROADCAST_INTERVAL_MS`: broadcast period (default: 5000)
//! - `PRICE_STREAM_SEND_TIMEOUT_MS`: per-send deadline (default: 2000)
//! - `PRICE_STREAM_OUTBOUND_CAPACITY`: per-connection queue size (default: 256)
//! - `PRICE_STREAM_HEARTBEAT_INTERVAL_SECS`: ping interval (default: 30)
//! - `PRICE_STREAM_HEARTBEAT_TIMEOUT_SECS`: dead-client timeout (default: 90)
//! - `PRICE_STREAM_VOLATILITY`: max relative move per tick (default: 0.02)
//! - `PRICE_STREAM_PRICE_FLOOR`: lowest price (default: 1.00)
//! - `MARKET_STATUS`: open | closed (default: open)
//! - `PRICE_STREAM_MAX_SYMBOLS_PER_REQUEST`: REST request symbol cap (default: 100)
//! - `PRICE_STREAM_MAX_SUBSCRIPTIONS_PER_CONNECTION`: per-client symbol cap (default: 50)
//! - `PRICE_STREAM_CACHE_CAPACITY`: latest-price cache size (default: 1024)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: finpilot-price-stream)
//! - `RUST_LOG`: Log level (default: info)

use std::time::Duration;

use price_stream::infrastructure::telemetry;
use price_stream::{PriceStream, ServiceConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting price stream");

    let _metrics_handle = init_metrics();

    let config = ServiceConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let service = PriceStream::new(config);
    let mut server = tokio::spawn(service.run(shutdown_token.clone()));

    tokio::select! {
        result = &mut server => {
            // Server exited on its own (bind failure or fatal error).
            result??;
            return Ok(());
        }
        () = await_shutdown(shutdown_token) => {}
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timed out"
        ),
    }

    tracing::info!("Price stream stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &ServiceConfig) {
    tracing::info!(
        port = config.server.port,
        broadcast_interval_ms = u64::try_from(config.broadcast.interval.as_millis()).unwrap_or(u64::MAX),
        send_timeout_ms = u64::try_from(config.broadcast.send_timeout.as_millis()).unwrap_or(u64::MAX),
        market_status = config.gateway.market_status.as_str(),
        "Configuration loaded"
    );
    tracing::debug!(
        outbound_capacity = config.gateway.outbound_capacity,
        heartbeat_interval_secs = config.gateway.heartbeat_interval.as_secs(),
        heartbeat_timeout_secs = config.gateway.heartbeat_timeout.as_secs(),
        volatility = config.generator.volatility,
        price_floor = %config.generator.price_floor,
        "Gateway and generator settings"
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
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
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
}
