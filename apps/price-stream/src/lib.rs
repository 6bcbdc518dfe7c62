#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::cast_possible_truncation
    )
)]

//! Price Stream - Mock Real-Time Price Broadcaster
//!
//! Generates synthetic price ticks for a fixed symbol table and pushes them
//! to WebSocket subscribers on a fixed interval, with a small REST facade
//! over the same generator.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: pricing and subscription state
//!   - `pricing`: tick generation, last-tick cache, quotes, candles,
//!     trend analysis, market status
//!   - `subscription`: symbol ↔ connection registry
//!   - `connection`: per-connection lifecycle state machine
//!   - `portfolio`: holding valuation
//!   - `news`: canned market headlines with impact scoring
//!
//! - **Application**: use cases and port definitions
//!   - `ports`: outbound delivery to a connection
//!   - `services`: broadcast loop, quote lookups
//!
//! - **Infrastructure**: adapters and ambient services
//!   - `protocol`: JSON wire messages and codec
//!   - `gateway`: WebSocket sessions, outbound queues, heartbeat
//!   - `http`: REST routes and server
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//!                 ┌────────────┐  tick   ┌────────────┐
//!  timer ────────►│ Broadcaster│────────►│ PriceCache │
//!                 └─────┬──────┘         └─────▲──────┘
//!                       │ subscribers_of       │ replay / lookups
//!                 ┌─────▼──────┐         ┌─────┴──────┐
//!                 │  Registry  │◄────────│  Gateway   │◄──── WebSocket clients
//!                 └─────┬──────┘         └────────────┘
//!                       │ deliver (send deadline)
//!                 ┌─────▼──────┐
//!                 │ Conn Table │────► per-connection writer ────► clients
//!                 └────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - pricing and subscription state with no I/O.
pub mod domain;

/// Application layer - use cases and port definitions.
pub mod application;

/// Infrastructure layer - adapters and ambient services.
pub mod infrastructure;

/// Component wiring.
pub mod app;

// =============================================================================
// Re-exports
// =============================================================================

pub use app::PriceStream;

// Domain types
pub use domain::connection::{ConnectionState, Lifecycle};
pub use domain::news::{Impact, NewsItem};
pub use domain::portfolio::{Holding, HoldingPerformance, PortfolioPerformance, PortfolioSummary};
pub use domain::pricing::{
    Analysis, Candle, CandlePeriod, GeneratorConfig, MarketStatus, PriceCache, PriceGenerator,
    PriceTick, Quote, Symbol, Trend,
};
pub use domain::subscription::{
    ConnectionId, SubscriptionChanges, SubscriptionLimitExceeded, SubscriptionRegistry,
    SubscriptionStats,
};

// Application
pub use application::ports::{DeliveryError, MessageSink};
pub use application::services::{Broadcaster, CycleReport, QuoteService};

// Infrastructure config
pub use infrastructure::config::{
    BroadcastSettings, CacheSettings, ConfigError, GatewaySettings, GeneratorSettings,
    ServerSettings, ServiceConfig,
};

// Protocol
pub use infrastructure::protocol::{ClientMessage, CodecError, JsonCodec, ServerMessage};

// HTTP
pub use infrastructure::http::{AppState, HttpServer, ServerError, create_router};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
