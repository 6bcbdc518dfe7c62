//! Wire Message Types
//!
//! Every frame is a JSON object with a `type` discriminator.
//!
//! # Inbound (client → server)
//! - `subscribe`: `{"type":"subscribe","symbol":"AAPL"}`
//! - `unsubscribe`: `{"type":"unsubscribe","symbol":"AAPL"}`
//! - `ping`: `{"type":"ping"}`
//!
//! # Outbound (server → client)
//! - `price_update`: a flattened [`PriceTick`]
//! - `pong`
//! - `market_status`: `{"type":"market_status","status":"open"}`
//! - `error`: `{"type":"error","reason":"..."}`

use serde::{Deserialize, Serialize};

use crate::domain::pricing::{MarketStatus, PriceTick, Symbol};

/// Control message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving ticks for a symbol.
    Subscribe {
        /// Requested symbol.
        symbol: Symbol,
    },
    /// Stop receiving ticks for a symbol.
    Unsubscribe {
        /// Symbol to drop.
        symbol: Symbol,
    },
    /// Application-level keepalive.
    Ping,
}

/// Event sent to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// New tick for a subscribed symbol.
    PriceUpdate(PriceTick),
    /// Reply to `ping`.
    Pong,
    /// Current market status.
    MarketStatus {
        /// Open or closed.
        status: MarketStatus,
    },
    /// Rejected inbound frame.
    Error {
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl ServerMessage {
    /// Build an error frame.
    #[must_use]
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }

    /// Discriminator as it appears on the wire.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PriceUpdate(_) => "price_update",
            Self::Pong => "pong",
            Self::MarketStatus { .. } => "market_status",
            Self::Error { .. } => "error",
        }
    }
}

impl From<PriceTick> for ServerMessage {
    fn from(tick: PriceTick) -> Self {
        Self::PriceUpdate(tick)
    }
}
