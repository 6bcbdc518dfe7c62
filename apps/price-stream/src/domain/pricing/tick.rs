//! Price tick type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Symbol;

/// A single simulated price observation.
///
/// Immutable once created. Decimal fields are rounded to two places and
/// serialize as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTick {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// New price.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Absolute change from the previous price.
    #[serde(with = "rust_decimal::serde::float")]
    pub change: Decimal,
    /// Change relative to the previous price, in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub change_percent: Decimal,
    /// Simulated traded volume.
    pub volume: u64,
    /// Generation time.
    pub timestamp: DateTime<Utc>,
}

impl PriceTick {
    /// Price the tick moved away from.
    #[must_use]
    pub fn previous_price(&self) -> Decimal {
        self.price - self.change
    }
}
