//! REST quote type.

use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;

use super::PriceTick;

/// Widest distance of the session high/low from the quoted price (2%).
const RANGE_SPREAD: f64 = 0.02;

/// A tick plus the session range REST clients expect.
///
/// `open` and `previousClose` are the price the tick moved away from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// The generated tick.
    #[serde(flatten)]
    pub tick: PriceTick,
    /// Session high, at or above the price.
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    /// Session low, at or below the price.
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    /// Session open.
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    /// Previous close.
    #[serde(with = "rust_decimal::serde::float")]
    pub previous_close: Decimal,
}

impl Quote {
    /// Draw a session range around `tick`.
    pub fn around<R: Rng + ?Sized>(tick: PriceTick, previous_price: Decimal, rng: &mut R) -> Self {
        let up = Decimal::try_from(rng.random_range(0.0..=RANGE_SPREAD)).unwrap_or_default();
        let down = Decimal::try_from(rng.random_range(0.0..=RANGE_SPREAD)).unwrap_or_default();

        let high = (tick.price * (Decimal::ONE + up)).round_dp(2).max(tick.price);
        let low = (tick.price * (Decimal::ONE - down)).round_dp(2).min(tick.price);
        let previous = previous_price.round_dp(2);

        Self {
            tick,
            high,
            low,
            open: previous,
            previous_close: previous,
        }
    }
}
