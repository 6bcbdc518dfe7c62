//! Pricing Types
//!
//! Core domain types for synthetic market data: price ticks, the static
//! base-price table, the random-walk generator, the last-tick cache,
//! market status, REST quotes, generated daily candles and trend analysis.
//!
//! # Design
//!
//! Every tick is derived from the previously emitted price for its symbol
//! (or the base price when none exists yet), so a symbol's price drifts as
//! a bounded random walk rather than jumping around its base.

mod analysis;
mod cache;
mod candle;
mod generator;
mod market;
mod quote;
mod tick;

pub use analysis::{Analysis, Trend, analyze, trend, volatility};
pub use cache::{DEFAULT_CACHE_CAPACITY, PriceCache};
pub use candle::{Candle, CandlePeriod, generate_candles};
pub use generator::{GeneratorConfig, PriceGenerator, next_tick};
pub use market::MarketStatus;
pub use quote::Quote;
pub use tick::PriceTick;

use rust_decimal::Decimal;

/// A symbol string (stock ticker or metal code such as `XAU`).
pub type Symbol = String;

/// Base price used for symbols missing from the table.
pub const FALLBACK_BASE_PRICE: Decimal = Decimal::ONE_HUNDRED;

/// Precious metal symbols served by the gold endpoints.
pub const METAL_SYMBOLS: &[&str] = &["XAU", "XAG", "XPT", "XPD"];

/// Static base prices the random walk starts from.
///
/// Stocks are quoted in USD, metals in INR (gold per 10g, silver per kg,
/// platinum and palladium per oz).
const BASE_PRICES: &[(&str, i64)] = &[
    ("AAPL", 150),
    ("GOOGL", 2_800),
    ("MSFT", 350),
    ("AMZN", 3_200),
    ("TSLA", 250),
    ("NVDA", 450),
    ("META", 300),
    ("NFLX", 400),
    ("AMD", 120),
    ("INTC", 50),
    ("CRM", 200),
    ("ORCL", 100),
    ("ADBE", 500),
    ("PYPL", 80),
    ("UBER", 40),
    ("XAU", 68_500),
    ("XAG", 825_000),
    ("XPT", 7_034_625),
    ("XPD", 1_236_430),
];

/// Look up the base price for a symbol, falling back to 100.00.
#[must_use]
pub fn base_price(symbol: &str) -> Decimal {
    BASE_PRICES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map_or(FALLBACK_BASE_PRICE, |(_, price)| Decimal::from(*price))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_symbols_use_table_price() {
        assert_eq!(base_price("AAPL"), Decimal::from(150));
        assert_eq!(base_price("XAU"), Decimal::from(68_500));
        assert_eq!(base_price("UBER"), Decimal::from(40));
    }

    #[test]
    fn unknown_symbol_falls_back() {
        assert_eq!(base_price("ZZZZ"), Decimal::new(10_000, 2));
    }

    #[test]
    fn metals_are_in_table() {
        for symbol in METAL_SYMBOLS {
            assert!(
                BASE_PRICES.iter().any(|(s, _)| s == symbol),
                "{symbol} missing from base table"
            );
        }
    }
}
