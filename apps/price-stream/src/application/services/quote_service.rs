//! Quote Service
//!
//! Synchronous price lookups for the REST facade. Each lookup generates a
//! fresh tick from the cached (or base) price and writes it back, so REST
//! callers and WebSocket subscribers walk the same price path.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::portfolio::{self, Holding, PortfolioPerformance};
use crate::domain::pricing::{
    Analysis, Candle, CandlePeriod, METAL_SYMBOLS, MarketStatus, PriceCache, PriceGenerator, Quote,
};
use crate::infrastructure::metrics::{self, TickSource};

/// On-demand quotes and history.
#[derive(Debug)]
pub struct QuoteService {
    generator: Arc<PriceGenerator>,
    cache: Arc<PriceCache>,
    market_status: MarketStatus,
}

impl QuoteService {
    /// Create a quote service.
    #[must_use]
    pub const fn new(
        generator: Arc<PriceGenerator>,
        cache: Arc<PriceCache>,
        market_status: MarketStatus,
    ) -> Self {
        Self {
            generator,
            cache,
            market_status,
        }
    }

    /// Configured market status.
    #[must_use]
    pub const fn market_status(&self) -> MarketStatus {
        self.market_status
    }

    /// One fresh quote per requested symbol, in request order.
    ///
    /// An empty request yields an empty list.
    pub fn current_prices(&self, symbols: &[String]) -> Vec<Quote> {
        let quotes: Vec<Quote> = symbols.iter().map(|symbol| self.next(symbol)).collect();

        if !quotes.is_empty() {
            metrics::record_ticks_generated(TickSource::Rest, quotes.len() as u64);
        }
        quotes
    }

    /// Fresh quotes for gold, silver, platinum and palladium.
    pub fn metal_prices(&self) -> Vec<Quote> {
        let symbols: Vec<String> = METAL_SYMBOLS.iter().map(ToString::to_string).collect();
        self.current_prices(&symbols)
    }

    /// Synthetic daily history ending on `today`.
    #[must_use]
    pub fn history(&self, symbol: &str, period: CandlePeriod, today: NaiveDate) -> Vec<Candle> {
        self.generator.generate_candles(symbol, period, today)
    }

    /// Trend, volatility and support/resistance over the last month.
    #[must_use]
    pub fn analysis(&self, symbol: &str, today: NaiveDate) -> Analysis {
        self.generator.analyze(symbol, today)
    }

    /// Value holdings at fresh prices, one generation per distinct symbol.
    pub fn portfolio_performance(
        &self,
        holdings: &[Holding],
        now: DateTime<Utc>,
    ) -> PortfolioPerformance {
        let mut symbols: Vec<String> = Vec::with_capacity(holdings.len());
        for holding in holdings {
            if !symbols.contains(&holding.symbol) {
                symbols.push(holding.symbol.clone());
            }
        }

        let prices: HashMap<_, _> = self
            .current_prices(&symbols)
            .into_iter()
            .map(|quote| (quote.tick.symbol, quote.tick.price))
            .collect();

        portfolio::evaluate(holdings, &prices, now)
    }

    fn next(&self, symbol: &str) -> Quote {
        let previous = self.cache.previous_price(symbol);
        let quote = self.generator.generate_quote(symbol, previous);
        self.cache.store(quote.tick.clone());
        quote
    }
}
