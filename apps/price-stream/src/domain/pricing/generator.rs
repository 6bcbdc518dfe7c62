//! Random-walk price generator.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use super::{
    Analysis, Candle, CandlePeriod, PriceTick, Quote, analyze, base_price, generate_candles,
};

/// Number of recent closes the analysis looks at.
const ANALYSIS_WINDOW: usize = 30;

/// Lower bound of the simulated volume range.
const MIN_VOLUME: u64 = 1_000_000;

/// Upper bound (exclusive) of the simulated volume range.
const MAX_VOLUME: u64 = 11_000_000;

/// Tuning for the random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    /// Maximum relative move per tick (0.02 = ±2%).
    pub volatility: f64,
    /// Price never goes below this value.
    pub price_floor: Decimal,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            volatility: 0.02,
            price_floor: Decimal::ONE,
        }
    }
}

/// Produces synthetic ticks from the previous price of a symbol.
///
/// The random source sits behind a mutex so the generator can be shared
/// between the broadcast loop and request handlers.
///
/// # Example
///
/// ```rust
/// use price_stream::domain::pricing::{GeneratorConfig, PriceGenerator};
/// use rust_decimal::Decimal;
///
/// let generator = PriceGenerator::seeded(GeneratorConfig::default(), 7);
/// let tick = generator.generate_tick("AAPL", Decimal::from(150));
///
/// assert_eq!(tick.symbol, "AAPL");
/// assert!(tick.price > Decimal::ZERO);
/// ```
#[derive(Debug)]
pub struct PriceGenerator {
    config: GeneratorConfig,
    rng: Mutex<StdRng>,
}

impl Default for PriceGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl PriceGenerator {
    /// Create a generator seeded from the operating system.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Create a generator with a fixed seed (reproducible sequences).
    #[must_use]
    pub fn seeded(config: GeneratorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generate the next tick for `symbol` given the last emitted price.
    pub fn generate_tick(&self, symbol: &str, previous_price: Decimal) -> PriceTick {
        let mut rng = self.rng.lock();
        next_tick(symbol, previous_price, &self.config, &mut *rng)
    }

    /// Generate the next tick plus the session range around it.
    pub fn generate_quote(&self, symbol: &str, previous_price: Decimal) -> Quote {
        let mut rng = self.rng.lock();
        let tick = next_tick(symbol, previous_price, &self.config, &mut *rng);
        Quote::around(tick, previous_price, &mut *rng)
    }

    /// Trend and volatility over the last month of generated closes.
    pub fn analyze(&self, symbol: &str, today: NaiveDate) -> Analysis {
        let mut rng = self.rng.lock();
        let candles =
            generate_candles(base_price(symbol), CandlePeriod::OneMonth, today, &mut *rng);
        let closes: Vec<Decimal> = candles
            .iter()
            .rev()
            .take(ANALYSIS_WINDOW)
            .rev()
            .map(|candle| candle.close)
            .collect();
        analyze(symbol, &closes, &mut *rng)
    }

    /// Generate daily candles for `symbol` around its base price.
    pub fn generate_candles(
        &self,
        symbol: &str,
        period: CandlePeriod,
        today: NaiveDate,
    ) -> Vec<Candle> {
        let mut rng = self.rng.lock();
        generate_candles(base_price(symbol), period, today, &mut *rng)
    }
}

/// Apply one bounded relative perturbation to `previous_price`.
///
/// `new = max(previous * (1 + U), floor)` with `U` uniform in
/// `[-volatility, volatility]`. `change` is always measured against
/// `previous_price` itself, even when the floor lifted the new price; a zero
/// previous price reports a zero percentage.
pub fn next_tick<R: Rng + ?Sized>(
    symbol: &str,
    previous_price: Decimal,
    config: &GeneratorConfig,
    rng: &mut R,
) -> PriceTick {
    let volatility = config.volatility.abs();
    let perturbation = rng.random_range(-volatility..=volatility);
    let factor = Decimal::ONE + Decimal::try_from(perturbation).unwrap_or_default();

    let price = (previous_price * factor).max(config.price_floor).round_dp(2);
    let change = price - previous_price;
    let change_percent = if previous_price.is_zero() {
        Decimal::ZERO
    } else {
        (change / previous_price * Decimal::ONE_HUNDRED).round_dp(2)
    };

    PriceTick {
        symbol: symbol.to_string(),
        price,
        change: change.round_dp(2),
        change_percent,
        volume: rng.random_range(MIN_VOLUME..MAX_VOLUME),
        timestamp: Utc::now(),
    }
}
