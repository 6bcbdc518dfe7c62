//! Synthetic daily candles.

use chrono::{Days, NaiveDate};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Look-back period for generated history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandlePeriod {
    /// One day.
    OneDay,
    /// One week.
    OneWeek,
    /// One month.
    OneMonth,
    /// Three months.
    ThreeMonths,
    /// Six months.
    SixMonths,
    /// One year.
    #[default]
    OneYear,
}

impl CandlePeriod {
    /// Parse a period code (`1D`, `1W`, `1M`, `3M`, `6M`, `1Y`).
    ///
    /// Unrecognised codes resolve to one year.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "1D" => Self::OneDay,
            "1W" => Self::OneWeek,
            "1M" => Self::OneMonth,
            "3M" => Self::ThreeMonths,
            "6M" => Self::SixMonths,
            _ => Self::OneYear,
        }
    }

    /// Canonical period code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::OneDay => "1D",
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
        }
    }

    /// Number of days covered by the period.
    #[must_use]
    pub const fn days(self) -> u64 {
        match self {
            Self::OneDay => 1,
            Self::OneWeek => 7,
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::SixMonths => 180,
            Self::OneYear => 365,
        }
    }
}

/// One generated OHLCV bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Trading day.
    pub date: NaiveDate,
    /// Opening price.
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    /// Session high.
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    /// Session low.
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    /// Closing price.
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
    /// Simulated volume.
    pub volume: u64,
}

/// Generate one candle per day from `today - period.days()` to `today`.
///
/// Each day opens within ±1% of the base price and closes within ±0.5% of
/// its open; high and low wrap the body by up to 0.5%.
pub fn generate_candles<R: Rng + ?Sized>(
    base: Decimal,
    period: CandlePeriod,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<Candle> {
    let days = period.days();
    let mut candles = Vec::with_capacity(usize::try_from(days + 1).unwrap_or_default());

    for offset in (0..=days).rev() {
        let Some(date) = today.checked_sub_days(Days::new(offset)) else {
            continue;
        };

        let open = base * (Decimal::ONE + uniform(rng, 0.01));
        let close = open + base * uniform(rng, 0.005);
        let high = open.max(close) * (Decimal::ONE + uniform(rng, 0.005).abs());
        let low = open.min(close) * (Decimal::ONE - uniform(rng, 0.005).abs());

        candles.push(Candle {
            date,
            open: open.round_dp(2),
            high: high.round_dp(2),
            low: low.round_dp(2),
            close: close.round_dp(2),
            volume: rng.random_range(10_000..110_000),
        });
    }

    candles
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, bound: f64) -> Decimal {
    Decimal::try_from(rng.random_range(-bound..=bound)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use test_case::test_case;

    use super::*;

    #[test_case("1D", CandlePeriod::OneDay ; "one day")]
    #[test_case("1w", CandlePeriod::OneWeek ; "lowercase week")]
    #[test_case("1M", CandlePeriod::OneMonth ; "one month")]
    #[test_case("3M", CandlePeriod::ThreeMonths ; "three months")]
    #[test_case("6M", CandlePeriod::SixMonths ; "six months")]
    #[test_case("1Y", CandlePeriod::OneYear ; "one year")]
    #[test_case("5Y", CandlePeriod::OneYear ; "unknown falls back to year")]
    fn period_codes(code: &str, expected: CandlePeriod) {
        assert_eq!(CandlePeriod::from_code(code), expected);
        assert_eq!(CandlePeriod::from_code(expected.code()), expected);
    }

    #[test]
    fn one_candle_per_day_inclusive() {
        let mut rng = StdRng::seed_from_u64(1);
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

        let candles = generate_candles(Decimal::from(68_500), CandlePeriod::OneWeek, today, &mut rng);

        assert_eq!(candles.len(), 8);
        assert_eq!(candles.first().unwrap().date, NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(candles.last().unwrap().date, today);
    }

    #[test]
    fn high_and_low_wrap_body() {
        let mut rng = StdRng::seed_from_u64(2);
        let today = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();

        for candle in generate_candles(Decimal::from(150), CandlePeriod::OneMonth, today, &mut rng) {
            assert!(candle.high >= candle.open.max(candle.close));
            assert!(candle.low <= candle.open.min(candle.close));
            assert!(candle.low > Decimal::ZERO);
        }
    }
}
