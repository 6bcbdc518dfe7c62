//! Trend and volatility analysis over a series of closes.

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use super::Symbol;

/// Average move (percent) between the two windows that counts as a trend.
const TREND_THRESHOLD: Decimal = Decimal::TWO;

/// Closes in each averaging window.
const TREND_WINDOW: usize = 5;

/// Direction of recent prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Recent average more than 2% above the window before it.
    Bullish,
    /// Recent average more than 2% below the window before it.
    Bearish,
    /// Anything in between, or too little data.
    Neutral,
}

impl Trend {
    fn predictions(self) -> &'static [&'static str] {
        match self {
            Self::Bullish => &[
                "Strong upward momentum expected to continue",
                "Technical indicators suggest further gains",
                "Market sentiment remains positive",
            ],
            Self::Bearish => &[
                "Downward pressure likely to persist",
                "Technical indicators suggest further decline",
                "Market sentiment turning negative",
            ],
            Self::Neutral => &[
                "Sideways movement expected in near term",
                "Market consolidation phase",
                "Mixed signals from technical indicators",
            ],
        }
    }
}

/// Summary of a symbol's recent behaviour.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Analysed symbol.
    pub symbol: Symbol,
    /// Direction of the last closes.
    pub trend: Trend,
    /// Standard deviation of close-to-close returns, in percent.
    pub volatility: f64,
    /// Lowest close.
    #[serde(with = "rust_decimal::serde::float")]
    pub support: Decimal,
    /// Highest close.
    #[serde(with = "rust_decimal::serde::float")]
    pub resistance: Decimal,
    /// Canned outlook matching the trend.
    pub prediction: &'static str,
    /// Mock confidence, 70 to 99.
    pub confidence: u8,
    /// Generation time.
    pub last_updated: DateTime<Utc>,
}

/// Analyse `closes` (oldest first).
pub fn analyze<R: Rng + ?Sized>(symbol: &str, closes: &[Decimal], rng: &mut R) -> Analysis {
    let trend = trend(closes);
    let predictions = trend.predictions();

    Analysis {
        symbol: symbol.to_string(),
        trend,
        volatility: volatility(closes),
        support: closes.iter().copied().min().unwrap_or_default(),
        resistance: closes.iter().copied().max().unwrap_or_default(),
        prediction: predictions[rng.random_range(0..predictions.len())],
        confidence: rng.random_range(70..100),
        last_updated: Utc::now(),
    }
}

/// Compare the average of the last five closes with the five before them.
#[must_use]
pub fn trend(closes: &[Decimal]) -> Trend {
    let split = closes.len().saturating_sub(TREND_WINDOW);
    let recent = &closes[split..];
    let older = &closes[split.saturating_sub(TREND_WINDOW)..split];

    let (Some(recent_avg), Some(older_avg)) = (mean(recent), mean(older)) else {
        return Trend::Neutral;
    };
    if older_avg.is_zero() {
        return Trend::Neutral;
    }

    let change = (recent_avg - older_avg) / older_avg * Decimal::ONE_HUNDRED;
    if change > TREND_THRESHOLD {
        Trend::Bullish
    } else if change < -TREND_THRESHOLD {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// Population standard deviation of close-to-close returns, in percent,
/// rounded to two places. Fewer than two closes yield zero.
#[must_use]
pub fn volatility(closes: &[Decimal]) -> f64 {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|pair| !pair[0].is_zero())
        .filter_map(|pair| ((pair[1] - pair[0]) / pair[0]).to_f64())
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

    (variance.sqrt() * 10_000.0).round() / 100.0
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<Decimal>() / Decimal::from(values.len()))
}
