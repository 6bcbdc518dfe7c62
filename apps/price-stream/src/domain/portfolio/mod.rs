//! Portfolio Valuation
//!
//! Values a list of holdings against current prices and totals the result.
//! Amounts are rounded to two places; a zero amount invested reports a zero
//! return rather than dividing by zero.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::pricing::Symbol;

/// One position submitted for valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Number of shares (or units) held.
    #[serde(with = "rust_decimal::serde::float")]
    pub shares: Decimal,
    /// Cost basis.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_invested: Decimal,
}

/// A holding valued at the current price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingPerformance {
    /// Instrument symbol.
    pub symbol: Symbol,
    /// Shares held.
    #[serde(with = "rust_decimal::serde::float")]
    pub shares: Decimal,
    /// Cost basis.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount_invested: Decimal,
    /// Price used for the valuation.
    #[serde(with = "rust_decimal::serde::float")]
    pub current_price: Decimal,
    /// `shares × current_price`.
    #[serde(with = "rust_decimal::serde::float")]
    pub current_value: Decimal,
    /// `current_value − amount_invested`.
    #[serde(with = "rust_decimal::serde::float")]
    pub gain_loss: Decimal,
    /// Gain or loss relative to the amount invested, in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub return_percent: Decimal,
    /// Valuation time.
    pub last_updated: DateTime<Utc>,
}

/// Totals across all holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    /// Sum of amounts invested.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_invested: Decimal,
    /// Sum of current values.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_current_value: Decimal,
    /// Sum of gains and losses.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_gain_loss: Decimal,
    /// Total gain or loss relative to the total invested, in percent.
    #[serde(with = "rust_decimal::serde::float")]
    pub total_return_percent: Decimal,
    /// Valuation time.
    pub last_updated: DateTime<Utc>,
}

/// Per-holding results plus totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioPerformance {
    /// One entry per submitted holding, in order.
    pub performance: Vec<HoldingPerformance>,
    /// Totals.
    pub summary: PortfolioSummary,
}

/// Value `holdings` at `prices`.
///
/// A holding whose symbol has no price is carried at its amount invested.
#[must_use]
pub fn evaluate(
    holdings: &[Holding],
    prices: &HashMap<Symbol, Decimal>,
    now: DateTime<Utc>,
) -> PortfolioPerformance {
    let performance: Vec<HoldingPerformance> = holdings
        .iter()
        .map(|holding| {
            let (current_price, current_value) = prices.get(&holding.symbol).map_or(
                (Decimal::ZERO, holding.amount_invested),
                |price| (*price, *price * holding.shares),
            );
            let gain_loss = current_value - holding.amount_invested;

            HoldingPerformance {
                symbol: holding.symbol.clone(),
                shares: holding.shares,
                amount_invested: holding.amount_invested,
                current_price,
                current_value: current_value.round_dp(2),
                gain_loss: gain_loss.round_dp(2),
                return_percent: percent(gain_loss, holding.amount_invested),
                last_updated: now,
            }
        })
        .collect();

    let total_invested: Decimal = holdings.iter().map(|h| h.amount_invested).sum();
    let total_current_value: Decimal = performance.iter().map(|p| p.current_value).sum();
    let total_gain_loss = total_current_value - total_invested;

    PortfolioPerformance {
        performance,
        summary: PortfolioSummary {
            total_invested,
            total_current_value,
            total_gain_loss,
            total_return_percent: percent(total_gain_loss, total_invested),
            last_updated: now,
        },
    }
}

fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, shares: i64, invested: i64) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            shares: Decimal::from(shares),
            amount_invested: Decimal::from(invested),
        }
    }

    fn prices(entries: &[(&str, i64)]) -> HashMap<Symbol, Decimal> {
        entries
            .iter()
            .map(|(s, p)| ((*s).to_string(), Decimal::from(*p)))
            .collect()
    }

    #[test]
    fn values_each_holding_and_totals() {
        let holdings = [holding("AAPL", 10, 1_000), holding("TSLA", 2, 600)];

        let result = evaluate(&holdings, &prices(&[("AAPL", 150), ("TSLA", 250)]), Utc::now());

        let aapl = &result.performance[0];
        assert_eq!(aapl.current_value, Decimal::from(1_500));
        assert_eq!(aapl.gain_loss, Decimal::from(500));
        assert_eq!(aapl.return_percent, Decimal::from(50));

        let tsla = &result.performance[1];
        assert_eq!(tsla.gain_loss, Decimal::from(-100));

        assert_eq!(result.summary.total_invested, Decimal::from(1_600));
        assert_eq!(result.summary.total_current_value, Decimal::from(2_000));
        assert_eq!(result.summary.total_gain_loss, Decimal::from(400));
        assert_eq!(result.summary.total_return_percent, Decimal::from(25));
    }

    #[test]
    fn missing_price_carries_cost_basis() {
        let result = evaluate(&[holding("ZZZZ", 5, 300)], &HashMap::new(), Utc::now());

        assert_eq!(result.performance[0].current_value, Decimal::from(300));
        assert_eq!(result.performance[0].gain_loss, Decimal::ZERO);
    }

    #[test]
    fn zero_invested_has_zero_return() {
        let result = evaluate(&[holding("AAPL", 1, 0)], &prices(&[("AAPL", 150)]), Utc::now());

        assert_eq!(result.performance[0].return_percent, Decimal::ZERO);
        assert_eq!(result.summary.total_return_percent, Decimal::ZERO);
    }

    #[test]
    fn empty_portfolio() {
        let result = evaluate(&[], &HashMap::new(), Utc::now());

        assert!(result.performance.is_empty());
        assert_eq!(result.summary.total_invested, Decimal::ZERO);
    }

    #[test]
    fn holding_reads_camel_case_numbers() {
        let holding: Holding =
            serde_json::from_str(r#"{"symbol":"AAPL","shares":2.5,"amountInvested":300}"#)
                .unwrap();

        assert_eq!(holding.shares, Decimal::new(25, 1));
        assert_eq!(holding.amount_invested, Decimal::from(300));
    }
}
