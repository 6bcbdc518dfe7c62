//! Domain Layer - Core pricing and subscription logic.
//!
//! This layer contains the price generation, last-tick caching and
//! subscription tracking types. Nothing here performs I/O.

/// Synthetic price ticks, base prices and candle history.
pub mod pricing;

/// Subscription tracking between connections and symbols.
pub mod subscription;

/// Per-connection lifecycle state.
pub mod connection;

/// Portfolio valuation against current prices.
pub mod portfolio;

/// Canned market news with keyword impact scoring.
pub mod news;
