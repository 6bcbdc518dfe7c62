//! Subscription Registry
//!
//! Domain types for tracking which connections want updates for which
//! symbols.
//!
//! # Design
//!
//! The registry keeps two indices:
//! - symbol → subscribed connections (drives broadcast fan-out)
//! - connection → subscribed symbols (drives cleanup on disconnect)
//!
//! Both live behind one lock and every mutation updates both sides before
//! the lock is released, so readers never observe one index without the
//! other. A symbol whose subscriber set becomes empty is dropped from the
//! active set so the broadcast loop stops generating ticks for it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

pub use crate::domain::pricing::Symbol;

// =============================================================================
// Types
// =============================================================================

/// Unique identifier for a client connection.
pub type ConnectionId = u64;

// =============================================================================
// Subscription Changes
// =============================================================================

/// Changes to the active symbol set caused by a registry mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionChanges {
    /// Symbols that gained their first subscriber.
    pub activated: HashSet<Symbol>,
    /// Symbols that lost their last subscriber.
    pub deactivated: HashSet<Symbol>,
}

impl SubscriptionChanges {
    /// Check if there are any changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activated.is_empty() && self.deactivated.is_empty()
    }

    /// Create changes with only activations.
    #[must_use]
    pub fn activated_only(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            activated: symbols.into_iter().collect(),
            deactivated: HashSet::new(),
        }
    }

    /// Create changes with only deactivations.
    #[must_use]
    pub fn deactivated_only(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            activated: HashSet::new(),
            deactivated: symbols.into_iter().collect(),
        }
    }
}

/// A connection already holds as many symbols as it may.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("subscription limit of {limit} symbols reached")]
pub struct SubscriptionLimitExceeded {
    /// Maximum symbols per connection.
    pub limit: usize,
}

// =============================================================================
// Registry State
// =============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    symbol_subscribers: HashMap<Symbol, HashSet<ConnectionId>>,
    connection_symbols: HashMap<ConnectionId, HashSet<Symbol>>,
}

impl RegistryState {
    /// Returns true when the symbol gained its first subscriber.
    fn subscribe(&mut self, connection: ConnectionId, symbol: &str) -> bool {
        let connection_set = self.connection_symbols.entry(connection).or_default();
        if !connection_set.insert(symbol.to_string()) {
            return false;
        }

        let subscribers = self
            .symbol_subscribers
            .entry(symbol.to_string())
            .or_default();
        subscribers.insert(connection);
        subscribers.len() == 1
    }

    /// Returns true when the symbol lost its last subscriber.
    fn unsubscribe(&mut self, connection: ConnectionId, symbol: &str) -> bool {
        let Some(connection_set) = self.connection_symbols.get_mut(&connection) else {
            return false;
        };

        if !connection_set.remove(symbol) {
            return false;
        }

        if connection_set.is_empty() {
            self.connection_symbols.remove(&connection);
        }

        self.detach(connection, symbol)
    }

    /// Returns the symbols that lost their last subscriber.
    fn remove_connection(&mut self, connection: ConnectionId) -> Vec<Symbol> {
        let Some(symbols) = self.connection_symbols.remove(&connection) else {
            return vec![];
        };

        symbols
            .into_iter()
            .filter(|symbol| self.detach(connection, symbol))
            .collect()
    }

    /// Drop `connection` from the symbol's subscriber set.
    fn detach(&mut self, connection: ConnectionId, symbol: &str) -> bool {
        let Some(subscribers) = self.symbol_subscribers.get_mut(symbol) else {
            return false;
        };

        subscribers.remove(&connection);
        if subscribers.is_empty() {
            self.symbol_subscribers.remove(symbol);
            return true;
        }

        false
    }

    fn subscription_count(&self) -> usize {
        self.connection_symbols.values().map(HashSet::len).sum()
    }
}

// =============================================================================
// Subscription Registry
// =============================================================================

/// Bidirectional index of connection subscriptions.
///
/// One instance is created per server process and shared by the gateway
/// and the broadcast loop.
///
/// # Example
///
/// ```rust
/// use price_stream::domain::subscription::SubscriptionRegistry;
///
/// let registry = SubscriptionRegistry::new();
///
/// // First subscriber activates the symbol
/// let changes = registry.subscribe(1, "AAPL");
/// assert!(changes.activated.contains("AAPL"));
///
/// // Second subscriber does not change the active set
/// let changes = registry.subscribe(2, "AAPL");
/// assert!(changes.is_empty());
///
/// // Connection 1 leaves - still active via connection 2
/// let changes = registry.remove_connection(1);
/// assert!(changes.deactivated.is_empty());
///
/// // Connection 2 unsubscribes - symbol goes idle
/// let changes = registry.unsubscribe(2, "AAPL");
/// assert!(changes.deactivated.contains("AAPL"));
/// assert!(registry.active_symbols().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    state: RwLock<RegistryState>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a symbol.
    ///
    /// Subscribing twice is a no-op.
    pub fn subscribe(&self, connection: ConnectionId, symbol: &str) -> SubscriptionChanges {
        if self.state.write().subscribe(connection, symbol) {
            SubscriptionChanges::activated_only([symbol.to_string()])
        } else {
            SubscriptionChanges::default()
        }
    }

    /// Unsubscribe a connection from a symbol.
    ///
    /// Unsubscribing a symbol the connection does not hold is a no-op.
    pub fn unsubscribe(&self, connection: ConnectionId, symbol: &str) -> SubscriptionChanges {
        if self.state.write().unsubscribe(connection, symbol) {
            SubscriptionChanges::deactivated_only([symbol.to_string()])
        } else {
            SubscriptionChanges::default()
        }
    }

    /// Remove every subscription held by a connection.
    pub fn remove_connection(&self, connection: ConnectionId) -> SubscriptionChanges {
        let deactivated = self.state.write().remove_connection(connection);
        SubscriptionChanges::deactivated_only(deactivated)
    }

    /// Check that subscribing `connection` to `symbol` keeps it within
    /// `limit` symbols. Re-subscribing a held symbol always passes.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionLimitExceeded` when the connection already holds
    /// `limit` other symbols.
    pub fn ensure_capacity(
        &self,
        connection: ConnectionId,
        symbol: &str,
        limit: usize,
    ) -> Result<(), SubscriptionLimitExceeded> {
        let state = self.state.read();
        let held = state.connection_symbols.get(&connection);

        if held.is_some_and(|s| s.contains(symbol)) || held.map_or(0, HashSet::len) < limit {
            Ok(())
        } else {
            Err(SubscriptionLimitExceeded { limit })
        }
    }

    /// Connections subscribed to a symbol.
    #[must_use]
    pub fn subscribers_of(&self, symbol: &str) -> HashSet<ConnectionId> {
        self.state
            .read()
            .symbol_subscribers
            .get(symbol)
            .cloned()
            .unwrap_or_default()
    }

    /// Symbols with at least one subscriber, sorted.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<_> = self
            .state
            .read()
            .symbol_subscribers
            .keys()
            .cloned()
            .collect();
        symbols.sort_unstable();
        symbols
    }

    /// Symbols a connection is subscribed to, sorted.
    #[must_use]
    pub fn symbols_of(&self, connection: ConnectionId) -> Vec<Symbol> {
        let mut symbols: Vec<_> = self
            .state
            .read()
            .connection_symbols
            .get(&connection)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        symbols.sort_unstable();
        symbols
    }

    /// Whether `connection` is subscribed to `symbol`.
    #[must_use]
    pub fn is_subscribed(&self, connection: ConnectionId, symbol: &str) -> bool {
        self.state
            .read()
            .connection_symbols
            .get(&connection)
            .is_some_and(|s| s.contains(symbol))
    }

    /// Current registry statistics.
    #[must_use]
    pub fn stats(&self) -> SubscriptionStats {
        let state = self.state.read();
        SubscriptionStats {
            symbol_count: state.symbol_subscribers.len(),
            connection_count: state.connection_symbols.len(),
            subscription_count: state.subscription_count(),
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Registry statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    /// Number of symbols with at least one subscriber.
    pub symbol_count: usize,
    /// Number of connections holding at least one subscription.
    pub connection_count: usize,
    /// Total (connection, symbol) pairs.
    pub subscription_count: usize,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Both indices must describe the same set of pairs.
    fn assert_consistent(registry: &SubscriptionRegistry) {
        let state = registry.state.read();

        for (symbol, subscribers) in &state.symbol_subscribers {
            assert!(!subscribers.is_empty(), "{symbol} kept with no subscribers");
            for connection in subscribers {
                assert!(
                    state
                        .connection_symbols
                        .get(connection)
                        .is_some_and(|s| s.contains(symbol)),
                    "{connection} missing reverse entry for {symbol}"
                );
            }
        }

        for (connection, symbols) in &state.connection_symbols {
            assert!(!symbols.is_empty(), "{connection} kept with no symbols");
            for symbol in symbols {
                assert!(
                    state
                        .symbol_subscribers
                        .get(symbol)
                        .is_some_and(|s| s.contains(connection)),
                    "{symbol} missing reverse entry for {connection}"
                );
            }
        }
    }

    #[test]
    fn subscribe_new_symbol_activates() {
        let registry = SubscriptionRegistry::new();

        let changes = registry.subscribe(1, "AAPL");

        assert!(changes.activated.contains("AAPL"));
        assert!(changes.deactivated.is_empty());
        assert_consistent(&registry);
    }

    #[test]
    fn subscribe_existing_symbol_no_change() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");
        let changes = registry.subscribe(2, "AAPL");

        assert!(changes.is_empty());
        assert_eq!(registry.subscribers_of("AAPL"), HashSet::from([1, 2]));
    }

    #[test]
    fn duplicate_subscribe_is_noop() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");
        let changes = registry.subscribe(1, "AAPL");

        assert!(changes.is_empty());
        assert_eq!(registry.stats().subscription_count, 1);
    }

    #[test]
    fn unsubscribe_with_remaining_subscribers() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");
        registry.subscribe(2, "AAPL");

        let changes = registry.unsubscribe(1, "AAPL");

        assert!(changes.deactivated.is_empty());
        assert_eq!(registry.active_symbols(), vec!["AAPL".to_string()]);
        assert_consistent(&registry);
    }

    #[test]
    fn unsubscribe_last_subscriber_deactivates() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");
        let changes = registry.unsubscribe(1, "AAPL");

        assert!(changes.deactivated.contains("AAPL"));
        assert!(registry.active_symbols().is_empty());
        assert_eq!(registry.stats(), SubscriptionStats::default());
    }

    #[test]
    fn unsubscribe_unknown_symbol_is_noop() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");

        assert!(registry.unsubscribe(1, "MSFT").is_empty());
        assert!(registry.unsubscribe(2, "AAPL").is_empty());
        assert!(registry.unsubscribe(3, "TSLA").is_empty());
        assert_eq!(registry.subscribers_of("AAPL"), HashSet::from([1]));
        assert_consistent(&registry);
    }

    #[test]
    fn remove_connection_cleans_every_symbol() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");
        registry.subscribe(1, "MSFT");
        registry.subscribe(1, "GOOGL");
        registry.subscribe(2, "MSFT");

        let changes = registry.remove_connection(1);

        assert_eq!(
            changes.deactivated,
            HashSet::from(["AAPL".to_string(), "GOOGL".to_string()])
        );
        assert_eq!(registry.active_symbols(), vec!["MSFT".to_string()]);
        assert!(registry.symbols_of(1).is_empty());
        assert!(!registry.is_subscribed(1, "MSFT"));
        assert_consistent(&registry);
    }

    #[test]
    fn remove_unknown_connection_no_changes() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");

        assert!(registry.remove_connection(2).is_empty());
        assert_eq!(registry.active_symbols().len(), 1);
    }

    #[test]
    fn capacity_counts_distinct_symbols() {
        let registry = SubscriptionRegistry::new();

        assert!(registry.ensure_capacity(1, "AAPL", 2).is_ok());
        registry.subscribe(1, "AAPL");
        registry.subscribe(1, "MSFT");

        assert_eq!(
            registry.ensure_capacity(1, "TSLA", 2),
            Err(SubscriptionLimitExceeded { limit: 2 })
        );
        // Already held, so no new slot is needed.
        assert!(registry.ensure_capacity(1, "MSFT", 2).is_ok());
        // Other connections have their own budget.
        assert!(registry.ensure_capacity(2, "TSLA", 2).is_ok());

        registry.unsubscribe(1, "AAPL");
        assert!(registry.ensure_capacity(1, "TSLA", 2).is_ok());
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let registry = SubscriptionRegistry::new();

        let err = registry.ensure_capacity(1, "AAPL", 0).unwrap_err();

        assert_eq!(err.to_string(), "subscription limit of 0 symbols reached");
    }

    #[test]
    fn symbols_of_returns_sorted_symbols() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "TSLA");
        registry.subscribe(1, "AAPL");
        registry.subscribe(2, "GOOGL");

        assert_eq!(
            registry.symbols_of(1),
            vec!["AAPL".to_string(), "TSLA".to_string()]
        );
        assert_eq!(registry.symbols_of(2), vec!["GOOGL".to_string()]);
        assert!(registry.symbols_of(999).is_empty());
    }

    #[test]
    fn stats_are_accurate() {
        let registry = SubscriptionRegistry::new();

        registry.subscribe(1, "AAPL");
        registry.subscribe(1, "MSFT");
        registry.subscribe(2, "AAPL");

        let stats = registry.stats();

        assert_eq!(stats.symbol_count, 2);
        assert_eq!(stats.connection_count, 2);
        assert_eq!(stats.subscription_count, 3);
    }

    #[test]
    fn subscription_changes_is_empty() {
        assert!(SubscriptionChanges::default().is_empty());
        assert!(!SubscriptionChanges::activated_only(vec!["AAPL".to_string()]).is_empty());
        assert!(!SubscriptionChanges::deactivated_only(vec!["AAPL".to_string()]).is_empty());
    }

    #[test]
    fn interleaved_mutations_stay_consistent() {
        let registry = SubscriptionRegistry::new();
        let symbols = ["AAPL", "MSFT", "TSLA", "XAU"];

        for step in 0..200u64 {
            let connection = step % 7;
            let symbol = symbols[usize::try_from(step % 4).unwrap()];
            match step % 5 {
                0 | 1 => {
                    registry.subscribe(connection, symbol);
                }
                2 => {
                    registry.unsubscribe(connection, symbol);
                }
                3 => {
                    registry.remove_connection(connection);
                }
                _ => {
                    registry.unsubscribe(connection + 100, symbol);
                }
            }
            assert_consistent(&registry);
        }
    }

    #[test]
    fn thread_safety_concurrent_subscriptions() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                r.subscribe(i, &format!("SYM{i}"));
                r.subscribe(i, "SHARED");
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let stats = registry.stats();
        assert_eq!(stats.connection_count, 10);
        // SYM0-SYM9 plus SHARED
        assert_eq!(stats.symbol_count, 11);
        assert_consistent(&registry);
    }

    #[test]
    fn thread_safety_concurrent_disconnects() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(SubscriptionRegistry::new());

        for i in 0..10u64 {
            registry.subscribe(i, "SHARED");
        }

        let mut handles = vec![];
        for i in 0..10u64 {
            let r = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                r.remove_connection(i);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.stats(), SubscriptionStats::default());
        assert_consistent(&registry);
    }
}
