//! Last-value tick cache.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use rust_decimal::Decimal;

use super::{PriceTick, Symbol, base_price};

/// Symbols kept when no capacity is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1_024;

#[derive(Debug, Default)]
struct CacheState {
    /// Latest tick per symbol, tagged with its store sequence.
    ticks: HashMap<Symbol, (u64, PriceTick)>,
    /// Store sequence → symbol, oldest first.
    order: BTreeMap<u64, Symbol>,
    next_seq: u64,
}

/// In-memory cache of the most recent tick per symbol.
///
/// Shared by the broadcast loop, the gateway (replay on subscribe) and the
/// REST facade. Holds at most `capacity` symbols; storing a new symbol into
/// a full cache drops the symbol stored least recently. Subscribed symbols
/// are re-stored every broadcast cycle, so they stay resident. Nothing is
/// persisted.
#[derive(Debug)]
pub struct PriceCache {
    state: RwLock<CacheState>,
    capacity: usize,
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl PriceCache {
    /// Create an empty cache with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding at most `capacity` symbols (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            capacity: capacity.max(1),
        }
    }

    /// Most recent tick for a symbol, if one was generated.
    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<PriceTick> {
        self.state.read().ticks.get(symbol).map(|(_, tick)| tick.clone())
    }

    /// Price the next tick should start from: the cached price or the base
    /// price when the symbol has not ticked yet.
    #[must_use]
    pub fn previous_price(&self, symbol: &str) -> Decimal {
        self.state
            .read()
            .ticks
            .get(symbol)
            .map_or_else(|| base_price(symbol), |(_, tick)| tick.price)
    }

    /// Store a tick, replacing any previous one for the same symbol.
    pub fn store(&self, tick: PriceTick) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let seq = state.next_seq;
        state.next_seq += 1;

        let symbol = tick.symbol.clone();
        if let Some((old_seq, _)) = state.ticks.insert(symbol.clone(), (seq, tick)) {
            state.order.remove(&old_seq);
        }
        state.order.insert(seq, symbol);

        while state.ticks.len() > self.capacity {
            let Some((_, oldest)) = state.order.pop_first() else {
                break;
            };
            state.ticks.remove(&oldest);
        }
    }

    /// Maximum number of cached symbols.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().ticks.len()
    }

    /// Whether the cache holds no ticks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().ticks.is_empty()
    }
}
