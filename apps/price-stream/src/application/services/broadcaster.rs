//! Broadcast Loop
//!
//! Fixed-interval task that generates one tick per subscribed symbol and
//! fans it out to that symbol's subscribers.
//!
//! # Design
//!
//! - Symbols with no subscribers are never generated.
//! - Deliveries for one symbol run concurrently; each is bounded by the
//!   sink's send deadline.
//! - A failed delivery evicts that connection only. Remaining subscribers
//!   still receive the tick.
//! - Registry and cache locks are taken and released inside synchronous
//!   calls, never across an `.await`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{DeliveryError, MessageSink};
use crate::domain::pricing::{PriceCache, PriceGenerator};
use crate::domain::subscription::{ConnectionId, SubscriptionRegistry};
use crate::infrastructure::metrics::{self, TickSource};
use crate::infrastructure::protocol::ServerMessage;

/// Outcome of one broadcast cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Symbols that produced a tick.
    pub symbols: usize,
    /// Successful deliveries.
    pub deliveries: usize,
    /// Connections evicted after a failed delivery.
    pub evicted: Vec<ConnectionId>,
}

impl CycleReport {
    /// Whether the cycle had nothing to do.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.symbols == 0
    }
}

/// Periodic tick generator and fan-out.
pub struct Broadcaster {
    generator: Arc<PriceGenerator>,
    cache: Arc<PriceCache>,
    registry: Arc<SubscriptionRegistry>,
    sink: Arc<dyn MessageSink>,
    interval: Duration,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl Broadcaster {
    /// Create a broadcaster.
    #[must_use]
    pub fn new(
        generator: Arc<PriceGenerator>,
        cache: Arc<PriceCache>,
        registry: Arc<SubscriptionRegistry>,
        sink: Arc<dyn MessageSink>,
        interval: Duration,
    ) -> Self {
        Self {
            generator,
            cache,
            registry,
            sink,
            interval,
        }
    }

    /// Run cycles until `cancel` fires.
    ///
    /// The first cycle runs one full interval after start.
    pub async fn run(&self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + self.interval;
        let mut ticker = tokio::time::interval_at(start, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
            "Broadcast loop started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let report = self.run_cycle().await;
                    if !report.is_idle() {
                        tracing::debug!(
                            symbols = report.symbols,
                            deliveries = report.deliveries,
                            evicted = report.evicted.len(),
                            "Broadcast cycle complete"
                        );
                    }
                }
            }
        }

        tracing::info!("Broadcast loop stopped");
    }

    /// Run a single broadcast cycle.
    pub async fn run_cycle(&self) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::default();

        for symbol in self.registry.active_symbols() {
            let subscribers = self.registry.subscribers_of(&symbol);
            if subscribers.is_empty() {
                continue;
            }

            let previous = self.cache.previous_price(&symbol);
            let tick = self.generator.generate_tick(&symbol, previous);
            self.cache.store(tick.clone());
            report.symbols += 1;

            let message = ServerMessage::from(tick);
            let message = &message;
            let results = join_all(subscribers.into_iter().map(|connection| async move {
                (connection, self.sink.deliver(connection, message).await)
            }))
            .await;

            for (connection, result) in results {
                match result {
                    Ok(()) => report.deliveries += 1,
                    Err(error) => {
                        self.evict(connection, &symbol, error);
                        report.evicted.push(connection);
                    }
                }
            }
        }

        if report.is_idle() {
            return report;
        }

        metrics::record_ticks_generated(TickSource::Broadcast, report.symbols as u64);
        metrics::record_messages_sent("price_update", report.deliveries as u64);
        metrics::record_cycle_duration(started.elapsed());
        metrics::set_subscriptions(self.registry.stats());

        report
    }

    fn evict(&self, connection: ConnectionId, symbol: &str, error: DeliveryError) {
        metrics::record_delivery_failure(error.reason());
        match error {
            DeliveryError::UnknownConnection(_) => {
                tracing::debug!(connection, symbol, "Skipping connection that already left");
            }
            DeliveryError::Closed(_) | DeliveryError::Timeout(_) => {
                tracing::warn!(connection, symbol, error = %error, "Delivery failed, evicting connection");
            }
        }
        self.registry.remove_connection(connection);
        self.sink.evict(connection);
    }
}
