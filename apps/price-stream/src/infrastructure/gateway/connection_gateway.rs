//! Connection Gateway
//!
//! Transport-independent handling of client connections: lifecycle,
//! control message dispatch and cleanup. The axum socket handler drives it
//! with `on_connect` / `on_message` / `on_binary` / `on_disconnect`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use super::connection_table::ConnectionTable;
use super::heartbeat::HeartbeatConfig;
use crate::application::ports::MessageSink;
use crate::domain::connection::{ConnectionState, Lifecycle};
use crate::domain::pricing::{MarketStatus, PriceCache};
use crate::domain::subscription::{ConnectionId, SubscriptionRegistry};
use crate::infrastructure::config::GatewaySettings;
use crate::infrastructure::metrics;
use crate::infrastructure::protocol::{ClientMessage, JsonCodec, ServerMessage};

/// One client connection as seen by the gateway.
///
/// Owned by the socket task; the gateway never stores it.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    lifecycle: Lifecycle,
}

impl Session {
    fn new(id: ConnectionId) -> Self {
        Self {
            id,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.lifecycle.state()
    }
}

/// Accepts connections and applies their control messages.
#[derive(Debug)]
pub struct ConnectionGateway {
    registry: Arc<SubscriptionRegistry>,
    cache: Arc<PriceCache>,
    connections: Arc<ConnectionTable>,
    codec: JsonCodec,
    settings: GatewaySettings,
}

impl ConnectionGateway {
    /// Create a gateway.
    #[must_use]
    pub const fn new(
        registry: Arc<SubscriptionRegistry>,
        cache: Arc<PriceCache>,
        connections: Arc<ConnectionTable>,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            registry,
            cache,
            connections,
            codec: JsonCodec::new(),
            settings,
        }
    }

    /// Codec used for outbound frames.
    #[must_use]
    pub const fn codec(&self) -> JsonCodec {
        self.codec
    }

    /// Heartbeat settings for socket tasks.
    #[must_use]
    pub fn heartbeat(&self) -> HeartbeatConfig {
        HeartbeatConfig::from(&self.settings)
    }

    /// Deadline for a single socket write.
    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        self.connections.send_timeout()
    }

    /// Market status announced on connect.
    #[must_use]
    pub const fn market_status(&self) -> MarketStatus {
        self.settings.market_status
    }

    /// Register a new connection and announce the market status.
    ///
    /// Returns the session plus the receiving half of its outbound queue,
    /// which the socket writer drains.
    pub async fn on_connect(&self) -> (Session, mpsc::Receiver<ServerMessage>) {
        let mut session = Session::new(new_connection_id());
        let (tx, rx) = mpsc::channel(self.settings.outbound_capacity);
        self.connections.register(session.id, tx);

        if let Err(e) = session.lifecycle.transition(ConnectionState::Open) {
            tracing::error!(connection = session.id, error = %e, "Connection failed to open");
        }

        metrics::set_connections(self.connections.len());
        tracing::info!(connection = session.id, "Client connected");

        self.send(
            session.id,
            ServerMessage::MarketStatus {
                status: self.settings.market_status,
            },
        )
        .await;

        (session, rx)
    }

    /// Handle one inbound text frame.
    ///
    /// Frames arriving outside the `Open` state are ignored. Malformed
    /// frames are answered with an error frame.
    pub async fn on_message(&self, session: &Session, raw: &str) {
        if !session.state().accepts_messages() {
            tracing::debug!(
                connection = session.id,
                state = %session.state(),
                "Ignoring message outside open state"
            );
            return;
        }

        let message = match self.codec.decode(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(connection = session.id, error = %e, "Malformed client message");
                metrics::record_malformed_message();
                self.send(session.id, ServerMessage::error(e.to_string())).await;
                return;
            }
        };

        match message {
            ClientMessage::Subscribe { symbol } => {
                // Only this connection's reader adds its subscriptions, so the
                // check holds until the subscribe below.
                let limit = self.settings.max_subscriptions;
                if let Err(e) = self.registry.ensure_capacity(session.id, &symbol, limit) {
                    tracing::warn!(
                        connection = session.id,
                        symbol = %symbol,
                        error = %e,
                        "Subscription refused"
                    );
                    self.send(session.id, ServerMessage::error(e.to_string())).await;
                    return;
                }
                if let Some(tick) = self.cache.get(&symbol) {
                    self.send(session.id, ServerMessage::from(tick)).await;
                }
                let changes = self.registry.subscribe(session.id, &symbol);
                tracing::info!(
                    connection = session.id,
                    symbol = %symbol,
                    newly_active = !changes.activated.is_empty(),
                    "Subscribed"
                );
                metrics::set_subscriptions(self.registry.stats());
            }
            ClientMessage::Unsubscribe { symbol } => {
                let changes = self.registry.unsubscribe(session.id, &symbol);
                tracing::info!(
                    connection = session.id,
                    symbol = %symbol,
                    deactivated = !changes.deactivated.is_empty(),
                    "Unsubscribed"
                );
                metrics::set_subscriptions(self.registry.stats());
            }
            ClientMessage::Ping => {
                self.send(session.id, ServerMessage::Pong).await;
            }
        }
    }

    /// Handle one inbound binary frame, which the protocol does not carry.
    ///
    /// Answered with an error frame like any other malformed frame.
    pub async fn on_binary(&self, session: &Session) {
        if !session.state().accepts_messages() {
            return;
        }

        tracing::warn!(connection = session.id, "Binary frame received");
        metrics::record_malformed_message();
        self.send(
            session.id,
            ServerMessage::error("binary frames are not supported"),
        )
        .await;
    }

    /// Tear down a connection: drop its subscriptions and outbound queue.
    ///
    /// Idempotent; a second call is a no-op.
    pub fn on_disconnect(&self, session: &mut Session) {
        if session.lifecycle.transition(ConnectionState::Closed).is_err() {
            return;
        }

        let changes = self.registry.remove_connection(session.id);
        self.connections.remove(session.id);

        metrics::set_connections(self.connections.len());
        metrics::set_subscriptions(self.registry.stats());
        tracing::info!(
            connection = session.id,
            deactivated = changes.deactivated.len(),
            "Client disconnected"
        );
    }

    async fn send(&self, connection: ConnectionId, message: ServerMessage) {
        let kind = message.kind();
        match self.connections.deliver(connection, &message).await {
            Ok(()) => metrics::record_messages_sent(kind, 1),
            Err(e) => {
                metrics::record_delivery_failure(e.reason());
                tracing::debug!(connection, kind, error = %e, "Reply not delivered");
            }
        }
    }
}

fn new_connection_id() -> ConnectionId {
    uuid::Uuid::new_v4().as_u64_pair().0
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::pricing::PriceTick;

    struct Fixture {
        gateway: ConnectionGateway,
        registry: Arc<SubscriptionRegistry>,
        cache: Arc<PriceCache>,
        connections: Arc<ConnectionTable>,
    }

    fn fixture() -> Fixture {
        fixture_with(GatewaySettings::default())
    }

    fn fixture_with(settings: GatewaySettings) -> Fixture {
        let registry = Arc::new(SubscriptionRegistry::new());
        let cache = Arc::new(PriceCache::new());
        let connections = Arc::new(ConnectionTable::new(Duration::from_millis(100)));
        let gateway = ConnectionGateway::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&connections),
            settings,
        );
        Fixture {
            gateway,
            registry,
            cache,
            connections,
        }
    }

    fn tick(symbol: &str) -> PriceTick {
        PriceTick {
            symbol: symbol.to_string(),
            price: Decimal::new(15_050, 2),
            change: Decimal::new(50, 2),
            change_percent: Decimal::new(33, 2),
            volume: 1_500_000,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn connect_opens_and_announces_status() {
        let f = fixture();

        let (session, mut rx) = f.gateway.on_connect().await;

        assert_eq!(session.state(), ConnectionState::Open);
        assert!(f.connections.contains(session.id()));
        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::MarketStatus {
                status: MarketStatus::Open
            })
        );
    }

    #[tokio::test]
    async fn subscribe_without_cache_sends_nothing() {
        let f = fixture();
        let (session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;

        f.gateway
            .on_message(&session, r#"{"type":"subscribe","symbol":"aapl"}"#)
            .await;

        assert!(f.registry.is_subscribed(session.id(), "AAPL"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn subscribe_replays_cached_tick() {
        let f = fixture();
        f.cache.store(tick("TSLA"));
        let (session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;

        f.gateway
            .on_message(&session, r#"{"type":"subscribe","symbol":"TSLA"}"#)
            .await;

        let cached = f.cache.get("TSLA").unwrap();
        assert_eq!(rx.recv().await, Some(ServerMessage::from(cached)));
        assert!(f.registry.is_subscribed(session.id(), "TSLA"));
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let f = fixture();
        let (session, _rx) = f.gateway.on_connect().await;

        f.gateway
            .on_message(&session, r#"{"type":"subscribe","symbol":"MSFT"}"#)
            .await;
        for _ in 0..2 {
            f.gateway
                .on_message(&session, r#"{"type":"unsubscribe","symbol":"MSFT"}"#)
                .await;
        }

        assert!(f.registry.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn ping_gets_pong() {
        let f = fixture();
        let (session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;

        f.gateway.on_message(&session, r#"{"type":"ping"}"#).await;

        assert_eq!(rx.recv().await, Some(ServerMessage::Pong));
    }

    #[tokio::test]
    async fn malformed_frame_gets_error_frame() {
        let f = fixture();
        let (session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;

        f.gateway.on_message(&session, "not json").await;
        f.gateway
            .on_message(&session, r#"{"type":"subscribe","symbol":"  "}"#)
            .await;

        for _ in 0..2 {
            let reply = rx.recv().await.unwrap();
            assert_eq!(reply.kind(), "error");
        }
        assert!(f.registry.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn subscriptions_beyond_limit_are_refused() {
        let f = fixture_with(GatewaySettings {
            max_subscriptions: 2,
            ..GatewaySettings::default()
        });
        f.cache.store(tick("NVDA"));
        let (session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;

        for symbol in ["AAPL", "TSLA", "NVDA"] {
            let frame = format!(r#"{{"type":"subscribe","symbol":"{symbol}"}}"#);
            f.gateway.on_message(&session, &frame).await;
        }

        let reply = rx.recv().await.unwrap();
        assert_eq!(
            reply,
            ServerMessage::error("subscription limit of 2 symbols reached")
        );
        assert!(rx.try_recv().is_err());
        assert!(!f.registry.is_subscribed(session.id(), "NVDA"));
        assert_eq!(f.registry.symbols_of(session.id()).len(), 2);

        // Re-subscribing to a held symbol stays within the limit.
        f.gateway
            .on_message(&session, r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn binary_frame_gets_error_frame() {
        let f = fixture();
        let (session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;

        f.gateway.on_binary(&session).await;

        assert_eq!(
            rx.recv().await,
            Some(ServerMessage::error("binary frames are not supported"))
        );
        assert!(f.connections.contains(session.id()));
    }

    #[tokio::test]
    async fn binary_frame_after_close_is_ignored() {
        let f = fixture();
        let (mut session, mut rx) = f.gateway.on_connect().await;
        rx.recv().await;
        f.gateway.on_disconnect(&mut session);

        f.gateway.on_binary(&session).await;

        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn messages_outside_open_are_ignored() {
        let f = fixture();

        let connecting = Session::new(42);
        f.gateway
            .on_message(&connecting, r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .await;
        assert!(f.registry.active_symbols().is_empty());

        let (mut session, _rx) = f.gateway.on_connect().await;
        f.gateway.on_disconnect(&mut session);
        f.gateway
            .on_message(&session, r#"{"type":"subscribe","symbol":"AAPL"}"#)
            .await;
        assert_eq!(session.state(), ConnectionState::Closed);
        assert!(f.registry.active_symbols().is_empty());
    }

    #[tokio::test]
    async fn disconnect_cascades() {
        let f = fixture();
        let (mut a, _rx_a) = f.gateway.on_connect().await;
        let (b, _rx_b) = f.gateway.on_connect().await;

        for symbol in ["AAPL", "TSLA"] {
            let frame = format!(r#"{{"type":"subscribe","symbol":"{symbol}"}}"#);
            f.gateway.on_message(&a, &frame).await;
        }
        f.gateway
            .on_message(&b, r#"{"type":"subscribe","symbol":"TSLA"}"#)
            .await;

        f.gateway.on_disconnect(&mut a);
        f.gateway.on_disconnect(&mut a);

        assert!(!f.connections.contains(a.id()));
        assert!(f.registry.symbols_of(a.id()).is_empty());
        assert_eq!(f.registry.active_symbols(), vec!["TSLA".to_string()]);
        assert_eq!(f.connections.len(), 1);
    }
}
