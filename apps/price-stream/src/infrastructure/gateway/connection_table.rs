//! Outbound channel table.
//!
//! Maps live connections to the sending half of their bounded outbound
//! queue. This is the [`MessageSink`] the broadcast loop delivers through.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::application::ports::{DeliveryError, MessageSink};
use crate::domain::subscription::ConnectionId;
use crate::infrastructure::protocol::ServerMessage;

/// Live outbound queues keyed by connection.
#[derive(Debug)]
pub struct ConnectionTable {
    senders: RwLock<HashMap<ConnectionId, mpsc::Sender<ServerMessage>>>,
    send_timeout: Duration,
}

impl ConnectionTable {
    /// Create an empty table with the given send deadline.
    #[must_use]
    pub fn new(send_timeout: Duration) -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
            send_timeout,
        }
    }

    /// Register a connection's outbound queue.
    pub fn register(&self, connection: ConnectionId, sender: mpsc::Sender<ServerMessage>) {
        self.senders.write().insert(connection, sender);
    }

    /// Drop a connection's outbound queue. Returns whether it was present.
    pub fn remove(&self, connection: ConnectionId) -> bool {
        self.senders.write().remove(&connection).is_some()
    }

    /// Whether a connection is registered.
    #[must_use]
    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.senders.read().contains_key(&connection)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.senders.read().len()
    }

    /// Whether no connections are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.senders.read().is_empty()
    }

    /// Drop every outbound queue, which ends each socket's writer and closes
    /// the socket. Returns how many connections were closed.
    pub fn close_all(&self) -> usize {
        let drained: Vec<_> = self.senders.write().drain().collect();
        drained.len()
    }

    /// Send deadline applied to every delivery.
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }
}

#[async_trait]
impl MessageSink for ConnectionTable {
    async fn deliver(
        &self,
        connection: ConnectionId,
        message: &ServerMessage,
    ) -> Result<(), DeliveryError> {
        // Clone the sender so the lock is released before awaiting.
        let sender = self
            .senders
            .read()
            .get(&connection)
            .cloned()
            .ok_or(DeliveryError::UnknownConnection(connection))?;

        sender
            .send_timeout(message.clone(), self.send_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DeliveryError::Timeout(connection),
                SendTimeoutError::Closed(_) => DeliveryError::Closed(connection),
            })
    }

    fn evict(&self, connection: ConnectionId) {
        self.remove(connection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_registered_connection() {
        let table = ConnectionTable::new(Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(4);
        table.register(1, tx);

        table.deliver(1, &ServerMessage::Pong).await.unwrap();

        assert_eq!(rx.recv().await, Some(ServerMessage::Pong));
    }

    #[tokio::test]
    async fn unknown_connection() {
        let table = ConnectionTable::new(Duration::from_millis(50));

        let err = table.deliver(9, &ServerMessage::Pong).await.unwrap_err();

        assert_eq!(err, DeliveryError::UnknownConnection(9));
    }

    #[tokio::test]
    async fn closed_receiver() {
        let table = ConnectionTable::new(Duration::from_millis(50));
        let (tx, rx) = mpsc::channel(4);
        table.register(1, tx);
        drop(rx);

        let err = table.deliver(1, &ServerMessage::Pong).await.unwrap_err();

        assert_eq!(err, DeliveryError::Closed(1));
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_hits_send_deadline() {
        let table = ConnectionTable::new(Duration::from_secs(2));
        let (tx, _rx) = mpsc::channel(1);
        table.register(1, tx);

        table.deliver(1, &ServerMessage::Pong).await.unwrap();
        let err = table.deliver(1, &ServerMessage::Pong).await.unwrap_err();

        assert_eq!(err, DeliveryError::Timeout(1));
    }

    #[tokio::test]
    async fn evict_removes_sender() {
        let table = ConnectionTable::new(Duration::from_millis(50));
        let (tx, mut rx) = mpsc::channel(4);
        table.register(1, tx);

        table.evict(1);

        assert!(!table.contains(1));
        assert!(table.is_empty());
        // Last sender dropped, so the writer side sees end of stream.
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn close_all_ends_every_queue() {
        let table = ConnectionTable::new(Duration::from_millis(50));
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        table.register(1, tx_a);
        table.register(2, tx_b);

        assert_eq!(table.close_all(), 2);

        assert!(table.is_empty());
        assert_eq!(rx_a.recv().await, None);
        assert_eq!(rx_b.recv().await, None);
        assert_eq!(table.close_all(), 0);
    }
}
