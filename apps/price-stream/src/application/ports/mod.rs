//! Port Interfaces
//!
//! Contracts between the application services and the adapters that talk
//! to clients.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`MessageSink`]: delivers a server message to one connection

use async_trait::async_trait;

use crate::domain::subscription::ConnectionId;
use crate::infrastructure::protocol::ServerMessage;

/// Why a message could not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Connection is not (or no longer) registered with the sink.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),

    /// Connection's outbound channel is closed.
    #[error("connection {0} is closed")]
    Closed(ConnectionId),

    /// Outbound queue stayed full past the send deadline.
    #[error("send to connection {0} timed out")]
    Timeout(ConnectionId),
}

impl DeliveryError {
    /// Short label for metrics.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::UnknownConnection(_) => "unknown_connection",
            Self::Closed(_) => "closed",
            Self::Timeout(_) => "timeout",
        }
    }
}

/// Outbound delivery to a single client connection.
///
/// Implementations must bound each delivery by a send deadline so a stalled
/// client cannot hold up fan-out to others.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Queue `message` for `connection`.
    async fn deliver(
        &self,
        connection: ConnectionId,
        message: &ServerMessage,
    ) -> Result<(), DeliveryError>;

    /// Drop the connection's outbound channel so its socket closes.
    fn evict(&self, connection: ConnectionId);
}
