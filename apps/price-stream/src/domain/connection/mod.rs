//! Connection Lifecycle
//!
//! Per-connection state machine: `Connecting → Open → Closed`.
//! Control messages are only honoured while the connection is open.

use std::fmt;

/// Lifecycle state of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Accepted, not yet registered with the gateway.
    #[default]
    Connecting,
    /// Registered; control messages are accepted.
    Open,
    /// Torn down; terminal.
    Closed,
}

impl ConnectionState {
    /// Whether control messages may be processed in this state.
    #[must_use]
    pub const fn accepts_messages(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether `self → next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Open | Self::Closed) | (Self::Open, Self::Closed)
        )
    }

    /// State name for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid connection transition {from} -> {to}")]
pub struct InvalidTransition {
    /// State before the attempted transition.
    pub from: ConnectionState,
    /// Requested state.
    pub to: ConnectionState,
}

/// Tracks the state of one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lifecycle {
    state: ConnectionState,
}

impl Lifecycle {
    /// Start in `Connecting`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Move to `next`, rejecting illegal transitions.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when `next` is not reachable from the
    /// current state.
    pub fn transition(&mut self, next: ConnectionState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
