//! WebSocket Connection Gateway
//!
//! - `ConnectionTable`: outbound queues keyed by connection; the delivery
//!   adapter used by the broadcast loop
//! - `ConnectionGateway`: connection lifecycle and control messages
//! - `heartbeat`: ping frames and dead-client detection
//! - `ws_handler`: axum upgrade handler wiring a socket to the gateway

mod connection_gateway;
mod connection_table;
pub mod heartbeat;
mod socket;

pub use connection_gateway::{ConnectionGateway, Session};
pub use connection_table::ConnectionTable;
pub use heartbeat::{Heartbeat, HeartbeatConfig, HeartbeatEvent, HeartbeatState};
pub use socket::ws_handler;
