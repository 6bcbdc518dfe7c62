//! WebSocket Wire Protocol
//!
//! JSON text frames exchanged with clients.
//!
//! - `messages`: inbound control messages and outbound events
//! - `codec`: decoding of raw client frames and encoding of server frames

pub mod codec;
pub mod messages;

pub use codec::{CodecError, JsonCodec, normalize_symbol};
pub use messages::{ClientMessage, ServerMessage};
