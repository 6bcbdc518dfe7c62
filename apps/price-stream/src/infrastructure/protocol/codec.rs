//! JSON Codec
//!
//! Decodes raw client text frames into [`ClientMessage`] and encodes
//! [`ServerMessage`] values. Decoding is done by hand on a
//! `serde_json::Value` so each failure maps to a specific reason that can
//! be echoed back to the client in an error frame.

use serde_json::{Map, Value};

use super::messages::{ClientMessage, ServerMessage};
use crate::domain::pricing::Symbol;

/// Longest accepted symbol.
const MAX_SYMBOL_LEN: usize = 32;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is JSON but not an object.
    #[error("expected a JSON object")]
    NotAnObject,

    /// Object has no string `type` field.
    #[error("missing message type")]
    MissingType,

    /// Unknown message type.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Subscribe/unsubscribe without a string `symbol` field.
    #[error("missing symbol")]
    MissingSymbol,

    /// Symbol is empty, too long or has forbidden characters.
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
}

/// JSON codec for the client protocol.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a client text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object, has an unknown
    /// `type`, or carries an invalid symbol.
    pub fn decode(&self, text: &str) -> Result<ClientMessage, CodecError> {
        let value: Value = serde_json::from_str(text.trim())?;
        let Value::Object(object) = value else {
            return Err(CodecError::NotAnObject);
        };

        let msg_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CodecError::MissingType)?;

        match msg_type {
            "subscribe" => Ok(ClientMessage::Subscribe {
                symbol: symbol_field(&object)?,
            }),
            "unsubscribe" => Ok(ClientMessage::Unsubscribe {
                symbol: symbol_field(&object)?,
            }),
            "ping" => Ok(ClientMessage::Ping),
            other => Err(CodecError::UnknownMessageType(other.to_string())),
        }
    }

    /// Encode a server message to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, message: &ServerMessage) -> Result<String, CodecError> {
        Ok(serde_json::to_string(message)?)
    }
}

fn symbol_field(object: &Map<String, Value>) -> Result<Symbol, CodecError> {
    let raw = object
        .get("symbol")
        .and_then(Value::as_str)
        .ok_or(CodecError::MissingSymbol)?;
    normalize_symbol(raw)
}

/// Trim and upper-case a symbol, rejecting empty or malformed input.
///
/// # Errors
///
/// Returns `CodecError::InvalidSymbol` for empty symbols, symbols longer
/// than 32 characters, or symbols with characters outside
/// `[A-Za-z0-9.-_^=/]`.
pub fn normalize_symbol(raw: &str) -> Result<Symbol, CodecError> {
    let symbol = raw.trim().to_uppercase();

    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '=' | '/'));

    if valid {
        Ok(symbol)
    } else {
        Err(CodecError::InvalidSymbol(raw.to_string()))
    }
}
