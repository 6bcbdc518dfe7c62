//! Market open/closed status.

use serde::{Deserialize, Serialize};

/// Whether the simulated market is trading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    /// Market is open.
    #[default]
    Open,
    /// Market is closed.
    Closed,
}

impl MarketStatus {
    /// Parse status from string; anything but `closed` means open.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "closed" => Self::Closed,
            _ => Self::Open,
        }
    }

    /// Status name as sent on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing() {
        assert_eq!(MarketStatus::from_str_case_insensitive("CLOSED"), MarketStatus::Closed);
        assert_eq!(MarketStatus::from_str_case_insensitive("open"), MarketStatus::Open);
        assert_eq!(MarketStatus::from_str_case_insensitive("bogus"), MarketStatus::Open);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MarketStatus::Closed).unwrap(), "\"closed\"");
    }
}
