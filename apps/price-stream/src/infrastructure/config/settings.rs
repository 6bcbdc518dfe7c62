//! Service Configuration Settings
//!
//! Configuration types for the price stream, loaded from environment
//! variables. Unparseable values fall back to their defaults; values that
//! parse but make no sense (zero intervals, negative volatility) are
//! rejected with [`ConfigError`].

use std::time::Duration;

use rust_decimal::Decimal;

use crate::domain::pricing::{DEFAULT_CACHE_CAPACITY, GeneratorConfig, MarketStatus};

/// Server settings.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    /// Port serving WebSocket, REST, health and metrics.
    pub port: u16,
    /// Most symbols a single REST request may name.
    pub max_symbols_per_request: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 5001,
            max_symbols_per_request: 100,
        }
    }
}

/// Broadcast loop settings.
#[derive(Debug, Clone)]
pub struct BroadcastSettings {
    /// Period between broadcast cycles.
    pub interval: Duration,
    /// Maximum time a single outbound send may wait.
    pub send_timeout: Duration,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            send_timeout: Duration::from_secs(2),
        }
    }
}

/// Client connection settings.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
    /// Interval between WebSocket ping frames.
    pub heartbeat_interval: Duration,
    /// Silence after which a client is considered dead.
    pub heartbeat_timeout: Duration,
    /// Status announced to clients on connect.
    pub market_status: MarketStatus,
    /// Most symbols one connection may hold.
    pub max_subscriptions: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
            market_status: MarketStatus::Open,
            max_subscriptions: 50,
        }
    }
}

/// Latest-price cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Distinct symbols kept before the least recently stored is evicted.
    pub capacity: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Price generator settings.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Maximum relative move per tick.
    pub volatility: f64,
    /// Lowest price a tick can reach.
    pub price_floor: Decimal,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        let config = GeneratorConfig::default();
        Self {
            volatility: config.volatility,
            price_floor: config.price_floor,
        }
    }
}

impl From<&GeneratorSettings> for GeneratorConfig {
    fn from(settings: &GeneratorSettings) -> Self {
        Self {
            volatility: settings.volatility,
            price_floor: settings.price_floor,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Server settings.
    pub server: ServerSettings,
    /// Broadcast loop settings.
    pub broadcast: BroadcastSettings,
    /// Client connection settings.
    pub gateway: GatewaySettings,
    /// Price generator settings.
    pub generator: GeneratorSettings,
    /// Latest-price cache settings.
    pub cache: CacheSettings,
}

impl ServiceConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of its valid range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of its valid range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let defaults = Self::default();

        let server = ServerSettings {
            port: env.parse("PORT", defaults.server.port),
            max_symbols_per_request: env.parse(
                "PRICE_STREAM_MAX_SYMBOLS_PER_REQUEST",
                defaults.server.max_symbols_per_request,
            ),
        };

        let broadcast = BroadcastSettings {
            interval: env.duration_millis(
                "PRICE_STREAM_BROADCAST_INTERVAL_MS",
                defaults.broadcast.interval,
            ),
            send_timeout: env.duration_millis(
                "PRICE_STREAM_SEND_TIMEOUT_MS",
                defaults.broadcast.send_timeout,
            ),
        };

        let gateway = GatewaySettings {
            outbound_capacity: env.parse(
                "PRICE_STREAM_OUTBOUND_CAPACITY",
                defaults.gateway.outbound_capacity,
            ),
            heartbeat_interval: env.duration_secs(
                "PRICE_STREAM_HEARTBEAT_INTERVAL_SECS",
                defaults.gateway.heartbeat_interval,
            ),
            heartbeat_timeout: env.duration_secs(
                "PRICE_STREAM_HEARTBEAT_TIMEOUT_SECS",
                defaults.gateway.heartbeat_timeout,
            ),
            market_status: env
                .raw("MARKET_STATUS")
                .map_or(defaults.gateway.market_status, |s| {
                    MarketStatus::from_str_case_insensitive(&s)
                }),
            max_subscriptions: env.parse(
                "PRICE_STREAM_MAX_SUBSCRIPTIONS_PER_CONNECTION",
                defaults.gateway.max_subscriptions,
            ),
        };

        let generator = GeneratorSettings {
            volatility: env.parse("PRICE_STREAM_VOLATILITY", defaults.generator.volatility),
            price_floor: env.parse("PRICE_STREAM_PRICE_FLOOR", defaults.generator.price_floor),
        };

        let cache = CacheSettings {
            capacity: env.parse("PRICE_STREAM_CACHE_CAPACITY", defaults.cache.capacity),
        };

        let config = Self {
            server,
            broadcast,
            gateway,
            generator,
            cache,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_symbols_per_request == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_MAX_SYMBOLS_PER_REQUEST",
                reason: "must be greater than zero",
            });
        }
        if self.broadcast.interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_BROADCAST_INTERVAL_MS",
                reason: "must be greater than zero",
            });
        }
        if self.broadcast.send_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_SEND_TIMEOUT_MS",
                reason: "must be greater than zero",
            });
        }
        if self.gateway.outbound_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_OUTBOUND_CAPACITY",
                reason: "must be greater than zero",
            });
        }
        if self.gateway.heartbeat_interval.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_HEARTBEAT_INTERVAL_SECS",
                reason: "must be greater than zero",
            });
        }
        if self.gateway.heartbeat_timeout <= self.gateway.heartbeat_interval {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_HEARTBEAT_TIMEOUT_SECS",
                reason: "must exceed the heartbeat interval",
            });
        }
        if self.gateway.max_subscriptions == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_MAX_SUBSCRIPTIONS_PER_CONNECTION",
                reason: "must be greater than zero",
            });
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_CACHE_CAPACITY",
                reason: "must be greater than zero",
            });
        }
        if !(0.0..1.0).contains(&self.generator.volatility) {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_VOLATILITY",
                reason: "must be in [0, 1)",
            });
        }
        if self.generator.price_floor <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                key: "PRICE_STREAM_PRICE_FLOOR",
                reason: "must be positive",
            });
        }
        Ok(())
    }

    /// Generator configuration derived from the settings.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::from(&self.generator)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Value parsed but is outside its valid range.
    #[error("invalid value for {key}: {reason}")]
    OutOfRange {
        /// Environment variable name.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.raw(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.raw(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.raw(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}
