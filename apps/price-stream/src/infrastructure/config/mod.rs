//! Configuration Module
//!
//! Configuration loading for the price stream service.

mod settings;

pub use settings::{
    BroadcastSettings, CacheSettings, ConfigError, GatewaySettings, GeneratorSettings,
    ServerSettings, ServiceConfig,
};
