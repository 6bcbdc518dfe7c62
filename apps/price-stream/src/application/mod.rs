//! Application Layer - Use cases and port definitions.
//!
//! Services here drive the domain (generator, cache, registry) and push
//! results out through the ports implemented by infrastructure adapters.

/// Port interfaces for outbound delivery.
pub mod ports;

/// Application services: broadcast loop and quote lookups.
pub mod services;
