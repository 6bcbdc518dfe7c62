//! Application Services
//!
//! - `Broadcaster`: periodic tick generation and fan-out to subscribers
//! - `QuoteService`: on-demand prices and history for the REST facade

mod broadcaster;
mod quote_service;

pub use broadcaster::{Broadcaster, CycleReport};
pub use quote_service::QuoteService;
