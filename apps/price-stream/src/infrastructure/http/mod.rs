//! HTTP Facade
//!
//! One axum router serves the WebSocket upgrade, the REST endpoints and the
//! operational endpoints (`/healthz`, `/metrics`).

mod routes;
mod server;

pub use routes::{ApiError, AppState, create_router};
pub use server::{HttpServer, ServerError, serve};
