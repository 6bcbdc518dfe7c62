//! Service wiring.
//!
//! Builds the shared components once and hands `Arc`s to the broadcast
//! loop, the gateway and the REST facade.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::ports::MessageSink;
use crate::application::services::{Broadcaster, QuoteService};
use crate::domain::pricing::{PriceCache, PriceGenerator};
use crate::domain::subscription::SubscriptionRegistry;
use crate::infrastructure::config::ServiceConfig;
use crate::infrastructure::gateway::{ConnectionGateway, ConnectionTable};
use crate::infrastructure::http::{AppState, HttpServer, ServerError, create_router, serve};

/// The assembled price stream service.
#[derive(Debug)]
pub struct PriceStream {
    config: ServiceConfig,
    registry: Arc<SubscriptionRegistry>,
    cache: Arc<PriceCache>,
    connections: Arc<ConnectionTable>,
    broadcaster: Arc<Broadcaster>,
    state: AppState,
}

impl PriceStream {
    /// Build all components from configuration.
    #[must_use]
    pub fn new(config: ServiceConfig) -> Self {
        let generator = Arc::new(PriceGenerator::new(config.generator_config()));
        Self::with_generator(config, generator)
    }

    /// Build all components around a given generator.
    #[must_use]
    pub fn with_generator(config: ServiceConfig, generator: Arc<PriceGenerator>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let cache = Arc::new(PriceCache::with_capacity(config.cache.capacity));
        let connections = Arc::new(ConnectionTable::new(config.broadcast.send_timeout));

        let broadcaster = Arc::new(Broadcaster::new(
            Arc::clone(&generator),
            Arc::clone(&cache),
            Arc::clone(&registry),
            Arc::clone(&connections) as Arc<dyn MessageSink>,
            config.broadcast.interval,
        ));

        let gateway = Arc::new(ConnectionGateway::new(
            Arc::clone(&registry),
            Arc::clone(&cache),
            Arc::clone(&connections),
            config.gateway.clone(),
        ));

        let quotes = Arc::new(QuoteService::new(
            generator,
            Arc::clone(&cache),
            config.gateway.market_status,
        ));

        let state = AppState::new(gateway, quotes, config.server);

        Self {
            config,
            registry,
            cache,
            connections,
            broadcaster,
            state,
        }
    }

    /// Subscription registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Last-tick cache.
    #[must_use]
    pub const fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Router over this service's state, without the broadcast loop.
    #[must_use]
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the configured port and run until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if binding fails or the server stops with an
    /// error.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ServerError> {
        let background = self.spawn_background(&cancel);
        let server = HttpServer::new(self.config.server.port, self.state, cancel.clone());

        let result = server.run().await;
        cancel.cancel();
        let _ = background.await;
        result
    }

    /// Run on an already-bound listener until `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns `ServerError` if the server stops with an error.
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) -> Result<(), ServerError> {
        let background = self.spawn_background(&cancel);

        let result = serve(listener, self.state, cancel.clone()).await;
        cancel.cancel();
        let _ = background.await;
        result
    }

    /// Run the broadcast loop, then close every client socket once cancelled.
    fn spawn_background(&self, cancel: &CancellationToken) -> tokio::task::JoinHandle<()> {
        let broadcaster = Arc::clone(&self.broadcaster);
        let connections = Arc::clone(&self.connections);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            broadcaster.run(cancel).await;
            let closed = connections.close_all();
            tracing::info!(closed, "Closed client connections");
        })
    }
}
