//! REST and WebSocket routes.
//!
//! # Endpoints
//!
//! - `GET /` - WebSocket upgrade, or a plain status document
//! - `GET /ws` - WebSocket upgrade
//! - `POST /api/stocks/prices` - fresh quotes for `{"symbols":[...]}`
//! - `GET /api/market/status` - configured market status
//! - `GET /api/market/news` - canned headlines with keyword impact
//! - `GET /api/health` - service health with port
//! - `GET /api/gold/prices` - fresh quotes for the four metals
//! - `GET /api/gold/historical/{symbol}?period=1M` - synthetic daily candles
//! - `GET /api/gold/analysis/{symbol}` - trend and volatility over a month
//! - `POST /api/portfolio/performance` - value `{"portfolio":[...]}` holdings
//! - `GET /healthz` - liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{FromRef, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::application::services::QuoteService;
use crate::domain::news::{self, NewsItem};
use crate::domain::portfolio::{Holding, PortfolioPerformance};
use crate::domain::pricing::{Analysis, Candle, CandlePeriod, MarketStatus, Quote, Symbol};
use crate::infrastructure::config::ServerSettings;
use crate::infrastructure::gateway::{ConnectionGateway, ws_handler};
use crate::infrastructure::metrics::get_metrics_handle;
use crate::infrastructure::protocol::normalize_symbol;

// =============================================================================
// State
// =============================================================================

/// Shared state for all routes.
#[derive(Debug, Clone)]
pub struct AppState {
    gateway: Arc<ConnectionGateway>,
    quotes: Arc<QuoteService>,
    server: ServerSettings,
}

impl AppState {
    /// Create router state.
    #[must_use]
    pub const fn new(
        gateway: Arc<ConnectionGateway>,
        quotes: Arc<QuoteService>,
        server: ServerSettings,
    ) -> Self {
        Self {
            gateway,
            quotes,
            server,
        }
    }

    fn check_request_size(&self, count: usize) -> Result<(), ApiError> {
        let limit = self.server.max_symbols_per_request;
        if count > limit {
            return Err(ApiError::bad_request(format!(
                "too many symbols: {count} exceeds the limit of {limit}"
            )));
        }
        Ok(())
    }
}

impl FromRef<AppState> for Arc<ConnectionGateway> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.gateway)
    }
}

/// Create the axum router with all endpoints.
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_handler))
        .route("/api/stocks/prices", post(stock_prices_handler))
        .route("/api/market/status", get(market_status_handler))
        .route("/api/market/news", get(news_handler))
        .route("/api/health", get(health_handler))
        .route("/api/gold/prices", get(metal_prices_handler))
        .route("/api/gold/historical/{symbol}", get(history_handler))
        .route("/api/gold/analysis/{symbol}", get(analysis_handler))
        .route("/api/portfolio/performance", post(portfolio_handler))
        .route("/healthz", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// Response Types
// =============================================================================

/// Body of `GET /` without an upgrade.
#[derive(Debug, Serialize)]
pub struct RootResponse {
    /// Banner.
    pub message: &'static str,
    /// Always "healthy".
    pub status: &'static str,
}

/// Request for `POST /api/stocks/prices`.
#[derive(Debug, Deserialize)]
pub struct PricesRequest {
    /// Requested symbols; missing means none.
    #[serde(default)]
    pub symbols: Vec<String>,
}

/// Response for `POST /api/stocks/prices`.
#[derive(Debug, Serialize)]
pub struct PricesResponse {
    /// Always true.
    pub success: bool,
    /// One quote per requested symbol.
    pub prices: Vec<Quote>,
}

/// Response for `GET /api/market/status`.
#[derive(Debug, Serialize)]
pub struct MarketStatusResponse {
    /// Always true.
    pub success: bool,
    /// Configured status.
    pub status: MarketStatus,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

/// Response for `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always true.
    pub success: bool,
    /// Always "healthy".
    pub status: &'static str,
    /// Server time.
    pub timestamp: DateTime<Utc>,
    /// Configured listening port.
    pub port: u16,
}

/// Response for `GET /api/gold/prices`.
#[derive(Debug, Serialize)]
pub struct MetalPricesResponse {
    /// Always true.
    pub success: bool,
    /// One quote per metal.
    pub data: Vec<Quote>,
    /// Server time.
    pub timestamp: DateTime<Utc>,
}

/// Query for `GET /api/gold/historical/{symbol}`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Period code; missing means one month, unknown means one year.
    pub period: Option<String>,
}

/// Response for `GET /api/gold/historical/{symbol}`.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// Always true.
    pub success: bool,
    /// Normalized symbol.
    pub symbol: Symbol,
    /// Resolved period code.
    pub period: &'static str,
    /// One candle per day.
    pub data: Vec<Candle>,
}

/// Response for `GET /api/gold/analysis/{symbol}`.
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    /// Always true.
    pub success: bool,
    /// Analysis of the last month.
    pub data: Analysis,
}

/// Request for `POST /api/portfolio/performance`.
#[derive(Debug, Deserialize)]
pub struct PortfolioRequest {
    /// Holdings to value.
    pub portfolio: Vec<Holding>,
}

/// Response for `POST /api/portfolio/performance`.
#[derive(Debug, Serialize)]
pub struct PortfolioResponse {
    /// Always true.
    pub success: bool,
    /// Per-holding rows and totals.
    pub performance: PortfolioPerformance,
}

/// Response for `GET /api/market/news`.
#[derive(Debug, Serialize)]
pub struct NewsResponse {
    /// Always true.
    pub success: bool,
    /// Newest first.
    pub news: Vec<NewsItem>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn root_handler(
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match upgrade {
        Ok(ws) => ws_handler(ws, State(Arc::clone(&state.gateway))).await,
        Err(_) => Json(RootResponse {
            message: "Real-time stock server is running",
            status: "healthy",
        })
        .into_response(),
    }
}

async fn stock_prices_handler(
    State(state): State<AppState>,
    payload: Result<Json<PricesRequest>, JsonRejection>,
) -> Result<Json<PricesResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    state.check_request_size(request.symbols.len())?;

    let symbols = request
        .symbols
        .iter()
        .map(|raw| normalize_symbol(raw))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    tracing::debug!(count = symbols.len(), "Price lookup");

    Ok(Json(PricesResponse {
        success: true,
        prices: state.quotes.current_prices(&symbols),
    }))
}

async fn market_status_handler(State(state): State<AppState>) -> Json<MarketStatusResponse> {
    Json(MarketStatusResponse {
        success: true,
        status: state.quotes.market_status(),
        timestamp: Utc::now(),
    })
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        success: true,
        status: "healthy",
        timestamp: Utc::now(),
        port: state.server.port,
    })
}

async fn metal_prices_handler(State(state): State<AppState>) -> Json<MetalPricesResponse> {
    Json(MetalPricesResponse {
        success: true,
        data: state.quotes.metal_prices(),
        timestamp: Utc::now(),
    })
}

async fn history_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let symbol = normalize_symbol(&symbol).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let period = query
        .period
        .as_deref()
        .map_or(CandlePeriod::OneMonth, CandlePeriod::from_code);

    let data = state
        .quotes
        .history(&symbol, period, Utc::now().date_naive());

    Ok(Json(HistoryResponse {
        success: true,
        symbol,
        period: period.code(),
        data,
    }))
}

async fn analysis_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let symbol = normalize_symbol(&symbol).map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(AnalysisResponse {
        success: true,
        data: state.quotes.analysis(&symbol, Utc::now().date_naive()),
    }))
}

async fn portfolio_handler(
    State(state): State<AppState>,
    payload: Result<Json<PortfolioRequest>, JsonRejection>,
) -> Result<Json<PortfolioResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    state.check_request_size(request.portfolio.len())?;

    let holdings = request
        .portfolio
        .into_iter()
        .map(|holding| {
            if holding.shares < Decimal::ZERO || holding.amount_invested < Decimal::ZERO {
                return Err(ApiError::bad_request(format!(
                    "holding {} has a negative amount",
                    holding.symbol
                )));
            }
            let symbol = normalize_symbol(&holding.symbol)
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            Ok(Holding { symbol, ..holding })
        })
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(count = holdings.len(), "Portfolio valuation");

    Ok(Json(PortfolioResponse {
        success: true,
        performance: state.quotes.portfolio_performance(&holdings, Utc::now()),
    }))
}

async fn news_handler() -> Json<NewsResponse> {
    Json(NewsResponse {
        success: true,
        news: news::market_news(Utc::now()),
    })
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// Error body: `{"success":false,"error":"..."}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

/// API error mapped to an HTTP status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, error = %self.message, "Request rejected");
        (
            self.status,
            Json(ErrorBody {
                success: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::pricing::{GeneratorConfig, PriceCache, PriceGenerator};
    use crate::domain::subscription::SubscriptionRegistry;
    use crate::infrastructure::config::{GatewaySettings, ServerSettings};
    use crate::infrastructure::gateway::ConnectionTable;

    fn make_state() -> AppState {
        make_state_with(ServerSettings::default())
    }

    fn make_state_with(server: ServerSettings) -> AppState {
        let cache = Arc::new(PriceCache::new());
        let generator = Arc::new(PriceGenerator::seeded(GeneratorConfig::default(), 1));
        let gateway = Arc::new(ConnectionGateway::new(
            Arc::new(SubscriptionRegistry::new()),
            Arc::clone(&cache),
            Arc::new(ConnectionTable::new(Duration::from_secs(1))),
            GatewaySettings::default(),
        ));
        let quotes = Arc::new(QuoteService::new(generator, cache, MarketStatus::Open));
        AppState::new(gateway, quotes, server)
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        send_to(make_state(), request).await
    }

    async fn send_to(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn prices_for_requested_symbols() {
        let (status, body) = send(post_json(
            "/api/stocks/prices",
            r#"{"symbols":["AAPL","GOOGL"]}"#,
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let prices = body["prices"].as_array().unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0]["symbol"], "AAPL");
        assert_eq!(prices[1]["symbol"], "GOOGL");
        assert!(prices.iter().all(|p| p["price"].as_f64().unwrap() > 0.0));
        assert!(prices[0]["changePercent"].is_number());
        assert!(prices[0]["timestamp"].is_string());
        for field in ["high", "low", "open", "previousClose"] {
            assert!(prices[0][field].is_number(), "missing {field}");
        }
        let price = prices[0]["price"].as_f64().unwrap();
        assert!(prices[0]["high"].as_f64().unwrap() >= price);
        assert!(prices[0]["low"].as_f64().unwrap() <= price);
    }

    #[tokio::test]
    async fn request_over_symbol_cap_is_bad_request() {
        let state = make_state_with(ServerSettings {
            max_symbols_per_request: 2,
            ..ServerSettings::default()
        });

        let (status, body) = send_to(
            state.clone(),
            post_json("/api/stocks/prices", r#"{"symbols":["A","B","C"]}"#),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("limit of 2"));

        let (status, _) = send_to(state, post_json("/api/stocks/prices", r#"{"symbols":["A","B"]}"#)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_symbol_list_is_not_an_error() {
        let (status, body) = send(post_json("/api/stocks/prices", r#"{"symbols":[]}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prices"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, body) = send(post_json("/api/stocks/prices", "{oops")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn invalid_symbol_is_bad_request() {
        let (status, body) = send(post_json("/api/stocks/prices", r#"{"symbols":["AA PL"]}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn market_status() {
        let (status, body) = send(get("/api/market/status")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "open");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn root_without_upgrade_is_status_document() {
        let (status, body) = send(get("/")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Real-time stock server is running");
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn api_health_reports_port() {
        let (status, body) = send(get("/api/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["port"], 5001);
    }

    #[tokio::test]
    async fn metal_prices() {
        let (status, body) = send(get("/api/gold/prices")).await;

        assert_eq!(status, StatusCode::OK);
        let symbols: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["symbol"].as_str().unwrap())
            .collect();
        assert_eq!(symbols, vec!["XAU", "XAG", "XPT", "XPD"]);
    }

    #[tokio::test]
    async fn history_respects_period() {
        let (status, body) = send(get("/api/gold/historical/xau?period=1W")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["symbol"], "XAU");
        assert_eq!(body["period"], "1W");
        assert_eq!(body["data"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn history_unknown_period_is_one_year() {
        let (_, body) = send(get("/api/gold/historical/XAG?period=10Y")).await;

        assert_eq!(body["period"], "1Y");
        assert_eq!(body["data"].as_array().unwrap().len(), 366);
    }

    #[tokio::test]
    async fn analysis_for_symbol() {
        let (status, body) = send(get("/api/gold/analysis/xau")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["symbol"], "XAU");
        assert!(["bullish", "bearish", "neutral"].contains(&data["trend"].as_str().unwrap()));
        assert!(data["support"].as_f64().unwrap() <= data["resistance"].as_f64().unwrap());
        let confidence = data["confidence"].as_u64().unwrap();
        assert!((70..100).contains(&confidence));
        assert!(data["prediction"].is_string());
        assert!(data["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn portfolio_performance_totals_holdings() {
        let (status, body) = send(post_json(
            "/api/portfolio/performance",
            r#"{"portfolio":[{"symbol":"aapl","shares":10,"amountInvested":1500},{"symbol":"TSLA","shares":2,"amountInvested":0}]}"#,
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        let rows = body["performance"]["performance"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["symbol"], "AAPL");
        assert_eq!(rows[1]["returnPercent"], 0.0);
        let summary = &body["performance"]["summary"];
        assert_eq!(summary["totalInvested"], 1500.0);
        assert!(summary["totalCurrentValue"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn portfolio_rejects_missing_list_and_negative_amounts() {
        let (status, _) = send(post_json("/api/portfolio/performance", "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(post_json(
            "/api/portfolio/performance",
            r#"{"portfolio":[{"symbol":"AAPL","shares":-1,"amountInvested":10}]}"#,
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn market_news_is_scored() {
        let (status, body) = send(get("/api/market/news")).await;

        assert_eq!(status, StatusCode::OK);
        let news = body["news"].as_array().unwrap();
        assert_eq!(news.len(), 3);
        let impacts: Vec<&str> = news.iter().map(|n| n["impact"].as_str().unwrap()).collect();
        assert_eq!(impacts, vec!["positive", "neutral", "negative"]);
        assert!(news[0]["publishedAt"].is_string());
    }

    #[tokio::test]
    async fn liveness() {
        let response = create_router(make_state())
            .oneshot(get("/healthz"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ws_route_rejects_plain_get() {
        let response = create_router(make_state()).oneshot(get("/ws")).await.unwrap();

        assert!(response.status().is_client_error());
    }
}
