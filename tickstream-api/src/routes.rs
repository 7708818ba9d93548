//! API route definitions.
//!
//! This module defines all API routes and their handlers.

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;
use crate::handlers::{health, stocks};
use crate::middleware::{rate_limit_middleware, request_id_middleware};
use crate::state::AppState;
use crate::ws::ws_handler;

/// Creates the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = build_cors_layer(&state.config.cors);

    // REST routes, rate limited per client
    let rest_routes = Router::new()
        .route("/stocks/quote/{symbol}", get(stocks::get_quote))
        .route("/stocks/quotes/batch", get(stocks::get_batch_quotes))
        .route("/stocks/{symbol}/candles", get(stocks::get_candles))
        .route("/stocks/{symbol}/profile", get(stocks::get_profile))
        .route("/stocks/{symbol}/news", get(stocks::get_news))
        .route("/search/stocks", get(stocks::search_stocks))
        .route("/market/status", get(stocks::get_market_status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // The WebSocket upgrade is exempt from the REST rate limit; connected
    // sessions carry their own inbound flood control
    let ws_routes = Router::new().route("/ws/stocks", get(ws_handler));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", rest_routes.merge(ws_routes))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .with_state(state)
}

/// Builds the CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::new();
    }

    let mut cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age_secs));

    if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    cors
}
