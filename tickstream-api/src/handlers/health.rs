//! Health check handler.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime_secs: u64,
    /// Distribution core counters
    pub websocket: WebSocketStatus,
}

/// Distribution core counters.
#[derive(Debug, Serialize)]
pub struct WebSocketStatus {
    /// Connected sessions
    pub sessions: usize,
    /// Total active subscriptions
    pub subscriptions: usize,
}

/// Health check handler.
///
/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.coordinator.stats().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime().as_secs(),
        websocket: WebSocketStatus {
            sessions: stats.sessions,
            subscriptions: stats.subscriptions,
        },
    })
}
