//! API server implementation.
//!
//! This module provides the main server that serves REST and WebSocket
//! traffic.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::routes::create_router;
use crate::state::AppState;

/// API server.
pub struct ApiServer {
    /// Application state
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new API server.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Runs the API server until the shutdown future completes, then
    /// drains in-flight connections.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ApiError> {
        let addr = self.state.config.bind_address();

        let app = create_router(self.state.clone()).layer(TraceLayer::new_for_http());

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| ApiError::Internal(format!("Invalid bind address: {e}")))?;

        let listener = TcpListener::bind(socket_addr)
            .await
            .map_err(|e| ApiError::Internal(format!("Failed to bind to {addr}: {e}")))?;

        info!("API server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ApiError::Internal(format!("Server error: {e}")))?;

        warn!("API server shutting down");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::FinnhubClient;
    use crate::config::ApiConfig;
    use crate::ws::Coordinator;
    use tickstream_core::MemoryCache;

    #[test]
    fn test_api_server_new() {
        let config = ApiConfig::default();
        let cache = Arc::new(MemoryCache::new());
        let provider = Arc::new(FinnhubClient::new(config.provider.clone(), cache).unwrap());
        let (_coordinator, handle) = Coordinator::new(provider.clone());
        let state = Arc::new(AppState::new(config, provider, handle));

        let server = ApiServer::new(state.clone());
        assert!(Arc::ptr_eq(server.state(), &state));
    }
}
