//! # Tickstream API
//!
//! REST and WebSocket API for the Tickstream quote server.
//!
//! This crate provides:
//! - REST endpoints for quotes, candles, profiles, news, and search
//! - WebSocket distribution of live quote updates to subscribed clients
//! - The upstream provider client with request-level caching
//! - Rate limiting and request-id middleware
//! - CORS configuration
//!
//! # Architecture
//!
//! The HTTP layer is built on Axum and exposes:
//! - `/api/v1/stocks/*` - Quote, candle, profile, and news lookups
//! - `/api/v1/search/stocks` - Symbol search
//! - `/api/v1/market/status` - Exchange session information
//! - `/api/v1/ws/stocks` - WebSocket endpoint for live quote updates
//! - `/health` - Health check
//!
//! Real-time distribution lives in the [`ws`] module: a single serialized
//! coordinator owns all subscription state, a flush scheduler drains the
//! coalescing update buffer on a fixed interval, and a refresh poller
//! re-fetches every actively subscribed symbol.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::ApiError;
pub use server::ApiServer;
pub use shutdown::ShutdownController;
pub use state::AppState;
pub use ws::{CoordinatorHandle, WsConfig};
