//! WebSocket message types.
//!
//! This module defines the message types for WebSocket communication:
//! - Client messages (subscribe, unsubscribe, ping)
//! - Server messages (welcome, quote, pong)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tickstream_core::types::{Quote, Symbol};

/// Client-to-server message types.
///
/// One JSON object per logical message, e.g.
/// `{"type":"subscribe","symbol":"AAPL"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to live updates for a symbol
    Subscribe {
        /// Ticker symbol to subscribe to
        symbol: String,
    },
    /// Unsubscribe from a symbol
    Unsubscribe {
        /// Ticker symbol to unsubscribe from
        symbol: String,
    },
    /// Application-level ping; answered with a pong
    Ping,
}

/// Server-to-client message types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once when a session is registered
    Welcome {
        /// Session metadata
        data: WelcomeData,
        /// Server timestamp
        timestamp: DateTime<Utc>,
    },
    /// A coalesced quote update for a subscribed symbol
    Quote {
        /// Ticker symbol the quote is for
        symbol: Symbol,
        /// Quote payload
        data: Quote,
        /// Server timestamp of the flush
        timestamp: DateTime<Utc>,
    },
    /// Answer to a client ping
    Pong {
        /// Server timestamp
        timestamp: DateTime<Utc>,
    },
}

/// Payload of the welcome message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeData {
    /// Opaque session identifier
    pub session_id: String,
    /// Server time at registration
    pub server_time: DateTime<Utc>,
}
