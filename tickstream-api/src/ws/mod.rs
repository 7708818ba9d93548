//! Real-time quote distribution over WebSocket.
//!
//! This module is the distribution core of the server:
//! - Per-session reader/writer tasks with inbound flood control
//! - A single serialized coordinator owning all subscription state
//! - A coalescing update buffer flushed on a fixed interval
//! - A refresh poller re-fetching every actively subscribed symbol
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Distribution Core                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌───────────┐              │
//! │  │ Session 1 │   │ Session 2 │   │ Session 3 │   ...        │
//! │  │ rd ─┐ wr ▲│   │ rd ─┐ wr ▲│   │ rd ─┐ wr ▲│              │
//! │  └─────│────│┘   └─────│────│┘   └─────│────│┘              │
//! │        │    └ outbound │queues ◄───────│────┘               │
//! │        ▼               ▼               ▼                    │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                  Coordinator (actor)                 │   │
//! │  │  session registry · subscription index · buffer      │   │
//! │  └──────▲─────────────────▲──────────────────▲──────────┘   │
//! │         │ flush           │ stage            │ stage        │
//! │  ┌──────┴──────┐   ┌──────┴───────┐   ┌──────┴───────┐      │
//! │  │ Flush timer │   │ Refresh poll │   │ One-shot     │      │
//! │  │   (500ms)   │   │     (2s)     │   │ subscribe    │      │
//! │  └─────────────┘   └──────┬───────┘   │ fetch        │      │
//! │                           ▼           └──────┬───────┘      │
//! │                    ┌─────────────────────────┴─────┐        │
//! │                    │        Quote Provider         │        │
//! │                    └───────────────────────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! Clients send one JSON object per message:
//! `{"type":"subscribe","symbol":"AAPL"}`,
//! `{"type":"unsubscribe","symbol":"AAPL"}`, or `{"type":"ping"}`.
//! The server answers with `welcome` (once, at registration), `quote`
//! (per flush, per subscribed symbol), and `pong`.
//!
//! # Guarantees
//!
//! Only the latest value per symbol per flush interval is delivered;
//! intermediate ticks staged and overwritten between flushes are never
//! observed. Messages enqueued to one session are delivered in order.
//! A session that cannot drain its queue is disconnected rather than
//! buffered without bound, and never delays delivery to other sessions.

pub mod config;
pub mod coordinator;
pub mod handler;
pub mod message;
pub mod scheduler;
pub mod session;
pub mod subscriptions;

pub use config::WsConfig;
pub use coordinator::{Coordinator, CoordinatorHandle, HubStats, SessionEntry, UpdateBuffer};
pub use handler::ws_handler;
pub use message::{ClientMessage, ServerMessage, WelcomeData};
pub use scheduler::{spawn_flush_scheduler, spawn_refresh_poller};
pub use session::{InboundRateLimit, SessionId};
pub use subscriptions::SubscriptionIndex;
