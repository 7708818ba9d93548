//! Per-connection session state and reader/writer tasks.
//!
//! Each connected client gets one reader and one writer task. The reader
//! validates and rate-limits inbound control messages and dispatches
//! subscribe/unsubscribe to the coordinator; it never mutates shared
//! state itself. The writer drains the session's outbound queue,
//! coalescing already-queued messages into a single network write, and
//! sends periodic keepalive pings.

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use tickstream_core::types::Symbol;

use super::config::WsConfig;
use super::coordinator::CoordinatorHandle;
use super::message::{ClientMessage, ServerMessage};

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Generates a new unique session ID.
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the inner ID value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sess-{}", self.0)
    }
}

/// Inbound flood control state.
///
/// Messages arriving closer together than the spacing threshold increment
/// a burst counter; once the counter exceeds the ceiling, further messages
/// in that burst are dropped. A message arriving after the threshold has
/// elapsed resets the counter and re-anchors the window.
#[derive(Debug)]
pub struct InboundRateLimit {
    spacing: Duration,
    burst_limit: u32,
    last_message: Instant,
    burst: u32,
}

impl InboundRateLimit {
    /// Creates flood-control state anchored at the current instant.
    #[must_use]
    pub fn new(spacing: Duration, burst_limit: u32) -> Self {
        Self {
            spacing,
            burst_limit,
            last_message: Instant::now(),
            burst: 0,
        }
    }

    /// Records a message arrival and returns whether it should be
    /// processed.
    pub fn allow(&mut self) -> bool {
        self.allow_at(Instant::now())
    }

    /// Records a message arrival at an explicit instant.
    pub fn allow_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last_message) < self.spacing {
            self.burst += 1;
            if self.burst > self.burst_limit {
                return false;
            }
        } else {
            self.burst = 0;
            self.last_message = now;
        }
        true
    }
}

/// Reads frames from the socket until the connection dies, the peer goes
/// silent past the liveness window, or the coordinator closes the session.
///
/// Malformed payloads are logged and dropped without terminating the
/// connection; oversized frames terminate it.
pub(super) async fn read_pump(
    mut socket: SplitStream<WebSocket>,
    session_id: SessionId,
    queue: mpsc::Sender<ServerMessage>,
    coordinator: CoordinatorHandle,
    config: WsConfig,
    mut closed: watch::Receiver<bool>,
) {
    let mut limiter = InboundRateLimit::new(config.min_message_spacing(), config.burst_limit);

    loop {
        tokio::select! {
            _ = closed.changed() => break,
            next = timeout(config.liveness_timeout(), socket.next()) => {
                match next {
                    Err(_) => {
                        warn!(%session_id, "liveness timeout, closing connection");
                        break;
                    }
                    Ok(None) => break,
                    Ok(Some(Err(e))) => {
                        debug!(%session_id, error = %e, "read error");
                        break;
                    }
                    Ok(Some(Ok(frame))) => {
                        if !handle_frame(
                            frame,
                            session_id,
                            &queue,
                            &coordinator,
                            &config,
                            &mut limiter,
                        ) {
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Processes one inbound frame. Returns false when the connection should
/// be torn down.
fn handle_frame(
    frame: Message,
    session_id: SessionId,
    queue: &mpsc::Sender<ServerMessage>,
    coordinator: &CoordinatorHandle,
    config: &WsConfig,
    limiter: &mut InboundRateLimit,
) -> bool {
    match frame {
        Message::Text(text) => {
            if text.len() > config.max_frame_size {
                warn!(%session_id, size = text.len(), "inbound frame over size limit");
                return false;
            }
            if !limiter.allow() {
                debug!(%session_id, "inbound rate limit exceeded, dropping message");
                return true;
            }
            handle_text_message(text.as_str(), session_id, queue, coordinator);
            true
        }
        Message::Binary(_) => {
            warn!(%session_id, "unexpected binary frame, dropping");
            true
        }
        Message::Ping(_) => {
            // The protocol pong reply is handled by the websocket layer
            debug!(%session_id, "received ping");
            true
        }
        Message::Pong(_) => {
            // Liveness deadline was refreshed by the read itself
            debug!(%session_id, "received pong");
            true
        }
        Message::Close(_) => {
            info!(%session_id, "close requested by peer");
            false
        }
    }
}

/// Parses a control message and dispatches it.
fn handle_text_message(
    text: &str,
    session_id: SessionId,
    queue: &mpsc::Sender<ServerMessage>,
    coordinator: &CoordinatorHandle,
) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(%session_id, error = %e, "failed to parse client message");
            return;
        }
    };

    match msg {
        ClientMessage::Subscribe { symbol } => match Symbol::new(symbol) {
            Ok(symbol) => coordinator.subscribe(session_id, symbol),
            Err(e) => warn!(%session_id, error = %e, "invalid subscribe symbol"),
        },
        ClientMessage::Unsubscribe { symbol } => match Symbol::new(symbol) {
            Ok(symbol) => coordinator.unsubscribe(session_id, symbol),
            Err(e) => warn!(%session_id, error = %e, "invalid unsubscribe symbol"),
        },
        ClientMessage::Ping => {
            let pong = ServerMessage::Pong {
                timestamp: Utc::now(),
            };
            // Queue full means the client is not draining; drop the pong
            let _ = queue.try_send(pong);
        }
    }
}

/// Drains the session's outbound queue to the socket.
///
/// Multiple already-queued messages are joined into a single
/// newline-delimited text frame. Every write runs under the configured
/// deadline; a timed-out or failed write is fatal and unregisters the
/// session.
pub(super) async fn write_pump(
    mut socket: SplitSink<WebSocket, Message>,
    session_id: SessionId,
    mut queue: mpsc::Receiver<ServerMessage>,
    coordinator: CoordinatorHandle,
    config: WsConfig,
    mut closed: watch::Receiver<bool>,
) {
    let mut ping = tokio::time::interval(config.ping_interval());
    // The first interval tick completes immediately
    ping.tick().await;

    loop {
        tokio::select! {
            maybe = queue.recv() => {
                let Some(first) = maybe else {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let Some(mut frame) = encode(&first, session_id) else {
                    continue;
                };
                // Coalesce whatever else is already queued into this write
                while let Ok(next) = queue.try_recv() {
                    if let Some(json) = encode(&next, session_id) {
                        frame.push('\n');
                        frame.push_str(&json);
                    }
                }
                if !send_with_deadline(&mut socket, Message::Text(frame.into()), &config, session_id).await {
                    coordinator.unregister(session_id);
                    break;
                }
            }
            _ = ping.tick() => {
                if !send_with_deadline(&mut socket, Message::Ping(Vec::new().into()), &config, session_id).await {
                    coordinator.unregister(session_id);
                    break;
                }
            }
            _ = closed.changed() => {
                let _ = timeout(config.write_timeout(), socket.send(Message::Close(None))).await;
                break;
            }
        }
    }
}

fn encode(msg: &ServerMessage, session_id: SessionId) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(%session_id, error = %e, "failed to serialize outbound message");
            None
        }
    }
}

async fn send_with_deadline(
    socket: &mut SplitSink<WebSocket, Message>,
    message: Message,
    config: &WsConfig,
    session_id: SessionId,
) -> bool {
    match timeout(config.write_timeout(), socket.send(message)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(%session_id, error = %e, "write error");
            false
        }
        Err(_) => {
            warn!(%session_id, "write deadline exceeded");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_generate_unique() {
        let id1 = SessionId::generate();
        let id2 = SessionId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId(42);
        assert_eq!(format!("{id}"), "sess-42");
    }

    #[test]
    fn test_flood_control_burst_of_fifteen() {
        let mut limiter = InboundRateLimit::new(Duration::from_millis(100), 10);
        let t0 = Instant::now();

        // 15 messages arriving 1ms apart, all inside the spacing window
        let mut processed = 0;
        let mut dropped = 0;
        for i in 1..=15u64 {
            if limiter.allow_at(t0 + Duration::from_millis(i)) {
                processed += 1;
            } else {
                dropped += 1;
            }
        }
        assert_eq!(processed, 10);
        assert_eq!(dropped, 5);
    }

    #[test]
    fn test_flood_control_resets_after_pause() {
        let mut limiter = InboundRateLimit::new(Duration::from_millis(100), 10);
        let t0 = Instant::now();

        for i in 1..=15u64 {
            limiter.allow_at(t0 + Duration::from_millis(i));
        }

        // A message after the spacing threshold resets the burst window
        let t1 = t0 + Duration::from_millis(200);
        assert!(limiter.allow_at(t1));

        // And the window is re-anchored: another burst gets a fresh budget
        let mut processed = 0;
        for i in 1..=12u64 {
            if limiter.allow_at(t1 + Duration::from_millis(i)) {
                processed += 1;
            }
        }
        assert_eq!(processed, 10);
    }

    #[test]
    fn test_flood_control_spaced_messages_all_pass() {
        let mut limiter = InboundRateLimit::new(Duration::from_millis(100), 10);
        let t0 = Instant::now();

        for i in 1..=20u64 {
            assert!(limiter.allow_at(t0 + Duration::from_millis(i * 150)));
        }
    }
}
