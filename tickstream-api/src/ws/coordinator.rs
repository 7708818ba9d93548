//! The coordinator: single serialized owner of distribution state.
//!
//! All mutation of the session registry, the subscription index, and the
//! update buffer happens inside one command-processing loop. Session
//! tasks, schedulers, and fetch tasks communicate with it exclusively
//! through [`CoordinatorHandle`]; nothing else ever touches the maps.
//! Enqueueing to a session's outbound queue is non-blocking: a full queue
//! marks the session as a slow consumer and disconnects it.

use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use tickstream_core::source::QuoteSource;
use tickstream_core::types::{Quote, Symbol};

use super::message::{ServerMessage, WelcomeData};
use super::session::SessionId;
use super::subscriptions::SubscriptionIndex;

/// Coalescing staging area for quotes awaiting the next flush.
///
/// At most one entry per symbol: staging a quote for an already-buffered
/// symbol overwrites it (last write wins).
#[derive(Debug, Default)]
pub struct UpdateBuffer {
    entries: HashMap<Symbol, Quote>,
}

impl UpdateBuffer {
    /// Stages a quote, overwriting any pending quote for the same symbol.
    pub fn stage(&mut self, quote: Quote) {
        self.entries.insert(quote.symbol.clone(), quote);
    }

    /// Atomically takes all staged quotes, leaving the buffer empty.
    pub fn drain(&mut self) -> HashMap<Symbol, Quote> {
        std::mem::take(&mut self.entries)
    }

    /// Number of staged symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A session's registry record: its outbound queue plus the close signal
/// the coordinator fires exactly once on unregister.
#[derive(Debug)]
pub struct SessionEntry {
    /// Session identifier
    pub id: SessionId,
    /// Bounded outbound queue; enqueue-only for everyone but the writer
    pub queue: mpsc::Sender<ServerMessage>,
    /// Close signal observed by the session's reader and writer
    pub closed: watch::Sender<bool>,
}

/// Point-in-time counters for the health endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct HubStats {
    /// Connected sessions
    pub sessions: usize,
    /// Total (session, symbol) subscription pairs
    pub subscriptions: usize,
}

/// Commands processed one at a time by the coordinator.
#[derive(Debug)]
enum Command {
    Register(SessionEntry),
    Unregister(SessionId),
    Subscribe(SessionId, Symbol),
    Unsubscribe(SessionId, Symbol),
    StageQuote(Quote),
    FetchDone(Symbol),
    Flush,
    ActiveSymbols(oneshot::Sender<Vec<Symbol>>),
    Stats(oneshot::Sender<HubStats>),
    Shutdown,
}

/// Cloneable handle for submitting commands to the coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CoordinatorHandle {
    /// Registers a session. Never fails; after shutdown the session's
    /// close signal fires instead of a welcome.
    pub fn register(&self, entry: SessionEntry) {
        let _ = self.tx.send(Command::Register(entry));
    }

    /// Unregisters a session, removing it from every subscription.
    /// Idempotent.
    pub fn unregister(&self, id: SessionId) {
        let _ = self.tx.send(Command::Unregister(id));
    }

    /// Subscribes a session to a symbol. Idempotent.
    pub fn subscribe(&self, id: SessionId, symbol: Symbol) {
        let _ = self.tx.send(Command::Subscribe(id, symbol));
    }

    /// Unsubscribes a session from a symbol. Idempotent.
    pub fn unsubscribe(&self, id: SessionId, symbol: Symbol) {
        let _ = self.tx.send(Command::Unsubscribe(id, symbol));
    }

    /// Stages a quote into the update buffer (coalescing overwrite).
    pub fn stage_quote(&self, quote: Quote) {
        let _ = self.tx.send(Command::StageQuote(quote));
    }

    /// Drains the update buffer and fans staged quotes out to subscribers.
    pub fn flush(&self) {
        let _ = self.tx.send(Command::Flush);
    }

    /// Returns every symbol with at least one subscriber.
    pub async fn active_symbols(&self) -> Vec<Symbol> {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::ActiveSymbols(reply)).is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Returns connection and subscription counters.
    pub async fn stats(&self) -> HubStats {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Stats(reply)).is_err() {
            return HubStats::default();
        }
        rx.await.unwrap_or_default()
    }

    /// Initiates shutdown: closes every session's outbound queue and
    /// refuses further registrations.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }

    fn fetch_done(&self, symbol: Symbol) {
        let _ = self.tx.send(Command::FetchDone(symbol));
    }
}

/// The coordinator actor.
///
/// Created once at startup and driven by [`Coordinator::run`] for the
/// process's lifetime.
pub struct Coordinator {
    rx: mpsc::UnboundedReceiver<Command>,
    handle: CoordinatorHandle,
    source: Arc<dyn QuoteSource>,
    sessions: HashMap<SessionId, SessionEntry>,
    index: SubscriptionIndex,
    buffer: UpdateBuffer,
    /// Symbols with a subscribe-triggered fetch currently in flight
    in_flight: HashSet<Symbol>,
    shutting_down: bool,
}

impl Coordinator {
    /// Creates a coordinator and its command handle.
    #[must_use]
    pub fn new(source: Arc<dyn QuoteSource>) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = CoordinatorHandle { tx };
        let coordinator = Self {
            rx,
            handle: handle.clone(),
            source,
            sessions: HashMap::new(),
            index: SubscriptionIndex::new(),
            buffer: UpdateBuffer::default(),
            in_flight: HashSet::new(),
            shutting_down: false,
        };
        (coordinator, handle)
    }

    /// Processes commands until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            self.handle_command(command);
        }
        debug!("coordinator loop ended");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Register(entry) => self.register(entry),
            Command::Unregister(id) => self.unregister(id),
            Command::Subscribe(id, symbol) => self.subscribe(id, symbol),
            Command::Unsubscribe(id, symbol) => self.unsubscribe(id, &symbol),
            Command::StageQuote(quote) => self.buffer.stage(quote),
            Command::FetchDone(symbol) => {
                self.in_flight.remove(&symbol);
            }
            Command::Flush => self.flush(),
            Command::ActiveSymbols(reply) => {
                let _ = reply.send(self.index.active_symbols());
            }
            Command::Stats(reply) => {
                let _ = reply.send(HubStats {
                    sessions: self.sessions.len(),
                    subscriptions: self.index.subscription_count(),
                });
            }
            Command::Shutdown => self.shutdown(),
        }
    }

    fn register(&mut self, entry: SessionEntry) {
        if self.shutting_down {
            let _ = entry.closed.send(true);
            return;
        }

        let id = entry.id;
        let welcome = ServerMessage::Welcome {
            data: WelcomeData {
                session_id: id.to_string(),
                server_time: Utc::now(),
            },
            timestamp: Utc::now(),
        };
        if entry.queue.try_send(welcome).is_err() {
            let _ = entry.closed.send(true);
            return;
        }

        self.sessions.insert(id, entry);
        info!(%id, total = self.sessions.len(), "session connected");
    }

    fn unregister(&mut self, id: SessionId) {
        // Second unregister for the same session is a no-op
        let Some(entry) = self.sessions.remove(&id) else {
            return;
        };
        self.index.remove_session(id);
        let _ = entry.closed.send(true);
        info!(%id, total = self.sessions.len(), "session disconnected");
    }

    fn subscribe(&mut self, id: SessionId, symbol: Symbol) {
        if !self.sessions.contains_key(&id) {
            return;
        }
        if !self.index.subscribe(id, symbol.clone()) {
            return;
        }
        debug!(%id, %symbol, "subscribed");

        // One-shot fetch so the subscriber sees a price on the next flush,
        // single-flight per symbol to keep subscribe churn from spawning a
        // fetch storm
        if self.in_flight.insert(symbol.clone()) {
            let source = Arc::clone(&self.source);
            let handle = self.handle.clone();
            tokio::spawn(async move {
                match source.fetch_quote(&symbol).await {
                    Ok(quote) => handle.stage_quote(quote),
                    Err(e) => debug!(%symbol, error = %e, "one-shot fetch failed"),
                }
                handle.fetch_done(symbol);
            });
        }
    }

    fn unsubscribe(&mut self, id: SessionId, symbol: &Symbol) {
        if self.index.unsubscribe(id, symbol) {
            debug!(%id, %symbol, "unsubscribed");
        }
    }

    fn flush(&mut self) {
        let staged = self.buffer.drain();
        if staged.is_empty() {
            return;
        }

        let now = Utc::now();
        let mut slow = Vec::new();
        for (symbol, quote) in staged {
            let Some(subscribers) = self.index.subscribers(&symbol) else {
                continue;
            };
            let message = ServerMessage::Quote {
                symbol: symbol.clone(),
                data: quote,
                timestamp: now,
            };
            for &id in subscribers {
                let Some(entry) = self.sessions.get(&id) else {
                    continue;
                };
                match entry.queue.try_send(message.clone()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        warn!(%id, %symbol, "outbound queue full, disconnecting slow consumer");
                        slow.push(id);
                    }
                    Err(TrySendError::Closed(_)) => slow.push(id),
                }
            }
        }

        for id in slow {
            self.unregister(id);
        }
    }

    fn shutdown(&mut self) {
        if self.shutting_down {
            return;
        }
        self.shutting_down = true;
        info!(sessions = self.sessions.len(), "coordinator shutting down");

        for (_, entry) in self.sessions.drain() {
            let _ = entry.closed.send(true);
        }
        self.index = SubscriptionIndex::new();
        self.buffer = UpdateBuffer::default();
        self.in_flight.clear();
    }
}
