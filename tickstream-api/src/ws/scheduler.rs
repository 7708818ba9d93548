//! Periodic flush and refresh tasks.
//!
//! Two timers drive the distribution core: the flush scheduler drains the
//! update buffer to subscribers on a short interval, and the refresh
//! poller re-fetches every actively subscribed symbol on a longer one.
//! Both exit when the shutdown controller fires.

use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

use tickstream_core::source::QuoteSource;

use super::config::WsConfig;
use super::coordinator::CoordinatorHandle;
use crate::shutdown::ShutdownController;

/// Spawns the flush scheduler.
///
/// Each tick asks the coordinator to drain the update buffer and fan
/// staged quotes out to current subscribers. A subscriber therefore sees
/// at most one quote per symbol per interval, carrying the most recent
/// value staged before the tick.
pub fn spawn_flush_scheduler(
    coordinator: CoordinatorHandle,
    config: &WsConfig,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    let period = config.flush_interval();
    tokio::spawn(async move {
        let mut signal = shutdown.subscribe();
        if shutdown.is_shutdown_initiated() {
            return;
        }
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = signal.recv() => break,
                _ = interval.tick() => coordinator.flush(),
            }
        }
        debug!("flush scheduler stopped");
    })
}

/// Spawns the refresh poller.
///
/// Each tick enumerates symbols with at least one subscriber and issues
/// one fetch per symbol, bounded to `fetch_concurrency` in flight.
/// A failed fetch is skipped for the cycle; the next tick retries it
/// naturally, paced by the provider's own rate limiting.
pub fn spawn_refresh_poller(
    coordinator: CoordinatorHandle,
    source: Arc<dyn QuoteSource>,
    config: &WsConfig,
    shutdown: ShutdownController,
) -> JoinHandle<()> {
    let period = config.refresh_interval();
    let concurrency = config.fetch_concurrency;
    tokio::spawn(async move {
        let mut signal = shutdown.subscribe();
        if shutdown.is_shutdown_initiated() {
            return;
        }
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = signal.recv() => break,
                _ = interval.tick() => {
                    refresh_cycle(&coordinator, &source, concurrency).await;
                }
            }
        }
        debug!("refresh poller stopped");
    })
}

async fn refresh_cycle(
    coordinator: &CoordinatorHandle,
    source: &Arc<dyn QuoteSource>,
    concurrency: usize,
) {
    let symbols = coordinator.active_symbols().await;
    if symbols.is_empty() {
        return;
    }

    stream::iter(symbols)
        .for_each_concurrent(concurrency, |symbol| async move {
            match source.fetch_quote(&symbol).await {
                Ok(quote) => coordinator.stage_quote(quote),
                Err(e) => debug!(%symbol, error = %e, "refresh fetch failed, skipping cycle"),
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::coordinator::{Coordinator, SessionEntry};
    use crate::ws::message::ServerMessage;
    use crate::ws::session::SessionId;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::time::Duration;
    use tickstream_core::error::FetchError;
    use tickstream_core::types::{Quote, Symbol};
    use tokio::sync::{mpsc, watch};
    use tokio::time::timeout;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    struct RecordingSource {
        fetched: Mutex<Vec<Symbol>>,
    }

    impl RecordingSource {
        fn new() -> Self {
            Self {
                fetched: Mutex::new(Vec::new()),
            }
        }

        fn fetched(&self) -> Vec<Symbol> {
            self.fetched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QuoteSource for RecordingSource {
        async fn fetch_quote(&self, symbol: &Symbol) -> Result<Quote, FetchError> {
            self.fetched.lock().unwrap().push(symbol.clone());
            Ok(Quote {
                symbol: symbol.clone(),
                current: 100.0,
                change: 0.0,
                percent_change: 0.0,
                high: 100.0,
                low: 100.0,
                open: 100.0,
                previous_close: 100.0,
                timestamp: Utc::now(),
            })
        }
    }

    fn fast_config() -> WsConfig {
        WsConfig {
            flush_interval_ms: 20,
            refresh_interval_ms: 30,
            ..WsConfig::default()
        }
    }

    struct TestSession {
        id: SessionId,
        rx: mpsc::Receiver<ServerMessage>,
    }

    fn connect(handle: &CoordinatorHandle) -> TestSession {
        let id = SessionId::generate();
        let (queue, rx) = mpsc::channel(8);
        let (closed, _closed_rx) = watch::channel(false);
        handle.register(SessionEntry { id, queue, closed });
        TestSession { id, rx }
    }

    #[tokio::test]
    async fn test_flush_scheduler_delivers_periodically() {
        let source = Arc::new(RecordingSource::new());
        let (coordinator, handle) = Coordinator::new(source);
        tokio::spawn(coordinator.run());

        let shutdown = ShutdownController::new();
        let task = spawn_flush_scheduler(handle.clone(), &fast_config(), shutdown.clone());

        let mut session = connect(&handle);
        // welcome
        let _ = timeout(Duration::from_secs(1), session.rx.recv()).await.unwrap();

        handle.subscribe(session.id, sym("AAPL"));
        // The one-shot subscribe fetch stages a quote; the scheduler
        // should flush it without any manual flush call
        let msg = timeout(Duration::from_secs(1), session.rx.recv())
            .await
            .expect("no flush within deadline")
            .unwrap();
        assert!(matches!(msg, ServerMessage::Quote { .. }));

        shutdown.initiate_shutdown();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_refresh_poller_fetches_active_symbols_only() {
        let source = Arc::new(RecordingSource::new());
        let (coordinator, handle) = Coordinator::new(source.clone() as Arc<dyn QuoteSource>);
        tokio::spawn(coordinator.run());

        let shutdown = ShutdownController::new();
        let task = spawn_refresh_poller(
            handle.clone(),
            source.clone(),
            &fast_config(),
            shutdown.clone(),
        );

        let session = connect(&handle);
        handle.subscribe(session.id, sym("AAPL"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        shutdown.initiate_shutdown();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();

        let fetched = source.fetched();
        // The one-shot fetch plus at least one poller cycle
        assert!(fetched.len() >= 2, "expected repeated fetches, got {fetched:?}");
        assert!(fetched.iter().all(|s| *s == sym("AAPL")));
    }

    #[tokio::test]
    async fn test_poller_idles_with_no_subscriptions() {
        let source = Arc::new(RecordingSource::new());
        let (coordinator, handle) = Coordinator::new(source.clone() as Arc<dyn QuoteSource>);
        tokio::spawn(coordinator.run());

        let shutdown = ShutdownController::new();
        let task = spawn_refresh_poller(
            handle.clone(),
            source.clone(),
            &fast_config(),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.initiate_shutdown();
        timeout(Duration::from_secs(1), task).await.unwrap().unwrap();

        assert!(source.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_schedulers_exit_on_already_initiated_shutdown() {
        let source = Arc::new(RecordingSource::new());
        let (coordinator, handle) = Coordinator::new(source.clone() as Arc<dyn QuoteSource>);
        tokio::spawn(coordinator.run());

        let shutdown = ShutdownController::new();
        shutdown.initiate_shutdown();

        let flush = spawn_flush_scheduler(handle.clone(), &fast_config(), shutdown.clone());
        let poll = spawn_refresh_poller(handle, source, &fast_config(), shutdown);

        timeout(Duration::from_secs(1), flush).await.unwrap().unwrap();
        timeout(Duration::from_secs(1), poll).await.unwrap().unwrap();
    }
}
