//! Bidirectional subscription index.
//!
//! Maps symbols to the sessions interested in them and sessions to the
//! symbols they hold. Mutated only by the coordinator, inside its
//! serialized command loop.

use std::collections::{HashMap, HashSet};

use tickstream_core::types::Symbol;

use super::session::SessionId;

/// Bidirectional mapping between symbols and subscribing sessions.
///
/// Invariants, maintained by every mutation:
/// - a session appears under symbol S in the forward map if and only if S
///   appears in that session's symbol set
/// - a symbol whose subscriber set becomes empty is removed entirely
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_symbol: HashMap<Symbol, HashSet<SessionId>>,
    by_session: HashMap<SessionId, HashSet<Symbol>>,
}

impl SubscriptionIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription. Returns true if it was newly added, false if
    /// the session already held the symbol.
    pub fn subscribe(&mut self, session: SessionId, symbol: Symbol) -> bool {
        let added = self
            .by_symbol
            .entry(symbol.clone())
            .or_default()
            .insert(session);
        if added {
            self.by_session.entry(session).or_default().insert(symbol);
        }
        added
    }

    /// Removes a subscription. Returns true if the session held the
    /// symbol, false if this was a no-op.
    pub fn unsubscribe(&mut self, session: SessionId, symbol: &Symbol) -> bool {
        let Some(subscribers) = self.by_symbol.get_mut(symbol) else {
            return false;
        };
        if !subscribers.remove(&session) {
            return false;
        }
        if subscribers.is_empty() {
            self.by_symbol.remove(symbol);
        }
        if let Some(symbols) = self.by_session.get_mut(&session) {
            symbols.remove(symbol);
            if symbols.is_empty() {
                self.by_session.remove(&session);
            }
        }
        true
    }

    /// Removes a session from every symbol it subscribes to, returning
    /// the symbols it held.
    pub fn remove_session(&mut self, session: SessionId) -> HashSet<Symbol> {
        let symbols = self.by_session.remove(&session).unwrap_or_default();
        for symbol in &symbols {
            if let Some(subscribers) = self.by_symbol.get_mut(symbol) {
                subscribers.remove(&session);
                if subscribers.is_empty() {
                    self.by_symbol.remove(symbol);
                }
            }
        }
        symbols
    }

    /// Returns the sessions subscribed to a symbol.
    #[must_use]
    pub fn subscribers(&self, symbol: &Symbol) -> Option<&HashSet<SessionId>> {
        self.by_symbol.get(symbol)
    }

    /// Returns every symbol with at least one subscriber.
    #[must_use]
    pub fn active_symbols(&self) -> Vec<Symbol> {
        self.by_symbol.keys().cloned().collect()
    }

    /// Returns true if the session holds the symbol.
    #[must_use]
    pub fn is_subscribed(&self, session: SessionId, symbol: &Symbol) -> bool {
        self.by_session
            .get(&session)
            .is_some_and(|symbols| symbols.contains(symbol))
    }

    /// Total number of (session, symbol) pairs.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.by_session.values().map(HashSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s).unwrap()
    }

    /// The forward and inverse maps must describe the same set of pairs.
    fn assert_consistent(index: &SubscriptionIndex) {
        for (symbol, sessions) in &index.by_symbol {
            assert!(!sessions.is_empty(), "dangling empty set for {symbol}");
            for session in sessions {
                assert!(index.is_subscribed(*session, symbol));
            }
        }
        let forward: usize = index.by_symbol.values().map(HashSet::len).sum();
        assert_eq!(forward, index.subscription_count());
    }

    #[test]
    fn test_subscribe_and_lookup() {
        let mut index = SubscriptionIndex::new();
        let session = SessionId::generate();

        assert!(index.subscribe(session, sym("AAPL")));
        assert!(index.is_subscribed(session, &sym("AAPL")));
        assert_eq!(index.subscribers(&sym("AAPL")).unwrap().len(), 1);
        assert_consistent(&index);
    }

    #[test]
    fn test_double_subscribe_is_noop() {
        let mut index = SubscriptionIndex::new();
        let session = SessionId::generate();

        assert!(index.subscribe(session, sym("AAPL")));
        assert!(!index.subscribe(session, sym("AAPL")));
        assert_eq!(index.subscription_count(), 1);
        assert_consistent(&index);
    }

    #[test]
    fn test_unsubscribe_not_held_is_noop() {
        let mut index = SubscriptionIndex::new();
        let session = SessionId::generate();

        assert!(!index.unsubscribe(session, &sym("AAPL")));

        index.subscribe(session, sym("AAPL"));
        assert!(!index.unsubscribe(session, &sym("MSFT")));
        assert_eq!(index.subscription_count(), 1);
        assert_consistent(&index);
    }

    #[test]
    fn test_empty_symbol_entry_removed() {
        let mut index = SubscriptionIndex::new();
        let session = SessionId::generate();

        index.subscribe(session, sym("AAPL"));
        assert!(index.unsubscribe(session, &sym("AAPL")));

        assert!(index.subscribers(&sym("AAPL")).is_none());
        assert!(index.active_symbols().is_empty());
        assert_consistent(&index);
    }

    #[test]
    fn test_net_effect_of_sequence() {
        let mut index = SubscriptionIndex::new();
        let session = SessionId::generate();

        index.subscribe(session, sym("AAPL"));
        index.subscribe(session, sym("MSFT"));
        index.subscribe(session, sym("AAPL"));
        index.unsubscribe(session, &sym("AAPL"));
        index.subscribe(session, sym("TSLA"));
        index.unsubscribe(session, &sym("NVDA"));

        assert!(!index.is_subscribed(session, &sym("AAPL")));
        assert!(index.is_subscribed(session, &sym("MSFT")));
        assert!(index.is_subscribed(session, &sym("TSLA")));
        assert_eq!(index.subscription_count(), 2);
        assert_consistent(&index);
    }

    #[test]
    fn test_remove_session_clears_all_symbols() {
        let mut index = SubscriptionIndex::new();
        let a = SessionId::generate();
        let b = SessionId::generate();

        index.subscribe(a, sym("AAPL"));
        index.subscribe(a, sym("MSFT"));
        index.subscribe(b, sym("AAPL"));

        let removed = index.remove_session(a);
        assert_eq!(removed.len(), 2);

        // B's subscription survives; A's sole symbol entry is gone
        assert_eq!(index.subscribers(&sym("AAPL")).unwrap().len(), 1);
        assert!(index.subscribers(&sym("MSFT")).is_none());
        assert_consistent(&index);
    }

    #[test]
    fn test_remove_unknown_session_is_noop() {
        let mut index = SubscriptionIndex::new();
        let removed = index.remove_session(SessionId::generate());
        assert!(removed.is_empty());
    }

    #[test]
    fn test_active_symbols() {
        let mut index = SubscriptionIndex::new();
        let a = SessionId::generate();
        let b = SessionId::generate();

        index.subscribe(a, sym("AAPL"));
        index.subscribe(b, sym("AAPL"));
        index.subscribe(b, sym("MSFT"));

        let mut active = index.active_symbols();
        active.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(active, vec![sym("AAPL"), sym("MSFT")]);
    }
}
