//! Process-wide counters: completed shop transactions and the registry of
//! recently active players.
//!
//! The store is created once in `main` and handed to every component that
//! needs it; entries in the player registry expire after a fixed TTL and are
//! removed by an explicit sweep.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use log::debug;
use serde::Serialize;

/// Shared handle to the metrics store
pub type SharedMetrics = Arc<Mutex<MetricsStore>>;

/// Point-in-time view served over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub transactions: u64,
    pub active_players: usize,
}

#[derive(Debug)]
pub struct MetricsStore {
    transactions: u64,
    /// Player name -> last time seen
    active_players: HashMap<String, Instant>,
    session_ttl: Duration,
}

impl MetricsStore {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            transactions: 0,
            active_players: HashMap::new(),
            session_ttl,
        }
    }

    /// Create a store behind a shared handle
    pub fn shared(session_ttl: Duration) -> SharedMetrics {
        Arc::new(Mutex::new(Self::new(session_ttl)))
    }

    pub fn record_transaction(&mut self) {
        self.transactions += 1;
    }

    #[cfg(test)]
    pub fn transaction_count(&self) -> u64 {
        self.transactions
    }

    /// Mark a player as active at `now`
    pub fn touch_player(&mut self, name: &str, now: Instant) {
        self.active_players.insert(name.to_string(), now);
    }

    /// Players seen within the TTL as of `now`
    pub fn active_players(&self, now: Instant) -> usize {
        self.active_players
            .values()
            .filter(|seen| now.saturating_duration_since(**seen) < self.session_ttl)
            .count()
    }

    /// Drop expired players, returning how many were removed
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.active_players.len();
        let ttl = self.session_ttl;
        self.active_players
            .retain(|_, seen| now.saturating_duration_since(*seen) < ttl);
        let removed = before - self.active_players.len();
        if removed > 0 {
            debug!("Expired {} inactive player sessions", removed);
        }
        removed
    }

    pub fn summary(&self, now: Instant) -> MetricsSummary {
        MetricsSummary {
            transactions: self.transactions,
            active_players: self.active_players(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transactions_count_up() {
        let mut store = MetricsStore::new(Duration::from_secs(60));
        store.record_transaction();
        store.record_transaction();
        assert_eq!(store.transaction_count(), 2);
    }

    #[test]
    fn test_player_registry_expiry() {
        let start = Instant::now();
        let mut store = MetricsStore::new(Duration::from_secs(60));

        store.touch_player("Ann", start);
        store.touch_player("Bob", start + Duration::from_secs(30));
        assert_eq!(store.active_players(start + Duration::from_secs(45)), 2);
        assert_eq!(store.active_players(start + Duration::from_secs(75)), 1);

        assert_eq!(store.sweep_expired(start + Duration::from_secs(75)), 1);
        assert_eq!(store.summary(start + Duration::from_secs(75)).active_players, 1);

        store.touch_player("Bob", start + Duration::from_secs(100));
        assert_eq!(store.sweep_expired(start + Duration::from_secs(120)), 0);
    }
}
