//! Shared leaderboard: top scores keyed by player name.
//!
//! The list is stored as one JSON blob. Reads never fail from the caller's
//! point of view: storage errors and malformed blobs read as an empty list.
//! Game sessions talk to the leaderboard through a [`LeaderboardHandle`], so
//! a slow or broken store never blocks gameplay.

mod store;

pub use store::{LeaderboardStore, MemoryStore, RedisStore, LEADERBOARD_KEY};

use std::sync::Arc;
use log::{error, info, warn};
use tokio::sync::{mpsc, oneshot, Mutex};

use hydra_shared::{LeaderboardEntry, LEADERBOARD_SIZE};

/// Merge a submission into a list: one row per name, a name's score only
/// ever goes up, sorted by descending score and cut to the top entries.
pub fn merge_entry(mut entries: Vec<LeaderboardEntry>, entry: LeaderboardEntry) -> Vec<LeaderboardEntry> {
    match entries.iter_mut().find(|e| e.name == entry.name) {
        Some(existing) => {
            if entry.score > existing.score {
                existing.score = entry.score;
                if entry.tokens.is_some() {
                    existing.tokens = entry.tokens;
                }
            }
        }
        None => entries.push(entry),
    }

    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries.truncate(LEADERBOARD_SIZE);
    entries
}

/// Parse a stored blob, treating anything malformed as empty
pub fn parse_entries(json: &str) -> Vec<LeaderboardEntry> {
    match serde_json::from_str(json) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Discarding malformed leaderboard payload: {}", e);
            Vec::new()
        }
    }
}

/// Read-modify-write access to the stored leaderboard
pub struct LeaderboardService {
    store: LeaderboardStore,
    /// Serializes submits so concurrent writers cannot lose updates
    write_lock: Mutex<()>,
}

impl LeaderboardService {
    pub fn new(store: LeaderboardStore) -> Self {
        info!("Leaderboard using {} backend", store.backend_name());
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Current list, empty on any failure
    pub async fn fetch(&self) -> Vec<LeaderboardEntry> {
        match self.store.load().await {
            Ok(Some(json)) => parse_entries(&json),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load leaderboard: {}", e);
                Vec::new()
            }
        }
    }

    /// Merge an entry and persist, returning the updated list
    pub async fn submit(&self, entry: LeaderboardEntry) -> Result<Vec<LeaderboardEntry>, redis::RedisError> {
        let _guard = self.write_lock.lock().await;

        let current = match self.store.load().await? {
            Some(json) => parse_entries(&json),
            None => Vec::new(),
        };
        let updated = merge_entry(current, entry);

        let json = serde_json::to_string(&updated).unwrap_or_else(|_| "[]".to_string());
        self.store.save(json).await?;
        Ok(updated)
    }
}

// =============================================================================
// Background submitter
// =============================================================================

/// Commands sent to the leaderboard background task
#[derive(Debug)]
pub enum LeaderboardCommand {
    /// Submit a score (fire and forget)
    Submit(LeaderboardEntry),
    /// Fetch the list (response sent via oneshot channel)
    Fetch {
        response: oneshot::Sender<Vec<LeaderboardEntry>>,
    },
    /// Shutdown the task
    Shutdown,
}

/// Handle for sending commands to the leaderboard task
#[derive(Clone)]
pub struct LeaderboardHandle {
    sender: mpsc::Sender<LeaderboardCommand>,
}

impl LeaderboardHandle {
    /// Queue a score submission (non-blocking)
    pub fn submit(&self, entry: LeaderboardEntry) {
        if self.sender.try_send(LeaderboardCommand::Submit(entry)).is_err() {
            warn!("Leaderboard queue unavailable, score dropped");
        }
    }

    /// Fetch the list; empty if the task is gone
    pub async fn fetch(&self) -> Vec<LeaderboardEntry> {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(LeaderboardCommand::Fetch { response: tx }).await.is_err() {
            return Vec::new();
        }
        rx.await.unwrap_or_default()
    }

    /// Shutdown the leaderboard task
    pub async fn shutdown(&self) {
        let _ = self.sender.send(LeaderboardCommand::Shutdown).await;
    }
}

/// Spawn the background task serving a service
pub fn spawn(service: Arc<LeaderboardService>) -> LeaderboardHandle {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(leaderboard_task(service, rx));
    LeaderboardHandle { sender: tx }
}

async fn leaderboard_task(service: Arc<LeaderboardService>, mut rx: mpsc::Receiver<LeaderboardCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            LeaderboardCommand::Submit(entry) => {
                let name = entry.name.clone();
                let score = entry.score;
                match service.submit(entry).await {
                    Ok(_) => info!("Submitted score {} for {}", score, name),
                    Err(e) => error!("Failed to submit score for {}: {}", name, e),
                }
            }
            LeaderboardCommand::Fetch { response } => {
                let _ = response.send(service.fetch().await);
            }
            LeaderboardCommand::Shutdown => {
                info!("Leaderboard task shutting down");
                break;
            }
        }
    }
}
