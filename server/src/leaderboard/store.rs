//! Key-value storage backends for the serialized leaderboard.

use std::sync::{Arc, Mutex};
use redis::{AsyncCommands, aio::ConnectionManager};

/// Default key holding the leaderboard JSON
pub const LEADERBOARD_KEY: &str = "leaderboard";

/// Where the leaderboard blob lives
#[derive(Clone)]
pub enum LeaderboardStore {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl LeaderboardStore {
    /// Load the raw JSON blob, `None` when nothing was stored yet
    pub async fn load(&self) -> Result<Option<String>, redis::RedisError> {
        match self {
            Self::Redis(store) => store.load().await,
            Self::Memory(store) => Ok(store.load()),
        }
    }

    /// Replace the raw JSON blob
    pub async fn save(&self, json: String) -> Result<(), redis::RedisError> {
        match self {
            Self::Redis(store) => store.save(json).await,
            Self::Memory(store) => {
                store.save(json);
                Ok(())
            }
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    key: String,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(url: &str, key: impl Into<String>) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn, key: key.into() })
    }

    async fn load(&self) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.get(&self.key).await
    }

    async fn save(&self, json: String) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&self.key, json).await
    }
}

/// Process-local store, used when Redis is unavailable and in tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    blob: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a raw blob
    #[cfg(test)]
    pub fn with_blob(json: impl Into<String>) -> Self {
        Self {
            blob: Arc::new(Mutex::new(Some(json.into()))),
        }
    }

    fn load(&self) -> Option<String> {
        self.blob.lock().map(|blob| blob.clone()).unwrap_or(None)
    }

    fn save(&self, json: String) {
        if let Ok(mut blob) = self.blob.lock() {
            *blob = Some(json);
        }
    }
}
