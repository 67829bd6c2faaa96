//! Runtime configuration: compiled-in defaults, overridable from the environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;
use log::warn;

use hydra_shared::DEFAULT_HTTP_PORT;

use crate::leaderboard::LEADERBOARD_KEY;

/// Redis URL (matches docker-compose.yml)
const REDIS_URL: &str = "redis://localhost:6380";

/// How long a player counts as active after their last action (in seconds)
const SESSION_TTL_SECS: u64 = 300;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub http_port: u16,
    /// None = in-memory leaderboard
    pub redis_url: Option<String>,
    pub leaderboard_key: String,
    /// Balance of a connected development wallet; None = no wallet
    pub dev_wallet_balance: Option<u64>,
    /// Skip the name prompt
    pub player_name: Option<String>,
    pub session_ttl: Duration,
    /// Serve the API only, without the console game
    pub headless: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            redis_url: Some(REDIS_URL.to_string()),
            leaderboard_key: LEADERBOARD_KEY.to_string(),
            dev_wallet_balance: None,
            player_name: None,
            session_ttl: Duration::from_secs(SESSION_TTL_SECS),
            headless: false,
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `HYDRA_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(port) = parsed(&lookup, "HYDRA_HTTP_PORT") {
            config.http_port = port;
        }
        if let Some(url) = lookup("HYDRA_REDIS_URL") {
            config.redis_url = if url.trim().is_empty() { None } else { Some(url) };
        }
        if let Some(key) = lookup("HYDRA_LEADERBOARD_KEY").filter(|k| !k.trim().is_empty()) {
            config.leaderboard_key = key;
        }
        config.dev_wallet_balance = parsed(&lookup, "HYDRA_DEV_WALLET");
        config.player_name = lookup("HYDRA_PLAYER_NAME");
        if let Some(secs) = parsed(&lookup, "HYDRA_SESSION_TTL_SECS") {
            config.session_ttl = Duration::from_secs(secs);
        }
        if let Some(headless) = parsed(&lookup, "HYDRA_HEADLESS") {
            config.headless = headless;
        }

        config
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", key, raw);
            None
        }
    }
}
