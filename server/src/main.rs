//! Hydra game server
//!
//! Hosts the shared leaderboard API and an interactive console session that
//! drives the battle simulator and progression for one player.

mod battle;
mod commands;
mod config;
mod game;
mod leaderboard;
mod metrics;
mod network;
mod progression;
mod shop;

use std::sync::Arc;
use std::time::{Duration, Instant};
use log::{error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::BufReader;

use crate::config::ServerConfig;
use crate::game::GameHost;
use crate::leaderboard::{LeaderboardService, LeaderboardStore, MemoryStore, RedisStore};
use crate::metrics::{MetricsStore, SharedMetrics};
use crate::network::HttpServer;
use crate::shop::{Ledger, MemoryLedger, OfflineLedger, Shop};

/// How often expired player sessions are swept (in seconds)
const METRICS_SWEEP_SECS: u64 = 60;

/// Open the configured leaderboard store
async fn init_store(config: &ServerConfig) -> Result<LeaderboardStore, Box<dyn std::error::Error + Send + Sync>> {
    let Some(url) = &config.redis_url else {
        return Ok(LeaderboardStore::Memory(MemoryStore::new()));
    };
    let store = RedisStore::connect(url, config.leaderboard_key.clone()).await?;
    info!("Connected to Redis at {}", url);
    Ok(LeaderboardStore::Redis(store))
}

/// Periodically drop players whose session expired
fn spawn_metrics_sweep(metrics: SharedMetrics) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(METRICS_SWEEP_SECS));
        loop {
            interval.tick().await;
            if let Ok(mut metrics) = metrics.lock() {
                metrics.sweep_expired(Instant::now());
            }
        }
    });
}

async fn play<L: Ledger>(ledger: L, config: &ServerConfig, leaderboard: leaderboard::LeaderboardHandle, metrics: SharedMetrics) {
    let shop = Shop::new(ledger, metrics.clone());
    let mut host = GameHost::new(shop, leaderboard, metrics, StdRng::from_entropy());
    if let Some(name) = &config.player_name {
        host.enter_name(name);
    }
    host.run(BufReader::new(tokio::io::stdin())).await;
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting Hydra server...");
    let config = ServerConfig::from_env();

    let store = match init_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            error!("Failed to connect to leaderboard store: {}", e);
            error!("Leaderboard will run in memory (scores are not persisted)");
            LeaderboardStore::Memory(MemoryStore::new())
        }
    };
    let service = Arc::new(LeaderboardService::new(store));
    let metrics = MetricsStore::shared(config.session_ttl);

    let server = match HttpServer::bind(config.http_port, service.clone(), metrics.clone()).await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to start HTTP server on port {}: {}", config.http_port, e);
            return;
        }
    };
    tokio::spawn(server.run());
    spawn_metrics_sweep(metrics.clone());

    let leaderboard = leaderboard::spawn(service);
    info!("Server started successfully!");

    if config.headless {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    } else {
        match config.dev_wallet_balance {
            Some(balance) => {
                info!("Development wallet connected with {} tokens", balance);
                play(MemoryLedger::new(balance), &config, leaderboard.clone(), metrics).await;
            }
            None => play(OfflineLedger, &config, leaderboard.clone(), metrics).await,
        }
    }

    leaderboard.shutdown().await;
    info!("Server shut down");
}
