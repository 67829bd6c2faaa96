//! Shop: turns a purchase request into a `Purchase` action, settling the cost
//! either through a connected wallet or against in-game currency.
//!
//! With a wallet connected the ledger balance is authoritative: the shop
//! debits the ledger first and applies the purchase as externally settled.
//! Without one it falls back to in-game tokens.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use log::{info, warn};

use hydra_shared::get_shop_item;

use crate::metrics::SharedMetrics;
use crate::progression::{reduce, Action, GameState};

/// Why a ledger call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    NotConnected,
    InsufficientBalance,
    Rejected(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "wallet not connected"),
            Self::InsufficientBalance => write!(f, "insufficient wallet balance"),
            Self::Rejected(reason) => write!(f, "transaction rejected: {}", reason),
        }
    }
}

impl std::error::Error for LedgerError {}

/// External token ledger (the player's wallet)
pub trait Ledger: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Current balance of the game token
    fn balance(&self) -> impl Future<Output = Result<u64, LedgerError>> + Send;

    /// Submit a debit transfer
    fn debit(&self, amount: u64) -> impl Future<Output = Result<(), LedgerError>> + Send;
}

/// No wallet attached
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineLedger;

impl Ledger for OfflineLedger {
    fn is_connected(&self) -> bool {
        false
    }

    async fn balance(&self) -> Result<u64, LedgerError> {
        Err(LedgerError::NotConnected)
    }

    async fn debit(&self, _amount: u64) -> Result<(), LedgerError> {
        Err(LedgerError::NotConnected)
    }
}

/// Connected in-process wallet, for development and tests
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    balance: Arc<Mutex<u64>>,
}

impl MemoryLedger {
    pub fn new(balance: u64) -> Self {
        Self {
            balance: Arc::new(Mutex::new(balance)),
        }
    }
}

impl Ledger for MemoryLedger {
    fn is_connected(&self) -> bool {
        true
    }

    async fn balance(&self) -> Result<u64, LedgerError> {
        self.balance
            .lock()
            .map(|balance| *balance)
            .map_err(|_| LedgerError::Rejected("wallet state poisoned".into()))
    }

    async fn debit(&self, amount: u64) -> Result<(), LedgerError> {
        let mut balance = self
            .balance
            .lock()
            .map_err(|_| LedgerError::Rejected("wallet state poisoned".into()))?;
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        *balance -= amount;
        Ok(())
    }
}

/// Result of a purchase attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Purchased { item_id: String, via_wallet: bool },
    UnknownItem,
    SoldOut,
    InsufficientFunds,
    LedgerFailed(String),
}

/// Shop front for one player
pub struct Shop<L: Ledger> {
    ledger: L,
    metrics: SharedMetrics,
}

impl<L: Ledger> Shop<L> {
    pub fn new(ledger: L, metrics: SharedMetrics) -> Self {
        Self { ledger, metrics }
    }

    /// Wallet balance, or None when no wallet is usable
    pub async fn wallet_balance(&self) -> Option<u64> {
        if !self.ledger.is_connected() {
            return None;
        }
        match self.ledger.balance().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Wallet balance query failed: {}", e);
                None
            }
        }
    }

    /// Try to buy one unit of `item_id`, returning the next state
    pub async fn buy(&self, state: &GameState, item_id: &str) -> (GameState, PurchaseOutcome) {
        let Some(item) = get_shop_item(item_id) else {
            return (state.clone(), PurchaseOutcome::UnknownItem);
        };
        if state.purchase_count(item_id) >= item.max_purchases {
            return (state.clone(), PurchaseOutcome::SoldOut);
        }

        let via_wallet = self.ledger.is_connected();
        if via_wallet {
            match self.ledger.balance().await {
                Ok(balance) if balance < item.cost as u64 => {
                    return (state.clone(), PurchaseOutcome::InsufficientFunds);
                }
                Ok(_) => {}
                Err(e) => return (state.clone(), PurchaseOutcome::LedgerFailed(e.to_string())),
            }
            if let Err(e) = self.ledger.debit(item.cost as u64).await {
                warn!("Wallet debit for {} failed: {}", item.id, e);
                return (state.clone(), PurchaseOutcome::LedgerFailed(e.to_string()));
            }
        } else if state.tokens < item.cost {
            return (state.clone(), PurchaseOutcome::InsufficientFunds);
        }

        let mut next = reduce(
            state,
            Action::Purchase {
                item_id: item.id.clone(),
                externally_settled: via_wallet,
            },
        );
        if via_wallet {
            if let Some(balance) = self.wallet_balance().await {
                next = reduce(&next, Action::SyncTokens(balance.min(u32::MAX as u64) as u32));
            }
        }

        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.record_transaction();
            if let Some(name) = &state.player_name {
                metrics.touch_player(name, Instant::now());
            }
        }
        info!("{} bought {} ({})", state.player_name.as_deref().unwrap_or("player"), item.name, if via_wallet { "wallet" } else { "tokens" });

        (next, PurchaseOutcome::Purchased { item_id: item.id, via_wallet })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::metrics::MetricsStore;

    fn state_with_tokens(tokens: u32) -> GameState {
        let mut state = reduce(&GameState::new(), Action::EnterName("Ann".into()));
        state.tokens = tokens;
        state
    }

    fn metrics() -> SharedMetrics {
        MetricsStore::shared(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_offline_purchase_spends_tokens() {
        let metrics = metrics();
        let shop = Shop::new(OfflineLedger, metrics.clone());

        let (state, outcome) = shop.buy(&state_with_tokens(100), "max-hp").await;
        assert_eq!(outcome, PurchaseOutcome::Purchased { item_id: "max-hp".into(), via_wallet: false });
        assert_eq!(state.tokens, 70);
        assert_eq!(state.hydra.max_hp, 120);
        assert_eq!(metrics.lock().unwrap().transaction_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_purchase_needs_tokens() {
        let shop = Shop::new(OfflineLedger, metrics());
        let before = state_with_tokens(10);

        let (state, outcome) = shop.buy(&before, "max-hp").await;
        assert_eq!(outcome, PurchaseOutcome::InsufficientFunds);
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn test_wallet_purchase_debits_ledger() {
        let ledger = MemoryLedger::new(100);
        let shop = Shop::new(ledger.clone(), metrics());

        let (state, outcome) = shop.buy(&state_with_tokens(0), "cooldown").await;
        assert_eq!(outcome, PurchaseOutcome::Purchased { item_id: "cooldown".into(), via_wallet: true });
        assert_eq!(state.cooldown_reduction_level(), 1);
        assert_eq!(ledger.balance().await, Ok(40));
        assert_eq!(state.tokens, 40);

        let (_, outcome) = shop.buy(&state, "cooldown").await;
        assert_eq!(outcome, PurchaseOutcome::InsufficientFunds);
        assert_eq!(ledger.balance().await, Ok(40));
    }

    #[tokio::test]
    async fn test_sold_out_and_unknown() {
        let shop = Shop::new(MemoryLedger::new(10_000), metrics());
        let mut state = state_with_tokens(0);
        for _ in 0..4 {
            state = shop.buy(&state, "cooldown").await.0;
        }

        assert_eq!(shop.buy(&state, "cooldown").await.1, PurchaseOutcome::SoldOut);
        assert_eq!(shop.buy(&state, "nope").await.1, PurchaseOutcome::UnknownItem);
        assert_eq!(state.purchase_count("cooldown"), 4);
    }
}
