//! Cross-battle progression: the reducer that owns hydra upgrades, currency,
//! score, purchases and the current screen.
//!
//! `reduce` is pure. Actions that do not apply to the current state return an
//! unchanged copy instead of failing.

use std::collections::HashMap;
use std::fmt;
use log::info;

use hydra_shared::{
    GameScreen, HydraStats, ShopEffect, COOLDOWN_ITEM_ID, MAX_NAME_LENGTH,
    get_shop_item, get_shop_items, stage_count,
};

/// Everything that survives between battles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub screen: GameScreen,
    pub player_name: Option<String>,
    pub hydra: HydraStats,
    /// Stage index into the enemy table
    pub current_battle: usize,
    pub tokens: u32,
    pub total_score: u32,
    /// Purchase count per shop item id
    pub purchases: HashMap<String, u32>,
    /// Screen a shop or leaderboard detour returns to
    pub return_screen: Option<GameScreen>,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            screen: GameScreen::NameEntry,
            player_name: None,
            hydra: HydraStats::initial(),
            current_battle: 0,
            tokens: 0,
            total_score: 0,
            purchases: HashMap::new(),
            return_screen: None,
        }
    }

    pub fn purchase_count(&self, item_id: &str) -> u32 {
        self.purchases.get(item_id).copied().unwrap_or(0)
    }

    /// Levels of cooldown reduction bought so far
    pub fn cooldown_reduction_level(&self) -> u32 {
        self.purchase_count(COOLDOWN_ITEM_ID)
    }

    /// Whether `next_battle` would end the run
    pub fn is_last_battle(&self) -> bool {
        self.current_battle + 1 >= stage_count()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Discrete input to the reducer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Confirm the player name; invalid names are ignored
    EnterName(String),
    SetScreen(GameScreen),
    /// Restart the run: base hydra plus owned upgrades, stage 0, keeps currency and purchases
    StartGame,
    WinBattle { tokens: u32, score: u32 },
    LoseGame,
    NextBattle,
    HealFull,
    /// Buy one unit of a shop item. `externally_settled` means the cost was
    /// already paid through the wallet and only the stat effect applies.
    Purchase { item_id: String, externally_settled: bool },
    /// Overwrite currency with the wallet balance
    SyncTokens(u32),
    OpenShop,
    OpenLeaderboard,
    /// Leave a shop or leaderboard detour
    Back,
    /// Full reset: currency, score and purchases are cleared
    Reset,
}

/// Apply an action, producing the next state
pub fn reduce(state: &GameState, action: Action) -> GameState {
    let mut next = state.clone();

    match action {
        Action::EnterName(raw) => {
            if state.screen == GameScreen::NameEntry {
                if let Ok(name) = validate_player_name(&raw) {
                    next.player_name = Some(name);
                    next.screen = GameScreen::Start;
                }
            }
        }
        Action::SetScreen(screen) => {
            next.screen = screen;
        }
        Action::StartGame => {
            next.hydra = upgraded_hydra(&state.purchases);
            next.current_battle = 0;
            next.return_screen = None;
            next.screen = GameScreen::Battle;
        }
        Action::WinBattle { tokens, score } => {
            next.tokens = state.tokens.saturating_add(tokens);
            next.total_score = state.total_score.saturating_add(score);
            next.screen = GameScreen::Victory;
        }
        Action::LoseGame => {
            next.screen = GameScreen::Defeat;
        }
        Action::NextBattle => {
            if state.is_last_battle() {
                next.screen = GameScreen::EndOfRun;
            } else {
                next.current_battle = state.current_battle + 1;
                next.hydra.restore();
                next.screen = GameScreen::Battle;
            }
        }
        Action::HealFull => {
            next.hydra.restore();
        }
        Action::Purchase { item_id, externally_settled } => {
            apply_purchase(&mut next, &item_id, externally_settled);
        }
        Action::SyncTokens(tokens) => {
            next.tokens = tokens;
        }
        Action::OpenShop => {
            if state.screen.allows_detour() {
                next.return_screen = Some(state.screen);
                next.screen = GameScreen::Shop;
            }
        }
        Action::OpenLeaderboard => {
            if state.screen.allows_detour() {
                next.return_screen = Some(state.screen);
                next.screen = GameScreen::Leaderboard;
            } else if matches!(state.screen, GameScreen::Defeat | GameScreen::EndOfRun) {
                next.return_screen = None;
                next.screen = GameScreen::Leaderboard;
            }
        }
        Action::Back => {
            if matches!(state.screen, GameScreen::Shop | GameScreen::Leaderboard) {
                next.screen = state.return_screen.unwrap_or(GameScreen::Start);
                next.return_screen = None;
            }
        }
        Action::Reset => {
            next = GameState::new();
            next.player_name = state.player_name.clone();
            if next.player_name.is_some() {
                next.screen = GameScreen::Start;
            }
        }
    }

    next
}

fn apply_purchase(state: &mut GameState, item_id: &str, externally_settled: bool) {
    let Some(item) = get_shop_item(item_id) else {
        return;
    };

    let count = state.purchase_count(item_id);
    if count >= item.max_purchases {
        return;
    }
    if !externally_settled {
        if state.tokens < item.cost {
            return;
        }
        state.tokens -= item.cost;
    }

    apply_effect(&mut state.hydra, item.effect);
    state.purchases.insert(item.id.clone(), count + 1);
    info!("Purchased {} ({}/{})", item.name, count + 1, item.max_purchases);
}

fn apply_effect(hydra: &mut HydraStats, effect: ShopEffect) {
    match effect {
        ShopEffect::HeadPower { head, amount } => {
            if let Some(power) = hydra.head_power.get_mut(head) {
                *power += amount;
            }
        }
        ShopEffect::MaxHp(amount) => {
            hydra.max_hp += amount;
            hydra.hp += amount;
        }
        ShopEffect::MaxEnergy(amount) => {
            hydra.max_energy += amount;
            hydra.energy += amount;
        }
        // Read back through `GameState::cooldown_reduction_level`
        ShopEffect::CooldownReduction => {}
    }
}

/// Base hydra with every owned upgrade applied, at full hp and energy
pub fn upgraded_hydra(purchases: &HashMap<String, u32>) -> HydraStats {
    let mut hydra = HydraStats::initial();
    for item in get_shop_items() {
        for _ in 0..purchases.get(&item.id).copied().unwrap_or(0) {
            apply_effect(&mut hydra, item.effect);
        }
    }
    hydra.restore();
    hydra
}

// =============================================================================
// Player names
// =============================================================================

/// Why a player name was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooLong,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Enter your name to continue!"),
            Self::TooLong => write!(f, "Max {} characters!", MAX_NAME_LENGTH),
        }
    }
}

impl std::error::Error for NameError {}

/// Trim and check a player name
pub fn validate_player_name(raw: &str) -> Result<String, NameError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    Ok(trimmed.to_string())
}
