//! Timing constants and wire types shared between the core and its consumers.

use serde::{Deserialize, Serialize};

/// Hydra auto-attack period
pub const HYDRA_ATTACK_INTERVAL_MS: u64 = 2000;

/// Energy regeneration period
pub const ENERGY_REGEN_INTERVAL_MS: u64 = 1000;

/// Energy restored per regeneration tick
pub const ENERGY_REGEN_AMOUNT: u32 = 5;

/// Cooldown decay period (and amount removed per tick)
pub const COOLDOWN_TICK_MS: u64 = 100;

/// Pause between resolution and outcome delivery, leaves room for the last animation
pub const PRESENTATION_DELAY_MS: u64 = 800;

/// Lines kept in the rolling combat log
pub const COMBAT_LOG_SIZE: usize = 5;

/// Entries kept on the leaderboard
pub const LEADERBOARD_SIZE: usize = 20;

/// Longest accepted player name
pub const MAX_NAME_LENGTH: usize = 16;

/// Default leaderboard HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 8787;

// =============================================================================
// Screens
// =============================================================================

/// High-level screen of a game session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameScreen {
    NameEntry,
    Start,
    Battle,
    Victory,
    Defeat,
    EndOfRun,
    Shop,
    Leaderboard,
}

impl GameScreen {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NameEntry => "name entry",
            Self::Start => "start",
            Self::Battle => "battle",
            Self::Victory => "victory",
            Self::Defeat => "defeat",
            Self::EndOfRun => "end of run",
            Self::Shop => "shop",
            Self::Leaderboard => "leaderboard",
        }
    }

    /// Screens that may open the shop or leaderboard and get control back afterwards
    pub fn allows_detour(&self) -> bool {
        matches!(self, Self::Start | Self::Victory | Self::Battle)
    }
}

// =============================================================================
// Leaderboard
// =============================================================================

/// Stored leaderboard row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<i64>,
}

// =============================================================================
// Battle
// =============================================================================

/// Lifecycle of one encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleStatus {
    Active,
    Won,
    Lost,
}

impl BattleStatus {
    pub fn is_over(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// Terminal result reported back to the progression state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleOutcome {
    Victory { tokens: u32, score: u32 },
    Defeat,
}

/// Something that happened during a simulation step, consumed by renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleEvent {
    /// Hydra auto-attack landed
    HydraHit { damage: u32 },
    /// Enemy evaded the hydra auto-attack
    EnemyDodged,
    /// Enemy auto-attack landed, `special` when it was the enraged variant
    EnemyHit { damage: u32, special: bool },
    /// Enemy regenerated after attacking
    EnemyHealed { amount: u32 },
    /// Player ability resolved
    AbilityUsed { ability_id: String, damage: u32, heal: u32 },
    /// Energy regenerated
    EnergyRestored { energy: u32 },
    /// Battle reached a terminal state
    Resolved { outcome: BattleOutcome },
}

/// Read-only view of a battle session handed to renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub stage: usize,
    pub enemy_id: String,
    pub enemy_name: String,
    pub hydra_hp: u32,
    pub hydra_max_hp: u32,
    pub hydra_energy: u32,
    pub hydra_max_energy: u32,
    pub enemy_hp: u32,
    pub enemy_max_hp: u32,
    /// Remaining cooldown per ability, in action bar order
    pub cooldowns: Vec<(String, u64)>,
    pub status: BattleStatus,
    /// Most recent combat log lines, oldest first
    pub log: Vec<String>,
    /// Events caused by the step that produced this snapshot
    pub events: Vec<BattleEvent>,
}

// =============================================================================
// Serialization helpers
// =============================================================================

impl BattleSnapshot {
    pub fn serialize(&self) -> Vec<u8> {
        bincode::serialize(self).expect("Failed to serialize BattleSnapshot")
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_rejects_truncated_frame() {
        let snapshot = BattleSnapshot {
            stage: 0,
            enemy_id: "doge".into(),
            enemy_name: "Doge".into(),
            hydra_hp: 100,
            hydra_max_hp: 100,
            hydra_energy: 100,
            hydra_max_energy: 100,
            enemy_hp: 120,
            enemy_max_hp: 120,
            cooldowns: vec![("liquidity-blast".into(), 0)],
            status: BattleStatus::Active,
            log: vec!["Battle start!".into()],
            events: vec![],
        };

        let bytes = snapshot.serialize();
        assert_eq!(BattleSnapshot::deserialize(&bytes).unwrap(), snapshot);
        assert!(BattleSnapshot::deserialize(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn test_detour_origins() {
        assert!(GameScreen::Start.allows_detour());
        assert!(GameScreen::Battle.allows_detour());
        assert!(!GameScreen::Defeat.allows_detour());
        assert!(!GameScreen::Shop.allows_detour());
    }
}
