//! Combatant definitions shared by the simulator and its front ends.

use serde::{Deserialize, Serialize};

/// Number of hydra heads (one per ability slot)
pub const HEAD_COUNT: usize = 3;

/// Permanent and in-battle stats of the player's hydra
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HydraStats {
    pub max_hp: u32,
    pub hp: u32,
    pub max_energy: u32,
    pub energy: u32,
    pub attack: u32,
    pub level: u32,
    /// Per-head bonus, indexed by `AbilityDef::head_index`
    pub head_power: [u32; HEAD_COUNT],
}

impl HydraStats {
    /// Base stats at the start of a run
    pub fn initial() -> Self {
        Self {
            max_hp: 100,
            hp: 100,
            max_energy: 100,
            energy: 100,
            attack: 10,
            level: 1,
            head_power: [0; HEAD_COUNT],
        }
    }

    /// Refill hp and energy
    pub fn restore(&mut self) {
        self.hp = self.max_hp;
        self.energy = self.max_energy;
    }
}

impl Default for HydraStats {
    fn default() -> Self {
        Self::initial()
    }
}

/// Enraged attack an enemy switches to when its health runs low
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialAttack {
    pub name: String,
    /// Health fraction in (0, 1] at or below which the special replaces the normal attack
    pub threshold: f64,
    pub multiplier: f64,
}

impl SpecialAttack {
    /// Whether the special is active for the given health
    pub fn is_triggered(&self, hp: u32, max_hp: u32) -> bool {
        max_hp > 0 && (hp as f64 / max_hp as f64) <= self.threshold
    }

    /// Damage after applying the multiplier, rounded down
    pub fn amplify(&self, damage: u32) -> u32 {
        (damage as f64 * self.multiplier).floor() as u32
    }
}

/// Static enemy definition, one per stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyConfig {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    /// Chance in [0, 1] to evade a hydra auto-attack
    pub dodge_rate: f64,
    /// Auto-attack period in milliseconds
    pub attack_speed_ms: u64,
    /// None = enemy never enrages
    pub special: Option<SpecialAttack>,
    /// Self-heal applied after every auto-attack; None = no regeneration
    pub heal_rate: Option<u32>,
    pub token_reward: u32,
    pub score_value: u32,
}

// =============================================================================
// Enemy Definitions
// =============================================================================

/// Get all enemy definitions in stage order
pub fn get_enemy_definitions() -> Vec<EnemyConfig> {
    vec![
        EnemyConfig {
            id: "doge".into(),
            name: "Doge".into(),
            subtitle: "Much Wow, Very Attack".into(),
            max_hp: 120,
            attack: 12,
            defense: 3,
            dodge_rate: 0.1,
            attack_speed_ms: 2200,
            special: None,
            heal_rate: None,
            token_reward: 50,
            score_value: 100,
        },
        EnemyConfig {
            id: "pepe".into(),
            name: "Pepe".into(),
            subtitle: "Feels Good Shield".into(),
            max_hp: 150,
            attack: 10,
            defense: 8,
            dodge_rate: 0.05,
            attack_speed_ms: 2500,
            special: None,
            heal_rate: None,
            token_reward: 75,
            score_value: 200,
        },
        EnemyConfig {
            id: "chill".into(),
            name: "Chill Guy".into(),
            subtitle: "Low Volatility Vibes".into(),
            max_hp: 100,
            attack: 8,
            defense: 4,
            dodge_rate: 0.35,
            attack_speed_ms: 2000,
            special: None,
            heal_rate: Some(5),
            token_reward: 100,
            score_value: 300,
        },
        EnemyConfig {
            id: "wojak".into(),
            name: "Wojak".into(),
            subtitle: "Pink Panic Seller".into(),
            max_hp: 130,
            attack: 14,
            defense: 2,
            dodge_rate: 0.08,
            attack_speed_ms: 1800,
            special: Some(SpecialAttack {
                name: "PANIC SELL".into(),
                threshold: 0.3,
                multiplier: 3.0,
            }),
            heal_rate: None,
            token_reward: 150,
            score_value: 500,
        },
    ]
}

/// Number of stages in a full run
pub fn stage_count() -> usize {
    get_enemy_definitions().len()
}

/// Enemy for a stage index. Indices past the table reuse the last enemy.
pub fn enemy_for_stage(stage: usize) -> EnemyConfig {
    let mut enemies = get_enemy_definitions();
    let index = stage.min(enemies.len() - 1);
    enemies.swap_remove(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_lookup_clamps_to_last_enemy() {
        assert_eq!(enemy_for_stage(0).id, "doge");
        assert_eq!(enemy_for_stage(3).id, "wojak");
        assert_eq!(enemy_for_stage(4).id, "wojak");
        assert_eq!(enemy_for_stage(usize::MAX).id, "wojak");
    }

    #[test]
    fn test_special_threshold() {
        let special = SpecialAttack {
            name: "PANIC SELL".into(),
            threshold: 0.3,
            multiplier: 3.0,
        };

        assert!(!special.is_triggered(31, 100));
        assert!(special.is_triggered(30, 100));
        assert!(special.is_triggered(0, 100));
        assert!(special.is_triggered(39, 130));
        assert!(!special.is_triggered(40, 130));
        assert_eq!(special.amplify(10), 30);
        assert_eq!(special.amplify(14), 42);
    }

    #[test]
    fn test_only_configured_enemies_have_optional_mechanics() {
        let enemies = get_enemy_definitions();
        let healers: Vec<_> = enemies.iter().filter(|e| e.heal_rate.is_some()).map(|e| e.id.as_str()).collect();
        let enragers: Vec<_> = enemies.iter().filter(|e| e.special.is_some()).map(|e| e.id.as_str()).collect();

        assert_eq!(healers, vec!["chill"]);
        assert_eq!(enragers, vec!["wojak"]);
    }
}
