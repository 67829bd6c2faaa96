//! Ability definitions shared between the simulator and its front ends.

use serde::{Deserialize, Serialize};

/// Cooldown removed from every ability per purchased reduction level
pub const COOLDOWN_REDUCTION_STEP_MS: u64 = 500;

/// Head whose power also boosts healing
pub const HEALING_HEAD: usize = 2;

/// Ability definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityDef {
    /// Unique ability ID
    pub id: String,
    /// Display name
    pub name: String,
    pub icon: String,
    pub base_damage: u32,
    pub heal_amount: u32,
    /// Energy spent on use
    pub energy_cost: u32,
    /// Cooldown in milliseconds before any reduction
    pub cooldown_ms: u64,
    /// Which `head_power` slot boosts this ability (0..=2)
    pub head_index: usize,
}

impl AbilityDef {
    /// Damage dealt against a target with the given defense, never below 1
    pub fn damage(&self, head_power: &[u32], defense: u32) -> u32 {
        let bonus = head_power.get(self.head_index).copied().unwrap_or(0);
        (self.base_damage + bonus).saturating_sub(defense).max(1)
    }

    /// Amount healed on use
    pub fn heal(&self, head_power: &[u32]) -> u32 {
        if self.head_index == HEALING_HEAD {
            self.heal_amount + head_power.get(HEALING_HEAD).copied().unwrap_or(0)
        } else {
            self.heal_amount
        }
    }

    /// Cooldown after applying `reduction_level` reduction upgrades
    pub fn effective_cooldown(&self, reduction_level: u32) -> u64 {
        self.cooldown_ms
            .saturating_sub(reduction_level as u64 * COOLDOWN_REDUCTION_STEP_MS)
    }
}

// =============================================================================
// Ability Definitions
// =============================================================================

/// Get all ability definitions, in action bar order
pub fn get_ability_definitions() -> Vec<AbilityDef> {
    vec![
        AbilityDef {
            id: "liquidity-blast".into(),
            name: "Liquidity Blast".into(),
            icon: "💥".into(),
            base_damage: 25,
            heal_amount: 0,
            energy_cost: 30,
            cooldown_ms: 5000,
            head_index: 0,
        },
        AbilityDef {
            id: "scalability-strike".into(),
            name: "Scalability Strike".into(),
            icon: "⚡".into(),
            base_damage: 40,
            heal_amount: 0,
            energy_cost: 45,
            cooldown_ms: 8000,
            head_index: 1,
        },
        AbilityDef {
            id: "atomic-swap".into(),
            name: "Atomic Swap".into(),
            icon: "🔄".into(),
            base_damage: 15,
            heal_amount: 20,
            energy_cost: 35,
            cooldown_ms: 6000,
            head_index: 2,
        },
    ]
}

/// Get ability by ID
pub fn get_ability_by_id(id: &str) -> Option<AbilityDef> {
    get_ability_definitions().into_iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ability_damage_includes_head_power() {
        let blast = get_ability_by_id("liquidity-blast").unwrap();
        assert_eq!(blast.damage(&[10, 0, 0], 5), 30);
        assert_eq!(blast.damage(&[0, 0, 0], 100), 1);
    }

    #[test]
    fn test_only_healing_head_boosts_heal() {
        let swap = get_ability_by_id("atomic-swap").unwrap();
        let strike = get_ability_by_id("scalability-strike").unwrap();

        assert_eq!(swap.heal(&[0, 0, 10]), 30);
        assert_eq!(strike.heal(&[0, 10, 10]), 0);
    }

    #[test]
    fn test_cooldown_reduction_floors_at_zero() {
        let blast = get_ability_by_id("liquidity-blast").unwrap();
        assert_eq!(blast.effective_cooldown(0), 5000);
        assert_eq!(blast.effective_cooldown(4), 3000);
        assert_eq!(blast.effective_cooldown(20), 0);
    }
}
