//! Battle simulation for a single encounter.
//!
//! The simulator is a plain state machine. Every periodic process and every
//! player action is a method that mutates the session and returns the events
//! it caused; scheduling those calls is the job of [`super::runner`].
//!
//! Once the session is resolved every method is a no-op, which is what keeps
//! a late timer from reporting a second outcome.

use std::collections::{HashMap, VecDeque};
use log::{debug, info};
use rand::Rng;

use hydra_shared::{
    AbilityDef, BattleEvent, BattleOutcome, BattleSnapshot, BattleStatus, EnemyConfig,
    HydraStats, COMBAT_LOG_SIZE, COOLDOWN_TICK_MS, ENERGY_REGEN_AMOUNT,
    enemy_for_stage, get_ability_definitions,
};

/// Mutable state of one encounter
#[derive(Debug, Clone)]
pub struct BattleSession {
    pub hydra_hp: u32,
    pub hydra_energy: u32,
    pub enemy_hp: u32,
    /// Remaining cooldown per ability id; absent means ready
    pub cooldowns: HashMap<String, u64>,
    /// Terminal latch, never returns to `Active`
    pub status: BattleStatus,
    /// Rolling combat log, oldest first
    pub log: VecDeque<String>,
}

/// Simulator for one hydra-versus-enemy encounter
#[derive(Debug, Clone)]
pub struct BattleSimulator {
    stage: usize,
    hydra: HydraStats,
    enemy: EnemyConfig,
    abilities: Vec<AbilityDef>,
    cooldown_reduction: u32,
    session: BattleSession,
}

impl BattleSimulator {
    /// Create a simulator for a stage of the run, using the stock ability bar
    pub fn for_stage(stage: usize, hydra: &HydraStats, cooldown_reduction: u32) -> Self {
        Self::new(stage, hydra, enemy_for_stage(stage), get_ability_definitions(), cooldown_reduction)
    }

    pub fn new(
        stage: usize,
        hydra: &HydraStats,
        enemy: EnemyConfig,
        abilities: Vec<AbilityDef>,
        cooldown_reduction: u32,
    ) -> Self {
        let mut log = VecDeque::with_capacity(COMBAT_LOG_SIZE);
        log.push_back("Battle start!".to_string());

        let session = BattleSession {
            hydra_hp: hydra.hp.min(hydra.max_hp),
            hydra_energy: hydra.energy.min(hydra.max_energy),
            enemy_hp: enemy.max_hp,
            cooldowns: HashMap::new(),
            status: BattleStatus::Active,
            log,
        };

        Self {
            stage,
            hydra: hydra.clone(),
            enemy,
            abilities,
            cooldown_reduction,
            session,
        }
    }

    pub fn enemy(&self) -> &EnemyConfig {
        &self.enemy
    }

    #[cfg(test)]
    pub fn session(&self) -> &BattleSession {
        &self.session
    }

    pub fn is_over(&self) -> bool {
        self.session.status.is_over()
    }

    /// Outcome once the battle is resolved
    pub fn outcome(&self) -> Option<BattleOutcome> {
        match self.session.status {
            BattleStatus::Active => None,
            BattleStatus::Won => Some(BattleOutcome::Victory {
                tokens: self.enemy.token_reward,
                score: self.enemy.score_value,
            }),
            BattleStatus::Lost => Some(BattleOutcome::Defeat),
        }
    }

    /// Remaining cooldown of an ability in milliseconds
    pub fn cooldown_remaining(&self, ability_id: &str) -> u64 {
        self.session.cooldowns.get(ability_id).copied().unwrap_or(0)
    }

    // =========================================================================
    // Periodic processes
    // =========================================================================

    /// Hydra auto-attack: dodge roll, then `attack - defense` (at least 1)
    pub fn hydra_auto_attack<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }

        if rng.gen::<f64>() < self.enemy.dodge_rate {
            self.push_log(format!("{} dodged!", self.enemy.name));
            events.push(BattleEvent::EnemyDodged);
            return events;
        }

        let damage = self.hydra.attack.saturating_sub(self.enemy.defense).max(1);
        self.session.enemy_hp = self.session.enemy_hp.saturating_sub(damage);
        self.push_log(format!("Hydra hits for {}!", damage));
        events.push(BattleEvent::HydraHit { damage });

        self.check_resolution(&mut events);
        events
    }

    /// Enemy auto-attack, enraged below the special threshold, followed by self-heal
    pub fn enemy_auto_attack(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }

        let enraged = self
            .enemy
            .special
            .as_ref()
            .filter(|attack| attack.is_triggered(self.session.enemy_hp, self.enemy.max_hp))
            .map(|attack| (attack.amplify(self.enemy.attack), attack.name.clone()));

        let special = enraged.is_some();
        let damage = match enraged {
            Some((damage, name)) => {
                self.push_log(format!("{} uses {}!", self.enemy.name, name));
                damage
            }
            None => self.enemy.attack,
        };

        self.session.hydra_hp = self.session.hydra_hp.saturating_sub(damage);
        self.push_log(format!("{} hits for {}!", self.enemy.name, damage));
        events.push(BattleEvent::EnemyHit { damage, special });

        if let Some(amount) = self.enemy.heal_rate {
            self.session.enemy_hp = (self.session.enemy_hp + amount).min(self.enemy.max_hp);
            events.push(BattleEvent::EnemyHealed { amount });
        }

        self.check_resolution(&mut events);
        events
    }

    /// Energy regeneration, capped at max energy
    pub fn regenerate_energy(&mut self) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }

        let energy = (self.session.hydra_energy + ENERGY_REGEN_AMOUNT).min(self.hydra.max_energy);
        if energy != self.session.hydra_energy {
            self.session.hydra_energy = energy;
            events.push(BattleEvent::EnergyRestored { energy });
        }
        events
    }

    /// Decay every running cooldown by one tick; finished ones are dropped
    pub fn decay_cooldowns(&mut self) -> Vec<BattleEvent> {
        if !self.is_over() {
            self.session.cooldowns.retain(|_, remaining| {
                *remaining = remaining.saturating_sub(COOLDOWN_TICK_MS);
                *remaining > 0
            });
        }
        Vec::new()
    }

    // =========================================================================
    // Player actions
    // =========================================================================

    /// Use the ability in action bar slot `index`.
    /// Silently ignored when resolved, on cooldown, short on energy or out of range.
    pub fn use_ability(&mut self, index: usize) -> Vec<BattleEvent> {
        let mut events = Vec::new();
        if self.is_over() {
            return events;
        }

        let Some(ability) = self.abilities.get(index) else {
            return events;
        };
        if self.cooldown_remaining(&ability.id) > 0 || self.session.hydra_energy < ability.energy_cost {
            debug!("Ability {} not ready", ability.id);
            return events;
        }

        let damage = ability.damage(&self.hydra.head_power, self.enemy.defense);
        let heal = ability.heal(&self.hydra.head_power);
        let cooldown = ability.effective_cooldown(self.cooldown_reduction);
        let ability_id = ability.id.clone();
        let line = format!("{} for {}!", ability.name, damage);

        self.session.hydra_energy -= ability.energy_cost;
        self.session.enemy_hp = self.session.enemy_hp.saturating_sub(damage);
        if heal > 0 {
            self.session.hydra_hp = (self.session.hydra_hp + heal).min(self.hydra.max_hp);
        }
        if cooldown > 0 {
            self.session.cooldowns.insert(ability_id.clone(), cooldown);
        }
        self.push_log(line);
        events.push(BattleEvent::AbilityUsed { ability_id, damage, heal });

        self.check_resolution(&mut events);
        events
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Snapshot for renderers, carrying the events of the last step
    pub fn snapshot(&self, events: Vec<BattleEvent>) -> BattleSnapshot {
        BattleSnapshot {
            stage: self.stage,
            enemy_id: self.enemy.id.clone(),
            enemy_name: self.enemy.name.clone(),
            hydra_hp: self.session.hydra_hp,
            hydra_max_hp: self.hydra.max_hp,
            hydra_energy: self.session.hydra_energy,
            hydra_max_energy: self.hydra.max_energy,
            enemy_hp: self.session.enemy_hp,
            enemy_max_hp: self.enemy.max_hp,
            cooldowns: self
                .abilities
                .iter()
                .map(|a| (a.id.clone(), self.cooldown_remaining(&a.id)))
                .collect(),
            status: self.session.status,
            log: self.session.log.iter().cloned().collect(),
            events,
        }
    }

    /// Latch the terminal state. Hydra defeat is checked first.
    fn check_resolution(&mut self, events: &mut Vec<BattleEvent>) {
        if self.is_over() {
            return;
        }

        if self.session.hydra_hp == 0 {
            self.session.status = BattleStatus::Lost;
            info!("Hydra fell to {} at stage {}", self.enemy.name, self.stage + 1);
        } else if self.session.enemy_hp == 0 {
            self.session.status = BattleStatus::Won;
            info!("Hydra defeated {} at stage {}", self.enemy.name, self.stage + 1);
        }

        if let Some(outcome) = self.outcome() {
            events.push(BattleEvent::Resolved { outcome });
        }
    }

    fn push_log(&mut self, line: String) {
        if self.session.log.len() == COMBAT_LOG_SIZE {
            self.session.log.pop_front();
        }
        self.session.log.push_back(line);
    }
}
