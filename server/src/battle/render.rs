//! Rendering adapters fed by the battle runner.

use hydra_shared::{BattleEvent, BattleOutcome, BattleSnapshot};

/// Consumer of battle snapshots. Called after every simulation step;
/// renderers never feed anything back into the simulation.
pub trait BattleRenderer: Send {
    fn render(&mut self, snapshot: &BattleSnapshot);
}

/// Prints combat events and a status line to stdout
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl BattleRenderer for ConsoleRenderer {
    fn render(&mut self, snapshot: &BattleSnapshot) {
        if snapshot.events.is_empty() {
            return;
        }

        for event in &snapshot.events {
            if let Some(line) = describe_event(event, &snapshot.enemy_name) {
                println!("  {}", line);
            }
        }
        println!("  {}", status_line(snapshot));
    }
}

/// Human-readable line for an event; energy ticks are not worth a line
pub fn describe_event(event: &BattleEvent, enemy_name: &str) -> Option<String> {
    match event {
        BattleEvent::HydraHit { damage } => Some(format!("Hydra hits {} for {}", enemy_name, damage)),
        BattleEvent::EnemyDodged => Some(format!("{} dodged! MISS", enemy_name)),
        BattleEvent::EnemyHit { damage, special: true } => {
            Some(format!("{} unleashes its special for {}!", enemy_name, damage))
        }
        BattleEvent::EnemyHit { damage, special: false } => Some(format!("{} hits for {}", enemy_name, damage)),
        BattleEvent::EnemyHealed { amount } => Some(format!("{} heals +{}", enemy_name, amount)),
        BattleEvent::AbilityUsed { ability_id, damage, heal } if *heal > 0 => {
            Some(format!("{} deals {} and heals +{}", ability_id, damage, heal))
        }
        BattleEvent::AbilityUsed { ability_id, damage, .. } => Some(format!("{} deals {}", ability_id, damage)),
        BattleEvent::EnergyRestored { .. } => None,
        BattleEvent::Resolved { outcome: BattleOutcome::Victory { tokens, score } } => {
            Some(format!("VICTORY! +{} tokens, +{} pts", tokens, score))
        }
        BattleEvent::Resolved { outcome: BattleOutcome::Defeat } => {
            Some("DEFEAT... your Hydra has fallen".to_string())
        }
    }
}

/// One-line HP/EP summary
pub fn status_line(snapshot: &BattleSnapshot) -> String {
    let ready: Vec<String> = snapshot
        .cooldowns
        .iter()
        .enumerate()
        .map(|(slot, (_, remaining))| {
            if *remaining == 0 {
                format!("[{}] ready", slot + 1)
            } else {
                format!("[{}] {:.1}s", slot + 1, *remaining as f64 / 1000.0)
            }
        })
        .collect();

    format!(
        "HYDRA {}/{} EP {}/{} | {} {}/{} | {}",
        snapshot.hydra_hp,
        snapshot.hydra_max_hp,
        snapshot.hydra_energy,
        snapshot.hydra_max_energy,
        snapshot.enemy_name.to_uppercase(),
        snapshot.enemy_hp,
        snapshot.enemy_max_hp,
        ready.join(" "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydra_shared::BattleStatus;

    #[test]
    fn test_status_line() {
        let snapshot = BattleSnapshot {
            stage: 0,
            enemy_id: "doge".into(),
            enemy_name: "Doge".into(),
            hydra_hp: 80,
            hydra_max_hp: 100,
            hydra_energy: 55,
            hydra_max_energy: 100,
            enemy_hp: 3,
            enemy_max_hp: 120,
            cooldowns: vec![("a".into(), 0), ("b".into(), 2500)],
            status: BattleStatus::Active,
            log: vec![],
            events: vec![],
        };

        assert_eq!(
            status_line(&snapshot),
            "HYDRA 80/100 EP 55/100 | DOGE 3/120 | [1] ready [2] 2.5s"
        );
    }

    #[test]
    fn test_energy_ticks_are_silent() {
        assert_eq!(describe_event(&BattleEvent::EnergyRestored { energy: 5 }, "Doge"), None);
        assert_eq!(
            describe_event(&BattleEvent::EnemyHit { damage: 42, special: true }, "Wojak").as_deref(),
            Some("Wojak unleashes its special for 42!")
        );
    }
}
