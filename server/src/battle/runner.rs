//! Scheduler that drives a [`BattleSimulator`] in real time.
//!
//! One tokio task owns the simulator and its four periodic timers. The task
//! polls timers and player commands from a single `select!` loop, so callbacks
//! never interleave: whichever deadline elapses first runs first, to completion.
//! Stopping the handle (or dropping it) aborts the task, which drops every
//! pending timer with it. Once the battle has resolved the timers are already
//! gone and only the outcome delivery remains, which callers should let finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use hydra_shared::{
    BattleOutcome, COOLDOWN_TICK_MS, ENERGY_REGEN_INTERVAL_MS, HYDRA_ATTACK_INTERVAL_MS,
    PRESENTATION_DELAY_MS,
};

use super::render::BattleRenderer;
use super::simulator::BattleSimulator;

/// Player input forwarded into a running battle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleCommand {
    UseAbility(usize),
}

/// Owns a battle about to be started
pub struct BattleRunner {
    simulator: BattleSimulator,
    renderer: Box<dyn BattleRenderer>,
    rng: StdRng,
}

impl BattleRunner {
    pub fn new(simulator: BattleSimulator, renderer: Box<dyn BattleRenderer>, rng: StdRng) -> Self {
        Self { simulator, renderer, rng }
    }

    /// Spawn the battle task. The receiver yields the outcome exactly once,
    /// `PRESENTATION_DELAY_MS` after resolution; it errors if the battle is stopped first.
    pub fn start(self) -> (BattleHandle, oneshot::Receiver<BattleOutcome>) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let resolved = Arc::new(AtomicBool::new(false));

        info!("Battle vs {} started", self.simulator.enemy().name);
        let task = tokio::spawn(run_battle(self, command_rx, outcome_tx, resolved.clone()));

        (BattleHandle { commands: command_tx, task, resolved }, outcome_rx)
    }
}

/// Control handle for a running battle
pub struct BattleHandle {
    commands: mpsc::Sender<BattleCommand>,
    task: JoinHandle<()>,
    /// Set when the simulator reaches a terminal state
    resolved: Arc<AtomicBool>,
}

impl BattleHandle {
    /// Queue an ability activation (fire and forget)
    pub fn use_ability(&self, index: usize) {
        let _ = self.commands.try_send(BattleCommand::UseAbility(index));
    }

    /// Cancel the battle and all of its timers
    pub fn stop(&self) {
        if !self.task.is_finished() {
            debug!("Battle task cancelled");
        }
        self.task.abort();
    }

    /// Whether the battle is decided and its outcome is on its way
    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }
}

impl Drop for BattleHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn periodic(period_ms: u64) -> tokio::time::Interval {
    let period = Duration::from_millis(period_ms);
    // First tick one full period after start, like a browser interval
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn run_battle(
    runner: BattleRunner,
    mut commands: mpsc::Receiver<BattleCommand>,
    outcome_tx: oneshot::Sender<BattleOutcome>,
    resolved: Arc<AtomicBool>,
) {
    let BattleRunner { mut simulator, mut renderer, mut rng } = runner;

    let mut hydra_attack = periodic(HYDRA_ATTACK_INTERVAL_MS);
    let mut enemy_attack = periodic(simulator.enemy().attack_speed_ms);
    let mut energy_regen = periodic(ENERGY_REGEN_INTERVAL_MS);
    let mut cooldown_decay = periodic(COOLDOWN_TICK_MS);

    renderer.render(&simulator.snapshot(Vec::new()));

    let outcome = loop {
        let events = tokio::select! {
            _ = hydra_attack.tick() => simulator.hydra_auto_attack(&mut rng),
            _ = enemy_attack.tick() => simulator.enemy_auto_attack(),
            _ = energy_regen.tick() => simulator.regenerate_energy(),
            _ = cooldown_decay.tick() => simulator.decay_cooldowns(),
            command = commands.recv() => match command {
                Some(BattleCommand::UseAbility(index)) => simulator.use_ability(index),
                None => {
                    debug!("Battle command channel closed");
                    return;
                }
            },
        };

        renderer.render(&simulator.snapshot(events));

        if let Some(outcome) = simulator.outcome() {
            break outcome;
        }
    };

    drop((hydra_attack, enemy_attack, energy_regen, cooldown_decay));
    resolved.store(true, Ordering::Release);

    tokio::time::sleep(Duration::from_millis(PRESENTATION_DELAY_MS)).await;
    if outcome_tx.send(outcome).is_err() {
        debug!("Battle outcome dropped, nobody is listening");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use rand::SeedableRng;
    use hydra_shared::{BattleEvent, BattleSnapshot, EnemyConfig, HydraStats, get_ability_definitions};

    #[derive(Clone, Default)]
    struct RecordingRenderer {
        frames: Arc<Mutex<Vec<BattleSnapshot>>>,
    }

    impl RecordingRenderer {
        fn count(&self) -> usize {
            self.frames.lock().unwrap().len()
        }

        fn last(&self) -> BattleSnapshot {
            self.frames.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl BattleRenderer for RecordingRenderer {
        fn render(&mut self, snapshot: &BattleSnapshot) {
            self.frames.lock().unwrap().push(snapshot.clone());
        }
    }

    fn enemy(max_hp: u32, attack: u32, attack_speed_ms: u64) -> EnemyConfig {
        EnemyConfig {
            id: "dummy".into(),
            name: "Dummy".into(),
            subtitle: String::new(),
            max_hp,
            attack,
            defense: 0,
            dodge_rate: 0.0,
            attack_speed_ms,
            special: None,
            heal_rate: None,
            token_reward: 50,
            score_value: 100,
        }
    }

    fn start(enemy: EnemyConfig) -> (BattleHandle, oneshot::Receiver<BattleOutcome>, RecordingRenderer) {
        let renderer = RecordingRenderer::default();
        let simulator = BattleSimulator::new(0, &HydraStats::initial(), enemy, get_ability_definitions(), 0);
        let runner = BattleRunner::new(simulator, Box::new(renderer.clone()), StdRng::seed_from_u64(1));
        let (handle, outcome) = runner.start();
        (handle, outcome, renderer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_victory_delivered_after_presentation_delay() {
        // Two hydra hits of 10 finish a 20 hp enemy at t = 4000ms
        let (handle, mut outcome, _renderer) = start(enemy(20, 1, 60_000));
        assert!(!handle.is_resolved());

        let early = tokio::time::timeout(Duration::from_millis(4_700), &mut outcome).await;
        assert!(early.is_err(), "outcome must wait for the presentation delay");
        assert!(handle.is_resolved());

        let result = tokio::time::timeout(Duration::from_millis(200), &mut outcome).await;
        assert_eq!(result.unwrap().unwrap(), BattleOutcome::Victory { tokens: 50, score: 100 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_defeat_from_enemy_timer() {
        let (_handle, outcome, renderer) = start(enemy(1_000, 60, 500));

        assert_eq!(outcome.await.unwrap(), BattleOutcome::Defeat);
        let last = renderer.last();
        assert_eq!(last.hydra_hp, 0);
        assert!(last.events.contains(&BattleEvent::Resolved { outcome: BattleOutcome::Defeat }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_frames_after_resolution() {
        let (handle, outcome, renderer) = start(enemy(1_000, 100, 300));

        assert_eq!(outcome.await.unwrap(), BattleOutcome::Defeat);
        let frames = renderer.count();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(renderer.count(), frames);
        assert!(handle.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_timers() {
        let (handle, outcome, renderer) = start(enemy(1_000, 1, 1_000));

        tokio::time::sleep(Duration::from_millis(2_050)).await;
        handle.stop();
        tokio::task::yield_now().await;
        let frames = renderer.count();
        let enemy_hp = renderer.last().enemy_hp;

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(renderer.count(), frames);
        assert_eq!(renderer.last().enemy_hp, enemy_hp);
        assert!(outcome.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ability_command_reaches_simulator() {
        let (handle, _outcome, renderer) = start(enemy(1_000, 1, 60_000));

        handle.use_ability(0);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let last = renderer.last();
        assert!(last.events.iter().any(|e| matches!(e, BattleEvent::AbilityUsed { damage: 25, .. })));
        assert_eq!(last.enemy_hp, 975);
        assert_eq!(last.hydra_energy, 70);
    }
}
