//! Session host for one player: routes console commands into the reducer,
//! runs battles for the current stage and reports finished runs to the
//! leaderboard.

use std::time::Instant;
use futures::future::OptionFuture;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::oneshot;

use hydra_shared::{
    BattleOutcome, GameScreen, LeaderboardEntry, enemy_for_stage, get_ability_definitions,
    get_shop_items, stage_count,
};

use crate::battle::{BattleHandle, BattleRunner, BattleSimulator, ConsoleRenderer};
use crate::commands::{help_text, parse_command, Command};
use crate::leaderboard::LeaderboardHandle;
use crate::metrics::SharedMetrics;
use crate::progression::{reduce, validate_player_name, Action, GameState};
use crate::shop::{Ledger, PurchaseOutcome, Shop};

/// Whether the console loop keeps going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

struct ActiveBattle {
    handle: BattleHandle,
    outcome: oneshot::Receiver<BattleOutcome>,
}

enum HostEvent {
    Line(std::io::Result<Option<String>>),
    BattleOver(Result<BattleOutcome, oneshot::error::RecvError>),
}

pub struct GameHost<L: Ledger> {
    state: GameState,
    battle: Option<ActiveBattle>,
    shop: Shop<L>,
    leaderboard: LeaderboardHandle,
    metrics: SharedMetrics,
    /// Seeds one rng per battle
    rng: StdRng,
}

impl<L: Ledger> GameHost<L> {
    pub fn new(shop: Shop<L>, leaderboard: LeaderboardHandle, metrics: SharedMetrics, rng: StdRng) -> Self {
        Self {
            state: GameState::new(),
            battle: None,
            shop,
            leaderboard,
            metrics,
            rng,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub fn battle_running(&self) -> bool {
        self.battle.is_some()
    }

    /// Read commands until `quit` or end of input, resolving battles as they finish
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R) {
        println!("=== HYDRA ===  (type 'help' for commands)");
        self.print_screen();

        let mut lines = input.lines();
        loop {
            let event = {
                let outcome = OptionFuture::from(self.battle.as_mut().map(|b| &mut b.outcome));
                tokio::select! {
                    line = lines.next_line() => HostEvent::Line(line),
                    Some(result) = outcome => HostEvent::BattleOver(result),
                }
            };

            match event {
                HostEvent::Line(Ok(Some(line))) => {
                    if self.handle_line(&line).await == Flow::Quit {
                        break;
                    }
                }
                HostEvent::Line(Ok(None)) => break,
                HostEvent::Line(Err(e)) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
                HostEvent::BattleOver(result) => self.finish_battle(result),
            }
        }

        self.stop_battle();
        info!("Session for {} ended", self.state.player_name.as_deref().unwrap_or("unnamed player"));
    }

    /// Handle one console line
    pub async fn handle_line(&mut self, line: &str) -> Flow {
        match parse_command(line) {
            None => Flow::Continue,
            Some(Err(message)) => {
                println!("{}", message);
                Flow::Continue
            }
            Some(Ok(command)) => self.execute(command).await,
        }
    }

    async fn execute(&mut self, command: Command) -> Flow {
        match command {
            Command::Name(raw) => self.enter_name(&raw),
            Command::Start => {
                if !matches!(self.state.screen, GameScreen::Start | GameScreen::Defeat | GameScreen::EndOfRun) {
                    println!("Can't start a run from the {} screen", self.state.screen.name());
                } else if self.battle.is_some() {
                    println!("The last battle is still finishing");
                } else {
                    self.dispatch(Action::StartGame);
                }
            }
            Command::Ability(index) => match &self.battle {
                Some(battle) => battle.handle.use_ability(index),
                None => println!("No battle in progress"),
            },
            Command::Shop => {
                self.dispatch(Action::OpenShop);
                if self.state.screen == GameScreen::Shop {
                    self.print_shop().await;
                } else {
                    println!("The shop is not available here");
                }
            }
            Command::Buy(item_id) => self.buy(&item_id).await,
            Command::Leaderboard => {
                self.dispatch(Action::OpenLeaderboard);
                if self.state.screen == GameScreen::Leaderboard {
                    self.print_leaderboard().await;
                } else {
                    println!("The leaderboard is not available here");
                }
            }
            Command::Back => self.dispatch(Action::Back),
            Command::Next => {
                if self.state.screen == GameScreen::Victory {
                    self.dispatch(Action::NextBattle);
                    if self.state.screen == GameScreen::EndOfRun {
                        self.submit_score();
                    }
                } else {
                    println!("Nothing to continue to");
                }
            }
            Command::Reset => self.dispatch(Action::Reset),
            Command::Status => self.print_status(),
            Command::Help => println!("{}", help_text()),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Confirm the player name if still on the name-entry screen
    pub fn enter_name(&mut self, raw: &str) {
        if self.state.screen != GameScreen::NameEntry {
            println!("Your name is already set");
            return;
        }
        match validate_player_name(raw) {
            Ok(name) => {
                self.touch_player(&name);
                self.dispatch(Action::EnterName(name));
            }
            Err(e) => println!("{}", e),
        }
    }

    async fn buy(&mut self, item_id: &str) {
        if self.state.screen != GameScreen::Shop {
            println!("Open the shop first");
            return;
        }

        let (next, outcome) = self.shop.buy(&self.state, item_id).await;
        self.state = next;
        match outcome {
            PurchaseOutcome::Purchased { item_id, via_wallet } => {
                let paid = if via_wallet { "wallet" } else { "tokens" };
                println!("Bought {} with {}. Tokens: {}", item_id, paid, self.state.tokens);
            }
            PurchaseOutcome::UnknownItem => println!("No such item: {}", item_id),
            PurchaseOutcome::SoldOut => println!("{} is sold out", item_id),
            PurchaseOutcome::InsufficientFunds => println!("Not enough tokens"),
            PurchaseOutcome::LedgerFailed(reason) => println!("Wallet error: {}", reason),
        }
    }

    /// Reduce an action and bring the running battle in line with the new screen
    fn dispatch(&mut self, action: Action) {
        let before = self.state.screen;
        debug!("Dispatching {:?}", action);
        self.state = reduce(&self.state, action);

        if self.state.screen != GameScreen::Battle {
            self.leave_battle();
        } else if self.battle.is_none() {
            self.start_battle();
        }

        if self.state.screen != before {
            self.print_screen();
        }
    }

    fn start_battle(&mut self) {
        let simulator = BattleSimulator::for_stage(
            self.state.current_battle,
            &self.state.hydra,
            self.state.cooldown_reduction_level(),
        );
        let rng = StdRng::seed_from_u64(self.rng.gen());
        let (handle, outcome) = BattleRunner::new(simulator, Box::new(ConsoleRenderer), rng).start();
        self.battle = Some(ActiveBattle { handle, outcome });
    }

    /// Navigating away cancels a battle still in progress. A resolved one
    /// keeps running until it has delivered its outcome.
    fn leave_battle(&mut self) {
        match &self.battle {
            Some(battle) if battle.handle.is_resolved() => {
                debug!("Battle already decided, waiting for its outcome");
            }
            _ => self.stop_battle(),
        }
    }

    fn stop_battle(&mut self) {
        if let Some(battle) = self.battle.take() {
            battle.handle.stop();
        }
    }

    fn finish_battle(&mut self, result: Result<BattleOutcome, oneshot::error::RecvError>) {
        self.battle = None;
        match result {
            Ok(BattleOutcome::Victory { tokens, score }) => {
                self.dispatch(Action::WinBattle { tokens, score });
            }
            Ok(BattleOutcome::Defeat) => {
                self.dispatch(Action::LoseGame);
                self.submit_score();
            }
            Err(_) => debug!("Battle ended without an outcome"),
        }
    }

    /// Report the run's score (fire and forget)
    fn submit_score(&self) {
        let Some(name) = self.state.player_name.clone() else {
            return;
        };
        if self.state.total_score == 0 {
            return;
        }

        self.touch_player(&name);
        self.leaderboard.submit(LeaderboardEntry {
            name,
            score: self.state.total_score as i64,
            tokens: Some(self.state.tokens as i64),
        });
    }

    fn touch_player(&self, name: &str) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.touch_player(name, Instant::now());
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    fn print_screen(&self) {
        match self.state.screen {
            GameScreen::NameEntry => println!("Enter your name with: name <your name>"),
            GameScreen::Start => println!(
                "Welcome, {}! Type 'start' to fight, 'shop' to upgrade.",
                self.state.player_name.as_deref().unwrap_or("hero")
            ),
            GameScreen::Battle => {
                let enemy = enemy_for_stage(self.state.current_battle);
                println!(
                    "--- Stage {}/{}: {} ({}) ---",
                    self.state.current_battle.min(stage_count() - 1) + 1,
                    stage_count(),
                    enemy.name,
                    enemy.subtitle
                );
                let abilities: Vec<String> = get_ability_definitions()
                    .iter()
                    .enumerate()
                    .map(|(slot, a)| format!("[{}] {}", slot + 1, a.name))
                    .collect();
                println!("Abilities: {}", abilities.join("  "));
            }
            GameScreen::Victory => {
                if self.state.is_last_battle() {
                    println!("Victory! Type 'next' to finish the run.");
                } else {
                    println!("Victory! Type 'next' for the next battle or 'shop' to upgrade.");
                }
            }
            GameScreen::Defeat => println!(
                "Defeated with {} points. Type 'start' to try again or 'leaderboard'.",
                self.state.total_score
            ),
            GameScreen::EndOfRun => println!(
                "Run complete! Final score {}, {} tokens. Type 'start' to play again.",
                self.state.total_score, self.state.tokens
            ),
            GameScreen::Shop => {}
            GameScreen::Leaderboard => {}
        }
    }

    fn print_status(&self) {
        let state = &self.state;
        let hydra = &state.hydra;
        println!("Player: {}", state.player_name.as_deref().unwrap_or("-"));
        println!("Screen: {}  Stage: {}/{}", state.screen.name(), state.current_battle + 1, stage_count());
        println!(
            "Hydra: HP {}/{}  EP {}/{}  ATK {}  Heads {:?}",
            hydra.hp, hydra.max_hp, hydra.energy, hydra.max_energy, hydra.attack, hydra.head_power
        );
        println!(
            "Tokens: {}  Score: {}  Cooldown level: {}",
            state.tokens,
            state.total_score,
            state.cooldown_reduction_level()
        );
    }

    async fn print_shop(&self) {
        match self.shop.wallet_balance().await {
            Some(balance) => println!("=== SHOP === (wallet: {} tokens)", balance),
            None => println!("=== SHOP === ({} tokens)", self.state.tokens),
        }
        for item in get_shop_items() {
            println!(
                "  {:<11} {:<24} {:>3} tokens  {}/{}  {}",
                item.id,
                item.name,
                item.cost,
                self.state.purchase_count(&item.id),
                item.max_purchases,
                item.description
            );
        }
        println!("Type 'buy <id>' or 'back'.");
    }

    async fn print_leaderboard(&self) {
        let entries = self.leaderboard.fetch().await;
        println!("=== LEADERBOARD ===");
        if entries.is_empty() {
            println!("  No scores yet");
        }
        for (rank, entry) in entries.iter().enumerate() {
            println!("  {:>2}. {:<16} {:>6}", rank + 1, entry.name, entry.score);
        }
        println!("Type 'back' to return.");
    }
}

impl<L: Ledger> Drop for GameHost<L> {
    fn drop(&mut self) {
        self.stop_battle();
    }
}
