//! Live combat: the simulator, its scheduler and rendering adapters.

mod simulator;
mod runner;
mod render;

pub use simulator::BattleSimulator;
pub use runner::{BattleHandle, BattleRunner};
pub use render::ConsoleRenderer;
