//! Round state carried between phases
//!
//! The engine stores nothing: callers pass a `GameState` in with every
//! request and receive the successor state back.

use serde::{Deserialize, Serialize};

use crate::connections::{Connection, StageClearSymbol};
use crate::grid::Grid;
use crate::symbols::Level;

/// Bet amount and its integer paytable multiplier
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bet {
    pub amount: f64,
    /// Derived from `amount` by the resolver; inbound values are ignored
    #[serde(default)]
    pub multiplier: u32,
}

impl Bet {
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            multiplier: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    #[default]
    Base,
    FreeRounds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FreeRounds {
    pub remaining: u32,
    pub awarded: u32,
}

/// Cascade multiplier sub-state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierState {
    /// Index into the multiplier ladder
    pub step: usize,
    pub multiplier: f64,
    /// Bonus-symbol connections seen in the current cascade sequence
    pub bonus_matches: u32,
}

impl MultiplierState {
    pub fn new() -> Self {
        Self {
            step: 0,
            multiplier: 1.0,
            bonus_matches: 0,
        }
    }
}

impl Default for MultiplierState {
    fn default() -> Self {
        Self::new()
    }
}

/// Full round state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub bet: Bet,
    pub level: Level,
    pub grid: Grid,
    /// Stage-clear symbols collected towards the next level
    pub stage_progress: u32,
    pub mode: GameMode,
    pub free_rounds: FreeRounds,
    pub multiplier: MultiplierState,
    /// Amount won by the last phase
    pub total_win: f64,
    /// More cascade steps are due
    pub cascading: bool,
    pub last_connections: Vec<Connection>,
    /// Cascade steps taken in the current sequence
    pub cascade_count: u32,
    /// Stage-clear occurrences waiting for a stage-clear phase
    pub pending_stage_clears: Vec<StageClearSymbol>,
}

impl GameState {
    /// Level 1, empty grid, base mode, 1× multiplier
    pub fn new() -> Self {
        Self {
            bet: Bet::default(),
            level: Level::One,
            grid: Grid::default(),
            stage_progress: 0,
            mode: GameMode::Base,
            free_rounds: FreeRounds::default(),
            multiplier: MultiplierState::new(),
            total_win: 0.0,
            cascading: false,
            last_connections: Vec::new(),
            cascade_count: 0,
            pending_stage_clears: Vec::new(),
        }
    }

    /// Builder: set the bet amount
    pub fn with_bet(mut self, amount: f64) -> Self {
        self.bet = Bet::new(amount);
        self
    }

    /// Builder: set the level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Builder: set the grid
    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = grid;
        self
    }

    pub fn in_free_rounds(&self) -> bool {
        self.mode == GameMode::FreeRounds
    }

    pub fn has_pending_stage_clears(&self) -> bool {
        !self.pending_stage_clears.is_empty()
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
