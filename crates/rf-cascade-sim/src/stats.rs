//! Aggregated results of simulated rounds

use rf_cascade::OutcomeResolution;
use serde::{Deserialize, Serialize};

/// Session statistics, mergeable across workers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub rounds: u64,
    pub phases: u64,
    pub total_bet: f64,
    pub total_win: f64,
    pub wins: u64,
    pub losses: u64,
    pub stage_clears: u64,
    pub level_advances: u64,
    pub free_round_triggers: u64,
    pub free_rounds_played: u64,
    pub oracle_calls: u64,
    pub regenerated_losses: u64,
    pub enforced_losses: u64,
    pub bypasses: u64,
    pub max_cascade_depth: u32,
    pub max_win_ratio: f64,
}

impl SessionStats {
    /// Return to player, in percent
    pub fn rtp(&self) -> f64 {
        if self.total_bet > 0.0 {
            (self.total_win / self.total_bet) * 100.0
        } else {
            0.0
        }
    }

    /// Share of rounds that paid anything, in percent
    pub fn hit_rate(&self) -> f64 {
        if self.rounds > 0 {
            (self.wins as f64 / self.rounds as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Share of oracle refusals that could not be enforced, in percent
    pub fn bypass_rate(&self) -> f64 {
        let refusals = self.regenerated_losses + self.enforced_losses + self.bypasses;
        if refusals > 0 {
            (self.bypasses as f64 / refusals as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn record_resolution(&mut self, resolution: OutcomeResolution) {
        match resolution {
            OutcomeResolution::NotConsulted => return,
            OutcomeResolution::Win => {}
            OutcomeResolution::LossRegenerated => self.regenerated_losses += 1,
            OutcomeResolution::LossEnforced => self.enforced_losses += 1,
            OutcomeResolution::LossBypassed => self.bypasses += 1,
        }
        self.oracle_calls += 1;
    }

    /// Close a round: `cost` charged, `win` paid over all its phases
    pub fn record_round(&mut self, cost: f64, win: f64, bet: f64) {
        self.rounds += 1;
        self.total_bet += cost;
        self.total_win += win;
        if win > 0.0 {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        if bet > 0.0 {
            self.max_win_ratio = self.max_win_ratio.max(win / bet);
        }
    }

    pub fn merge(&mut self, other: &SessionStats) {
        self.rounds += other.rounds;
        self.phases += other.phases;
        self.total_bet += other.total_bet;
        self.total_win += other.total_win;
        self.wins += other.wins;
        self.losses += other.losses;
        self.stage_clears += other.stage_clears;
        self.level_advances += other.level_advances;
        self.free_round_triggers += other.free_round_triggers;
        self.free_rounds_played += other.free_rounds_played;
        self.oracle_calls += other.oracle_calls;
        self.regenerated_losses += other.regenerated_losses;
        self.enforced_losses += other.enforced_losses;
        self.bypasses += other.bypasses;
        self.max_cascade_depth = self.max_cascade_depth.max(other.max_cascade_depth);
        self.max_win_ratio = self.max_win_ratio.max(other.max_win_ratio);
    }
}
