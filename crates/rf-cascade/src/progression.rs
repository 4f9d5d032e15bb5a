//! Progression and multiplier state machine
//!
//! ```text
//! level:      1 ──(target)──> 2 ──(target)──> 3 ──(target)──> 1
//! mode:       base ──(trigger)──> free_rounds ──(remaining = 0)──> base
//! multiplier: 1x ─(bonus)─> 2x ─> 3x ─> 4x ─> 5x ─> 10x (capped)
//!             reset on a fresh spin or when a cascade sequence ends
//! ```

use crate::config::EngineConfig;
use crate::connections::{Connection, count_trigger_symbols};
use crate::paytable::round_cents;
use crate::state::{FreeRounds, GameMode, GameState, MultiplierState};
use crate::symbols::Level;

// ═══════════════════════════════════════════════════════════════════════════
// MULTIPLIER
// ═══════════════════════════════════════════════════════════════════════════

/// Step the multiplier up (capped at the top of the ladder) and count the
/// bonus match; returns the new multiplier
pub fn escalate_multiplier(multiplier: &mut MultiplierState, config: &EngineConfig) -> f64 {
    multiplier.step = (multiplier.step + 1).min(config.max_ladder_step());
    multiplier.multiplier = config.ladder_multiplier(multiplier.step);
    multiplier.bonus_matches += 1;
    multiplier.multiplier
}

/// Back to step 0 / 1x
pub fn reset_multiplier(multiplier: &mut MultiplierState) {
    *multiplier = MultiplierState::new();
}

/// Price connections in place and return the phase total
///
/// Bonus-symbol connections are handled first: each one escalates the
/// multiplier and is then priced with the escalated value. Base connections
/// are priced afterwards with whatever multiplier is active. The slice order
/// is left untouched.
pub fn price_connections(
    connections: &mut [Connection],
    state: &mut GameState,
    config: &EngineConfig,
) -> f64 {
    let level = state.level;
    let bet_multiplier = state.bet.multiplier;
    let mut total = 0.0;

    for connection in connections.iter_mut().filter(|c| c.is_bonus()) {
        let multiplier = escalate_multiplier(&mut state.multiplier, config);
        let base = config.payout(connection.symbol, connection.count, level, bet_multiplier);
        connection.payout = round_cents(base * multiplier);
        total += connection.payout;
        log::debug!(
            "Bonus connection of {} escalated multiplier to {}x",
            connection.count,
            multiplier
        );
    }

    let multiplier = state.multiplier.multiplier;
    for connection in connections.iter_mut().filter(|c| !c.is_bonus()) {
        let base = config.payout(connection.symbol, connection.count, level, bet_multiplier);
        connection.payout = round_cents(base * multiplier);
        total += connection.payout;
    }

    round_cents(total)
}

// ═══════════════════════════════════════════════════════════════════════════
// STAGE PROGRESS
// ═══════════════════════════════════════════════════════════════════════════

/// Outcome of adding collected stage-clear symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageAdvance {
    pub advanced: bool,
    pub old_level: Level,
    pub new_level: Level,
}

/// Add `found` to stage progress and advance the level when the target is met
///
/// Progress above the target carries into the next level in full. Wrapping from the top level drops it when
/// `progression.reset_progress_on_wrap` is set.
pub fn accumulate_stage_progress(
    state: &mut GameState,
    found: u32,
    config: &EngineConfig,
) -> StageAdvance {
    let target = config.progression.stage_target;
    let old_level = state.level;
    state.stage_progress += found;

    if state.stage_progress < target {
        return StageAdvance {
            advanced: false,
            old_level,
            new_level: old_level,
        };
    }

    let excess = state.stage_progress - target;
    let new_level = old_level.next();
    state.stage_progress = if old_level.is_top() && config.progression.reset_progress_on_wrap {
        0
    } else {
        excess
    };
    if state.stage_progress >= target {
        log::warn!(
            "Carried progress {} already meets the target {}; next collection advances again",
            state.stage_progress,
            target
        );
    }
    state.level = new_level;

    log::info!(
        "Stage target reached: level {} → {}, carried progress {}",
        old_level,
        new_level,
        state.stage_progress
    );

    StageAdvance {
        advanced: true,
        old_level,
        new_level,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FREE ROUNDS
// ═══════════════════════════════════════════════════════════════════════════

/// Enter free rounds when in base mode and the grid holds the trigger;
/// returns whether free rounds started
pub fn check_free_round_trigger(state: &mut GameState, config: &EngineConfig) -> bool {
    if state.mode != GameMode::Base || count_trigger_symbols(&state.grid) == 0 {
        return false;
    }
    let awarded = config.progression.free_rounds;
    state.mode = GameMode::FreeRounds;
    state.free_rounds = FreeRounds {
        remaining: awarded,
        awarded,
    };
    log::info!(
        "Free rounds triggered: {} awarded at {}x",
        awarded,
        state.multiplier.multiplier
    );
    true
}

/// Spend one free round; returns whether free rounds just ended
///
/// The active multiplier is left alone.
pub fn consume_free_round(state: &mut GameState) -> bool {
    if state.mode != GameMode::FreeRounds {
        return false;
    }
    state.free_rounds.remaining = state.free_rounds.remaining.saturating_sub(1);
    if state.free_rounds.remaining > 0 {
        return false;
    }
    state.mode = GameMode::Base;
    state.free_rounds = FreeRounds::default();
    log::info!(
        "Free rounds ended, multiplier stays at {}x",
        state.multiplier.multiplier
    );
    true
}
