//! Surgical removal and column gravity
//!
//! Only the given cells are vacated, and only the columns that lost a cell
//! move. Surviving cells fall to the bottom keeping their relative order;
//! vacated cells at the top are refilled, top-down.

use std::collections::BTreeSet;

use rand::prelude::*;

use crate::config::{EngineConfig, RefillConfig};
use crate::generator::SymbolSampler;
use crate::grid::{Grid, Position};
use crate::symbols::{Level, Symbol};

/// Which phase is refilling; sets the bonus-symbol chance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillContext {
    /// Refill after collecting stage-clear symbols
    StageClear,
    /// Refill after removing connections in a cascade step
    Cascade,
}

impl RefillContext {
    pub fn bonus_chance(self, refill: &RefillConfig) -> f64 {
        match self {
            RefillContext::StageClear => refill.stage_clear_bonus_chance,
            RefillContext::Cascade => refill.cascade_bonus_chance,
        }
    }
}

/// Vacate `positions`, compact affected columns and refill them
///
/// Out-of-bounds and duplicate positions are ignored. Returns the newly
/// filled positions, column by column in ascending order, top-down within a
/// column.
pub fn clear_and_refill<R: Rng + ?Sized>(
    config: &EngineConfig,
    grid: &mut Grid,
    positions: &[Position],
    level: Level,
    rng: &mut R,
    context: RefillContext,
) -> Vec<Position> {
    let removed: BTreeSet<Position> = positions
        .iter()
        .copied()
        .filter(|p| grid.contains(*p))
        .collect();
    if removed.is_empty() {
        return Vec::new();
    }

    for pos in &removed {
        log::debug!("Removing {:?} at ({}, {})", grid.get(*pos), pos.x, pos.y);
        grid.clear(*pos);
    }

    let columns: BTreeSet<usize> = removed.iter().map(|p| p.x).collect();
    let sampler = SymbolSampler::for_level(config, level);
    let chance = context.bonus_chance(&config.refill);
    let mut filled = Vec::new();

    for x in columns {
        let vacated = compact_column(grid, x);
        for y in 0..vacated {
            let pos = Position::new(x, y);
            let allow_trigger = !grid.contains_symbol(Symbol::TRIGGER);
            let symbol = if rng.random::<f64>() < chance && allow_trigger {
                Symbol::BONUS
            } else {
                sampler.sample(rng, allow_trigger)
            };
            grid.set(pos, Some(symbol));
            log::debug!("Refilled ({}, {}) with {}", x, y, symbol);
            filled.push(pos);
        }
    }

    filled
}

/// Drop a column's symbols to the bottom; returns the number of empty cells
/// left at the top
fn compact_column(grid: &mut Grid, x: usize) -> usize {
    let size = grid.size();
    let survivors: Vec<Symbol> = grid.column(x).into_iter().flatten().collect();
    let vacated = size - survivors.len();

    for y in 0..vacated {
        grid.clear(Position::new(x, y));
    }
    for (offset, symbol) in survivors.into_iter().enumerate() {
        grid.set(Position::new(x, vacated + offset), Some(symbol));
    }

    vacated
}
