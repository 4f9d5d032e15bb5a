//! Restricted loss enforcement
//!
//! When a continuation phase (stage-clear or cascade) produced a win the
//! oracle refused, the enforcer tries to break every connection by redrawing
//! only the cells that were just refilled. Everything else on the board stays
//! where the player saw it.

use std::collections::BTreeSet;

use rand::prelude::*;

use crate::config::{EnforcementEffort, EngineConfig};
use crate::connections::find_connections;
use crate::generator::SymbolSampler;
use crate::grid::{Grid, Position};
use crate::symbols::{Level, Symbol};

/// Result of a restricted loss attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossEnforcement {
    /// The grid had no connections to begin with
    AlreadyLosing,
    /// A mutated copy without connections was committed
    Enforced { attempts: usize },
    /// No attempt broke every connection; the grid is untouched
    Impossible { attempts: usize },
}

impl LossEnforcement {
    pub fn is_success(&self) -> bool {
        !matches!(self, LossEnforcement::Impossible { .. })
    }
}

/// Break every connection by redrawing cells from `eligible` only
pub fn force_loss_restricted<R: Rng + ?Sized>(
    config: &EngineConfig,
    grid: &mut Grid,
    level: Level,
    rng: &mut R,
    eligible: &[Position],
    effort: EnforcementEffort,
) -> LossEnforcement {
    let initial = find_connections(grid, level);
    if initial.is_empty() {
        return LossEnforcement::AlreadyLosing;
    }

    let eligible: Vec<Position> = eligible
        .iter()
        .copied()
        .filter(|p| grid.contains(*p))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    log::debug!(
        "Enforcing loss on {} connection(s) through {} eligible cell(s)",
        initial.len(),
        eligible.len()
    );

    let sampler = SymbolSampler::for_level(config, level);
    let mutations = effort.mutations.min(eligible.len());

    for attempt in 1..=effort.max_attempts {
        if mutations == 0 {
            break;
        }
        let mut candidate = grid.clone();
        let picked: Vec<Position> = eligible.choose_multiple(rng, mutations).copied().collect();

        for pos in picked {
            let allow_trigger = !candidate.contains_symbol_elsewhere(Symbol::TRIGGER, pos);
            let symbol = sampler.sample(rng, allow_trigger);
            candidate.set(pos, Some(symbol));

            if find_connections(&candidate, level).is_empty() {
                log::debug!(
                    "Loss enforced on attempt {}: ({}, {}) → {}",
                    attempt,
                    pos.x,
                    pos.y,
                    symbol
                );
                *grid = candidate;
                return LossEnforcement::Enforced { attempts: attempt };
            }
        }
    }

    LossEnforcement::Impossible {
        attempts: if mutations == 0 { 0 } else { effort.max_attempts },
    }
}
