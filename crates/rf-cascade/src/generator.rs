//! Grid generation
//!
//! Cells are drawn independently from the level's weight table. The trigger
//! symbol may appear at most once per grid: after it is placed, the remaining
//! cells draw from the table with the trigger removed.

use rand::distr::weighted::WeightedIndex;
use rand::prelude::*;

use crate::config::{EngineConfig, LevelConfig};
use crate::connections::find_connections;
use crate::grid::{Grid, Position};
use crate::retry::{Retry, retry_bounded};
use crate::symbols::{Level, Symbol};

/// Redraws allowed when a run neighbour must differ from the run symbol
const REDRAW_ATTEMPTS: usize = 32;

/// First connection-forming symbol other than `symbol`
fn other_forming_symbol(symbol: Symbol) -> Symbol {
    Symbol::CONNECTION_FORMING
        .iter()
        .copied()
        .find(|s| *s != symbol)
        .unwrap_or(Symbol::Purple)
}

/// One weighted table
#[derive(Debug, Clone)]
struct WeightTable {
    symbols: Vec<Symbol>,
    index: Option<WeightedIndex<f64>>,
}

impl WeightTable {
    fn new(weights: Vec<(Symbol, f64)>) -> Self {
        let index = WeightedIndex::new(weights.iter().map(|(_, w)| *w)).ok();
        if index.is_none() {
            log::warn!("Unusable weight table, falling back to uniform connection-forming symbols");
        }
        Self {
            symbols: weights.into_iter().map(|(s, _)| s).collect(),
            index,
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Symbol {
        match &self.index {
            Some(index) => self.symbols[index.sample(rng)],
            None => {
                Symbol::CONNECTION_FORMING[rng.random_range(0..Symbol::CONNECTION_FORMING.len())]
            }
        }
    }
}

/// Weighted symbol sampler for one level
#[derive(Debug, Clone)]
pub struct SymbolSampler {
    with_trigger: WeightTable,
    without_trigger: WeightTable,
}

impl SymbolSampler {
    pub fn new(level: &LevelConfig) -> Self {
        Self {
            with_trigger: WeightTable::new(level.weight_list(true)),
            without_trigger: WeightTable::new(level.weight_list(false)),
        }
    }

    pub fn for_level(config: &EngineConfig, level: Level) -> Self {
        Self::new(&config.level(level))
    }

    /// Draw a symbol; with `allow_trigger == false` the trigger is removed
    /// from the table and the rest renormalized
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, allow_trigger: bool) -> Symbol {
        if allow_trigger {
            self.with_trigger.sample(rng)
        } else {
            self.without_trigger.sample(rng)
        }
    }
}

/// A generated grid and whether the forced fallback produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub grid: Grid,
    pub forced: bool,
}

/// Grid generator bound to an engine configuration
#[derive(Debug, Clone, Copy)]
pub struct GridGenerator<'a> {
    config: &'a EngineConfig,
}

impl<'a> GridGenerator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// Independent weighted draw for every cell
    pub fn generate<R: Rng + ?Sized>(&self, level: Level, rng: &mut R) -> Grid {
        let sampler = SymbolSampler::for_level(self.config, level);
        self.generate_with_sampler(&sampler, level, rng)
    }

    fn generate_with_sampler<R: Rng + ?Sized>(
        &self,
        sampler: &SymbolSampler,
        level: Level,
        rng: &mut R,
    ) -> Grid {
        let size = level.grid_size();
        let mut grid = Grid::new(size);
        let mut trigger_placed = false;

        for y in 0..size {
            for x in 0..size {
                let symbol = sampler.sample(rng, !trigger_placed);
                trigger_placed |= symbol.is_trigger();
                grid.set(Position::new(x, y), Some(symbol));
            }
        }

        grid
    }

    /// Draw until the grid holds a connection, else force one
    pub fn generate_with_win<R: Rng + ?Sized>(&self, level: Level, rng: &mut R) -> Generated {
        let sampler = SymbolSampler::for_level(self.config, level);
        let result = retry_bounded(self.config.generation.max_attempts, |_| {
            let grid = self.generate_with_sampler(&sampler, level, rng);
            (!find_connections(&grid, level).is_empty()).then_some(grid)
        });

        match result {
            Retry::Found { value, attempts } => {
                log::debug!("Winning grid for level {} after {} draws", level, attempts);
                Generated {
                    grid: value,
                    forced: false,
                }
            }
            Retry::Exhausted { attempts } => {
                log::debug!("No natural win in {} draws, forcing one", attempts);
                Generated {
                    grid: self.force_win(level, rng),
                    forced: true,
                }
            }
        }
    }

    /// Draw until the grid holds no connection, else build one cell by cell
    pub fn generate_with_loss<R: Rng + ?Sized>(&self, level: Level, rng: &mut R) -> Generated {
        let sampler = SymbolSampler::for_level(self.config, level);
        let result = retry_bounded(self.config.generation.max_attempts, |_| {
            let grid = self.generate_with_sampler(&sampler, level, rng);
            find_connections(&grid, level).is_empty().then_some(grid)
        });

        match result {
            Retry::Found { value, attempts } => {
                log::debug!("Losing grid for level {} after {} draws", level, attempts);
                Generated {
                    grid: value,
                    forced: false,
                }
            }
            Retry::Exhausted { attempts } => {
                log::debug!("No natural loss in {} draws, forcing one", attempts);
                Generated {
                    grid: force_loss(level, rng),
                    forced: true,
                }
            }
        }
    }

    /// Random grid with a horizontal run of exactly the minimum length
    ///
    /// Neighbours of the run that share its symbol are redrawn so the run is
    /// a connection of exactly the minimum size.
    pub fn force_win<R: Rng + ?Sized>(&self, level: Level, rng: &mut R) -> Grid {
        let sampler = SymbolSampler::for_level(self.config, level);
        let mut grid = self.generate_with_sampler(&sampler, level, rng);
        let size = level.grid_size();
        let run = level.min_connection().min(size);

        let symbol = if rng.random::<f64>() < self.config.generation.force_win_bonus_chance {
            Symbol::BONUS
        } else {
            Symbol::CONNECTION_FORMING[rng.random_range(0..Symbol::CONNECTION_FORMING.len())]
        };

        let start_x = rng.random_range(0..=size - run);
        let y = rng.random_range(0..size);
        let cells: Vec<Position> = (start_x..start_x + run).map(|x| Position::new(x, y)).collect();
        for pos in &cells {
            grid.set(*pos, Some(symbol));
        }

        for pos in &cells {
            let neighbors: Vec<Position> = grid.neighbors(*pos).collect();
            for next in neighbors {
                if cells.contains(&next) || grid.get(next) != Some(symbol) {
                    continue;
                }
                let allow_trigger = !grid.contains_symbol(Symbol::TRIGGER);
                let replacement = retry_bounded(REDRAW_ATTEMPTS, |_| {
                    Some(sampler.sample(rng, allow_trigger)).filter(|c| *c != symbol)
                })
                .or_else(|| other_forming_symbol(symbol));
                grid.set(next, Some(replacement));
            }
        }

        log::debug!(
            "Forced {} run of {} at row {} from column {}",
            symbol,
            run,
            y,
            start_x
        );
        grid
    }
}

/// Build a grid where no cell repeats its left or upper neighbour
///
/// Only connection-forming symbols are used. With six symbols and at most two
/// exclusions a candidate always exists, so no two orthogonal neighbours match.
pub fn force_loss<R: Rng + ?Sized>(level: Level, rng: &mut R) -> Grid {
    let size = level.grid_size();
    let mut grid = Grid::new(size);

    for y in 0..size {
        for x in 0..size {
            let left = (x > 0).then(|| grid.get(Position::new(x - 1, y))).flatten();
            let up = (y > 0).then(|| grid.get(Position::new(x, y - 1))).flatten();
            let candidates: Vec<Symbol> = Symbol::CONNECTION_FORMING
                .iter()
                .copied()
                .filter(|s| Some(*s) != left && Some(*s) != up)
                .collect();

            let symbol = match candidates.choose(rng) {
                Some(s) => *s,
                None => {
                    Symbol::CONNECTION_FORMING[rng.random_range(0..Symbol::CONNECTION_FORMING.len())]
                }
            };
            grid.set(Position::new(x, y), Some(symbol));
        }
    }

    grid
}
