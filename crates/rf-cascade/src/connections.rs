//! Connection detection
//!
//! A connection is a 4-connected group of one connection-forming symbol whose
//! size reaches the level minimum. Groups are found with an explicit-stack
//! flood fill seeded from every unvisited cell in row-major order.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grid::{Grid, Position};
use crate::symbols::{Level, Symbol};

/// A winning group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub symbol: Symbol,
    pub positions: Vec<Position>,
    pub count: usize,
    /// Priced amount (0 until the resolver prices it)
    pub payout: f64,
}

impl Connection {
    pub fn new(symbol: Symbol, positions: Vec<Position>) -> Self {
        Self {
            symbol,
            count: positions.len(),
            positions,
            payout: 0.0,
        }
    }

    pub fn is_bonus(&self) -> bool {
        self.symbol.is_bonus()
    }
}

/// One occurrence of the level's stage-clear symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageClearSymbol {
    pub symbol: Symbol,
    pub position: Position,
}

/// All connections on the grid, in row-major order of their first cell
pub fn find_connections(grid: &Grid, level: Level) -> Vec<Connection> {
    let min = level.min_connection();
    let mut visited = vec![false; grid.size() * grid.size()];
    let mut connections = Vec::new();

    for (pos, cell) in grid.iter() {
        let Some(symbol) = cell else { continue };
        if !symbol.forms_connections() || visited[pos.y * grid.size() + pos.x] {
            continue;
        }
        let group = flood_fill(grid, pos, symbol, &mut visited);
        if group.len() >= min {
            connections.push(Connection::new(symbol, group));
        }
    }

    connections
}

/// Collect the component of `symbol` containing `start`
fn flood_fill(grid: &Grid, start: Position, symbol: Symbol, visited: &mut [bool]) -> Vec<Position> {
    let size = grid.size();
    let mut group = Vec::new();
    let mut stack = vec![start];
    visited[start.y * size + start.x] = true;

    while let Some(pos) = stack.pop() {
        group.push(pos);
        for next in grid.neighbors(pos) {
            let idx = next.y * size + next.x;
            if !visited[idx] && grid.get(next) == Some(symbol) {
                visited[idx] = true;
                stack.push(next);
            }
        }
    }

    group
}

/// Does the grid hold at least one connection?
pub fn has_potential_connections(grid: &Grid, level: Level) -> bool {
    !find_connections(grid, level).is_empty()
}

/// Split into (bonus-symbol connections, base connections), keeping order
pub fn partition_connections(connections: Vec<Connection>) -> (Vec<Connection>, Vec<Connection>) {
    connections.into_iter().partition(Connection::is_bonus)
}

/// Union of all connection cells, deduplicated
pub fn connection_positions(connections: &[Connection]) -> Vec<Position> {
    connections
        .iter()
        .flat_map(|c| c.positions.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Occurrences of the level's stage-clear symbol in row-major order
///
/// Stage-clear symbols of other levels are ignored.
pub fn find_stage_clear_symbols(grid: &Grid, level: Level) -> Vec<StageClearSymbol> {
    let target = level.stage_clear_symbol();
    grid.iter()
        .filter(|(_, cell)| *cell == Some(target))
        .map(|(position, _)| StageClearSymbol {
            symbol: target,
            position,
        })
        .collect()
}

pub fn count_stage_clear_symbols(grid: &Grid, level: Level) -> usize {
    grid.count_symbol(level.stage_clear_symbol())
}

pub fn count_trigger_symbols(grid: &Grid) -> usize {
    grid.count_symbol(Symbol::TRIGGER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Symbol::*;

    fn grid(rows: &[Vec<Symbol>]) -> Grid {
        Grid::from_symbols(rows).unwrap()
    }

    #[test]
    fn test_l_shape_connection() {
        let g = grid(&[
            vec![Purple, Green, Yellow, Blue],
            vec![Purple, Red, Yellow, Green],
            vec![Purple, Purple, Blue, Red],
            vec![Green, Yellow, Red, Blue],
        ]);
        let found = find_connections(&g, Level::One);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, Purple);
        assert_eq!(found[0].count, 4);
        assert_eq!(found[0].payout, 0.0);
    }

    #[test]
    fn test_diagonal_does_not_connect() {
        let g = grid(&[
            vec![Red, Green, Red, Green],
            vec![Green, Red, Green, Red],
            vec![Red, Green, Red, Green],
            vec![Green, Red, Green, Red],
        ]);
        assert!(find_connections(&g, Level::One).is_empty());
        assert!(!has_potential_connections(&g, Level::One));
    }

    #[test]
    fn test_below_minimum_is_ignored() {
        let g = grid(&[
            vec![Blue, Blue, Blue, Red],
            vec![Green, Yellow, Purple, Red],
            vec![Green, Yellow, Purple, Red],
            vec![Purple, Green, Yellow, Blue],
        ]);
        assert!(find_connections(&g, Level::One).is_empty());
    }

    #[test]
    fn test_non_forming_symbols_never_connect() {
        let g = grid(&[
            vec![RainbowEgg, OrangeSlice, OrangeSlice, OrangeSlice],
            vec![Green, OrangeSlice, Purple, Red],
            vec![Green, Yellow, Purple, Blue],
            vec![Purple, Green, Yellow, Blue],
        ]);
        assert!(find_connections(&g, Level::One).is_empty());
    }

    #[test]
    fn test_bonus_partition() {
        let g = grid(&[
            vec![Clover, Clover, Clover, Clover],
            vec![Red, Red, Red, Red],
            vec![Green, Yellow, Purple, Blue],
            vec![Purple, Green, Yellow, Blue],
        ]);
        let found = find_connections(&g, Level::One);
        assert_eq!(found.len(), 2);
        let (bonus, base) = partition_connections(found);
        assert_eq!(bonus.len(), 1);
        assert_eq!(bonus[0].symbol, Clover);
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].symbol, Red);
    }

    #[test]
    fn test_connection_positions_dedup() {
        let a = Connection::new(Red, vec![Position::new(0, 0), Position::new(1, 0)]);
        let b = Connection::new(Blue, vec![Position::new(1, 0), Position::new(2, 0)]);
        assert_eq!(connection_positions(&[a, b]).len(), 3);
    }

    #[test]
    fn test_stage_clear_scan_is_level_specific() {
        let g = grid(&[
            vec![OrangeSlice, HoneyPot, Red, Green],
            vec![Green, Yellow, OrangeSlice, Red],
            vec![Green, Yellow, Purple, Blue],
            vec![Purple, Green, Yellow, RainbowEgg],
        ]);
        let found = find_stage_clear_symbols(&g, Level::One);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].position, Position::new(0, 0));
        assert_eq!(found[1].position, Position::new(2, 1));
        assert_eq!(count_stage_clear_symbols(&g, Level::Two), 1);
        assert_eq!(count_trigger_symbols(&g), 1);
    }

    #[test]
    fn test_empty_cells_skipped() {
        let mut g = grid(&[
            vec![Red, Red, Red, Red],
            vec![Green, Yellow, Purple, Blue],
            vec![Green, Yellow, Purple, Blue],
            vec![Purple, Green, Yellow, Blue],
        ]);
        g.clear(Position::new(1, 0));
        assert!(find_connections(&g, Level::One).is_empty());
    }
}
