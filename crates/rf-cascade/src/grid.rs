//! Square symbol grid
//!
//! Cells are stored row-major in a flat buffer. An empty cell is `None`, never
//! a symbol value, so gravity and refill can tell vacated cells apart from
//! anything that could appear on the board.

use serde::{Deserialize, Serialize};

use crate::error::{CascadeError, CascadeResult};
use crate::symbols::Symbol;

/// Cell coordinate: `x` is the column, `y` the row (0 = top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Square grid of optional symbols
///
/// Serialized as rows (top to bottom) of nullable symbol names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<Option<Symbol>>>", into = "Vec<Vec<Option<Symbol>>>")]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Symbol>>,
}

impl Grid {
    /// All-empty grid of the given side
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    /// Build from rows; fails when the rows do not form a square
    pub fn from_rows(rows: Vec<Vec<Option<Symbol>>>) -> Result<Self, String> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for (y, row) in rows.into_iter().enumerate() {
            if row.len() != size {
                return Err(format!(
                    "row {} has {} cells, expected {}",
                    y,
                    row.len(),
                    size
                ));
            }
            cells.extend(row);
        }
        Ok(Self { size, cells })
    }

    /// Build a complete grid from rows of symbols
    pub fn from_symbols(rows: &[Vec<Symbol>]) -> Result<Self, String> {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().copied().map(Some).collect())
                .collect(),
        )
    }

    /// Side length
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Is this the zero-sized placeholder grid?
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.size && pos.y < self.size
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        self.contains(pos).then(|| pos.y * self.size + pos.x)
    }

    /// Symbol at `pos`; `None` for an empty cell or an out-of-bounds position
    #[inline]
    pub fn get(&self, pos: Position) -> Option<Symbol> {
        self.index(pos).and_then(|i| self.cells[i])
    }

    /// Overwrite a cell; out-of-bounds positions are ignored
    #[inline]
    pub fn set(&mut self, pos: Position, symbol: Option<Symbol>) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = symbol;
        }
    }

    /// Vacate a cell
    #[inline]
    pub fn clear(&mut self, pos: Position) {
        self.set(pos, None);
    }

    /// Every position in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<> {
        let size = self.size;
        (0..size).flat_map(move |y| (0..size).map(move |x| Position::new(x, y)))
    }

    /// Row-major iteration over (position, cell)
    pub fn iter(&self) -> impl Iterator<Item = (Position, Option<Symbol>)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (Position::new(i % self.size, i / self.size), *cell))
    }

    /// Orthogonal neighbours inside the grid: right, left, down, up
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + use<> {
        let size = self.size;
        let candidates = [
            (pos.x + 1 < size).then(|| Position::new(pos.x + 1, pos.y)),
            (pos.x > 0).then(|| Position::new(pos.x - 1, pos.y)),
            (pos.y + 1 < size).then(|| Position::new(pos.x, pos.y + 1)),
            (pos.y > 0).then(|| Position::new(pos.x, pos.y - 1)),
        ];
        candidates.into_iter().flatten()
    }

    /// Top-to-bottom cells of one column
    pub fn column(&self, x: usize) -> Vec<Option<Symbol>> {
        (0..self.size).map(|y| self.get(Position::new(x, y))).collect()
    }

    pub fn contains_symbol(&self, symbol: Symbol) -> bool {
        self.cells.contains(&Some(symbol))
    }

    pub fn count_symbol(&self, symbol: Symbol) -> usize {
        self.cells.iter().filter(|c| **c == Some(symbol)).count()
    }

    /// Does any cell other than `pos` hold `symbol`?
    pub fn contains_symbol_elsewhere(&self, symbol: Symbol, pos: Position) -> bool {
        self.iter().any(|(p, c)| p != pos && c == Some(symbol))
    }

    /// First empty cell in row-major order
    pub fn first_empty(&self) -> Option<Position> {
        self.iter().find(|(_, c)| c.is_none()).map(|(p, _)| p)
    }

    pub fn is_complete(&self) -> bool {
        self.first_empty().is_none()
    }

    /// Check the grid is `expected` × `expected`
    pub fn validate_dimensions(&self, expected: usize) -> CascadeResult<()> {
        if self.size != expected {
            return Err(CascadeError::GridDimensions {
                expected,
                actual: self.size,
            });
        }
        Ok(())
    }

    /// Check no cell is empty
    pub fn validate_complete(&self) -> CascadeResult<()> {
        match self.first_empty() {
            Some(pos) => Err(CascadeError::IncompleteGrid(pos)),
            None => Ok(()),
        }
    }

    /// Rows of cells, top to bottom
    pub fn to_rows(&self) -> Vec<Vec<Option<Symbol>>> {
        if self.size == 0 {
            return Vec::new();
        }
        self.cells.chunks(self.size).map(<[_]>::to_vec).collect()
    }
}

impl TryFrom<Vec<Vec<Option<Symbol>>>> for Grid {
    type Error = String;

    fn try_from(rows: Vec<Vec<Option<Symbol>>>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl From<Grid> for Vec<Vec<Option<Symbol>>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.to_rows() {
            let names: Vec<&str> = row
                .iter()
                .map(|c| c.map(Symbol::name).unwrap_or("."))
                .collect();
            writeln!(f, "{}", names.join(" "))?;
        }
        Ok(())
    }
}
