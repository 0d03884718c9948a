//! Cell grid storage.

use rand::Rng;

/// State of a single cell.
///
/// `Dying` only exists in rendered output: it marks a live cell that the
/// next generation will kill. It counts as alive whenever the board is
/// evolved again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellState {
    #[default]
    Dead,
    Alive,
    Dying,
}

impl CellState {
    /// True for `Alive` and `Dying`.
    #[inline]
    pub fn is_live(self) -> bool {
        !matches!(self, CellState::Dead)
    }

    /// Collapse the render-only `Dying` label back to `Alive`.
    #[inline]
    pub fn sanitized(self) -> Self {
        match self {
            CellState::Dying => CellState::Alive,
            other => other,
        }
    }
}

/// Rectangular grid of cells, row-major: `cells[row * cols + col]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<CellState>,
}

impl Board {
    /// All-dead board.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![CellState::Dead; rows * cols],
        }
    }

    /// Board with every cell independently dead or alive with equal probability.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Self {
        let cells = (0..rows * cols)
            .map(|_| {
                if rng.gen_bool(0.5) {
                    CellState::Alive
                } else {
                    CellState::Dead
                }
            })
            .collect();
        Self { rows, cols, cells }
    }

    /// Build from explicit rows. Panics if rows are ragged.
    #[cfg(test)]
    pub(crate) fn from_rows(rows: &[Vec<CellState>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        assert!(rows.iter().all(|r| r.len() == cols), "ragged board rows");
        Self {
            rows: rows.len(),
            cols,
            cells: rows.iter().flatten().copied().collect(),
        }
    }

    pub(crate) fn from_cells(rows: usize, cols: usize, cells: Vec<CellState>) -> Self {
        debug_assert_eq!(cells.len(), rows * cols);
        Self { rows, cols, cells }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        self.cells[row * self.cols + col] = state;
    }

    /// Flat row-major cell slice.
    #[inline]
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// Number of live (`Alive` or `Dying`) cells.
    pub fn population(&self) -> usize {
        self.cells.iter().filter(|c| c.is_live()).count()
    }
}
