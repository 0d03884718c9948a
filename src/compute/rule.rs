//! Birth-3 / survive-2-or-3 update rule.
//!
//! Cells outside the grid count as dead; there is no wraparound.

use super::board::{Board, CellState};

/// Count live cells in the 8-neighborhood of every cell, treating `Dying` as alive.
pub fn neighbor_counts(board: &Board) -> Vec<u8> {
    let (rows, cols) = board.shape();
    let cells = board.cells();
    let mut counts = vec![0u8; rows * cols];

    for row in 0..rows {
        let r_lo = row.saturating_sub(1);
        let r_hi = (row + 1).min(rows.saturating_sub(1));
        for col in 0..cols {
            let c_lo = col.saturating_sub(1);
            let c_hi = (col + 1).min(cols - 1);
            let mut n = 0u8;
            for r in r_lo..=r_hi {
                for c in c_lo..=c_hi {
                    if (r != row || c != col) && cells[r * cols + c].is_live() {
                        n += 1;
                    }
                }
            }
            counts[row * cols + col] = n;
        }
    }

    counts
}

/// Advance `board` one generation.
///
/// The input may contain `Dying` cells; they are read as `Alive`. The output
/// marks every cell that is alive now but would die in the following
/// generation as `Dying`.
pub fn advance(board: &Board) -> Board {
    let (rows, cols) = board.shape();

    let counts = neighbor_counts(board);
    let next: Vec<CellState> = board
        .cells()
        .iter()
        .zip(&counts)
        .map(|(&cell, &n)| {
            if (cell.is_live() && n == 2) || n == 3 {
                CellState::Alive
            } else {
                CellState::Dead
            }
        })
        .collect();
    let mut next = Board::from_cells(rows, cols, next);

    // Look ahead on the freshly advanced (binary) board.
    let ahead = neighbor_counts(&next);
    for row in 0..rows {
        for col in 0..cols {
            let n = ahead[row * cols + col];
            if next.get(row, col) == CellState::Alive && !(2..=3).contains(&n) {
                next.set(row, col, CellState::Dying);
            }
        }
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use CellState::{Alive, Dead, Dying};
    use proptest::prelude::*;

    fn board_from(pattern: &[&str]) -> Board {
        let rows: Vec<Vec<CellState>> = pattern
            .iter()
            .map(|line| {
                line.chars()
                    .map(|c| match c {
                        '#' => Alive,
                        'x' => Dying,
                        _ => Dead,
                    })
                    .collect()
            })
            .collect();
        Board::from_rows(&rows)
    }

    #[test]
    fn test_single_cell_dies() {
        let board = board_from(&["...", ".#.", "..."]);
        let next = advance(&board);
        assert_eq!(next, Board::new(3, 3));
    }

    #[test]
    fn test_block_is_still_life() {
        let board = board_from(&["....", ".##.", ".##.", "...."]);
        let next = advance(&board);
        assert_eq!(next, board);
    }

    #[test]
    fn test_blinker_marks_doomed_ends() {
        let board = board_from(&[".....", "..#..", "..#..", "..#..", "....."]);
        let next = advance(&board);
        // Horizontal phase: center survives, both ends die next generation.
        assert_eq!(
            next,
            board_from(&[".....", ".....", ".x#x.", ".....", "....."])
        );
    }

    #[test]
    fn test_dying_input_counts_as_alive() {
        let marked = board_from(&[".....", ".....", ".x#x.", ".....", "....."]);
        let plain = board_from(&[".....", ".....", ".###.", ".....", "....."]);
        assert_eq!(advance(&marked), advance(&plain));
    }

    #[test]
    fn test_edges_are_not_wrapped() {
        // A vertical bar on the left edge would gain neighbors from the
        // right edge on a torus.
        let board = board_from(&["#..#", "#..#", "#..#"]);
        let counts = neighbor_counts(&board);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[4], 2);
    }

    fn naive_count(cells: &[Vec<bool>], row: usize, col: usize) -> u8 {
        let mut n = 0;
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let r = row as i64 + dr;
                let c = col as i64 + dc;
                if r >= 0
                    && c >= 0
                    && (r as usize) < cells.len()
                    && (c as usize) < cells[0].len()
                    && cells[r as usize][c as usize]
                {
                    n += 1;
                }
            }
        }
        n
    }

    fn arb_cells() -> impl Strategy<Value = Vec<Vec<bool>>> {
        (1usize..12, 1usize..12).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(prop::collection::vec(any::<bool>(), cols), rows)
        })
    }

    proptest! {
        #[test]
        fn prop_rule_matches_reference(cells in arb_cells()) {
            let board = Board::from_rows(
                &cells
                    .iter()
                    .map(|r| r.iter().map(|&a| if a { Alive } else { Dead }).collect())
                    .collect::<Vec<_>>(),
            );
            let next = advance(&board);

            let expected: Vec<Vec<bool>> = cells
                .iter()
                .enumerate()
                .map(|(r, line)| {
                    line.iter()
                        .enumerate()
                        .map(|(c, &alive)| {
                            let n = naive_count(&cells, r, c);
                            (alive && n == 2) || n == 3
                        })
                        .collect()
                })
                .collect();

            for (r, line) in expected.iter().enumerate() {
                for (c, &alive) in line.iter().enumerate() {
                    let got = next.get(r, c);
                    prop_assert_eq!(got.is_live(), alive);
                    if alive {
                        let n = naive_count(&expected, r, c);
                        let doomed = !(2..=3).contains(&n);
                        prop_assert_eq!(got == Dying, doomed);
                    }
                }
            }
        }
    }
}
