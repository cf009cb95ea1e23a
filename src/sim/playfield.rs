//! Tetris playfield grid

use serde::{Deserialize, Serialize};

use super::tetromino::{Piece, Shape};

pub const EMPTY: u8 = 0;
/// Locked cell of a finished board
pub const LOCKED: u8 = 8;
/// Where the losing piece overlapped existing blocks
pub const OVERLAP: u8 = 9;

/// Row-major grid, row 0 at the top
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playfield {
    cols: usize,
    cells: Vec<Vec<u8>>,
}

impl Playfield {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            cols,
            cells: vec![vec![EMPTY; cols]; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.cells.get(row)?.get(col).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row]
    }

    fn occupied(&self, row: i32, col: i32) -> bool {
        if row < 0 || col < 0 {
            return true;
        }
        self.get(row as usize, col as usize)
            .is_none_or(|v| v != EMPTY)
    }

    /// True if `shape` placed at (`row`, `col`) stays inside the grid and
    /// overlaps nothing
    pub fn fits(&self, shape: &Shape, row: i32, col: i32) -> bool {
        shape
            .cells()
            .all(|(r, c, _)| !self.occupied(row + r as i32, col + c as i32))
    }

    /// Write the piece into the grid. Returns the positions written.
    pub fn lock(&mut self, piece: &Piece) -> Vec<(usize, usize)> {
        let mut placed = Vec::with_capacity(4);
        for (r, c, v) in piece.cells() {
            if r >= 0 && c >= 0 {
                self.set(r as usize, c as usize, v);
                placed.push((r as usize, c as usize));
            }
        }
        placed
    }

    /// Stamp a piece that could not spawn: overlapping cells become
    /// [`OVERLAP`], the rest [`LOCKED`]
    pub fn stamp_overlap(&mut self, piece: &Piece) {
        for (r, c, _) in piece.cells() {
            if r < 0 || c < 0 {
                continue;
            }
            let (r, c) = (r as usize, c as usize);
            match self.get(r, c) {
                Some(EMPTY) => self.set(r, c, LOCKED),
                Some(_) => self.set(r, c, OVERLAP),
                None => {}
            }
        }
    }

    /// Remove every full row, shifting everything above it down.
    /// Returns how many rows were removed.
    pub fn clear_full_rows(&mut self) -> u32 {
        let before = self.cells.len();
        self.cells.retain(|row| row.iter().any(|v| *v == EMPTY));
        let cleared = before - self.cells.len();
        for _ in 0..cleared {
            self.cells.insert(0, vec![EMPTY; self.cols]);
        }
        cleared as u32
    }

    /// Repaint a finished board: piece colors become [`LOCKED`], the
    /// overlap marker survives
    pub fn finalize(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            if (1..=LOCKED).contains(cell) {
                *cell = LOCKED;
            }
        }
    }
}
