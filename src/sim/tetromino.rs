//! Tetromino shapes and the 7-bag randomizer

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    I,
    O,
    T,
    S,
    Z,
    J,
    L,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Cell value written to the playfield, 1 through 7
    pub fn color_id(self) -> u8 {
        match self {
            PieceKind::I => 1,
            PieceKind::O => 2,
            PieceKind::T => 3,
            PieceKind::S => 4,
            PieceKind::Z => 5,
            PieceKind::J => 6,
            PieceKind::L => 7,
        }
    }

    /// Spawn orientation
    pub fn shape(self) -> Shape {
        let v = self.color_id();
        let rows: Vec<Vec<u8>> = match self {
            PieceKind::I => vec![vec![v], vec![v], vec![v], vec![v]],
            PieceKind::O => vec![vec![v, v], vec![v, v]],
            PieceKind::T => vec![vec![0, v, 0], vec![v, v, v]],
            PieceKind::S => vec![vec![0, v, v], vec![v, v, 0]],
            PieceKind::Z => vec![vec![v, v, 0], vec![0, v, v]],
            PieceKind::J => vec![vec![v, 0, 0], vec![v, v, v]],
            PieceKind::L => vec![vec![0, 0, v], vec![v, v, v]],
        };
        Shape { rows }
    }
}

/// Rectangular cell matrix. Zero is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    rows: Vec<Vec<u8>>,
}

impl Shape {
    pub fn from_rows(rows: Vec<Vec<u8>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Clockwise quarter turn: transpose, then reverse each row
    pub fn rotated(&self) -> Shape {
        let (h, w) = (self.height(), self.width());
        let rows = (0..w)
            .map(|c| (0..h).rev().map(|r| self.rows[r][c]).collect())
            .collect();
        Shape { rows }
    }

    /// Occupied cells as (row, col, value)
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, u8)> + '_ {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, v)| **v != 0)
                .map(move |(c, v)| (r, c, *v))
        })
    }
}

/// The falling piece. `row`/`col` locate the shape's top-left corner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub shape: Shape,
    pub row: i32,
    pub col: i32,
}

impl Piece {
    /// Top row, horizontally centered
    pub fn spawn(kind: PieceKind, cols: usize) -> Self {
        let shape = kind.shape();
        let col = (cols / 2) as i32 - (shape.width() / 2) as i32;
        Self {
            kind,
            shape,
            row: 0,
            col,
        }
    }

    /// Absolute board positions of every occupied cell
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32, u8)> + '_ {
        self.shape
            .cells()
            .map(|(r, c, v)| (self.row + r as i32, self.col + c as i32, v))
    }
}

/// Deals every kind once, in random order, before reshuffling
#[derive(Debug, Clone)]
pub struct Bag {
    queue: Vec<PieceKind>,
    rng: Pcg32,
}

impl Bag {
    pub fn new(seed: u64) -> Self {
        Self {
            queue: Vec::with_capacity(PieceKind::ALL.len()),
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn next_kind(&mut self) -> PieceKind {
        if self.queue.is_empty() {
            self.refill();
        }
        // refill() always leaves seven kinds queued
        self.queue.pop().unwrap_or(PieceKind::I)
    }

    fn refill(&mut self) {
        let mut pool = PieceKind::ALL.to_vec();
        while !pool.is_empty() {
            let i = self.rng.random_range(0..pool.len());
            self.queue.push(pool.remove(i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_color_ids_match_shape_cells() {
        for kind in PieceKind::ALL {
            assert!(kind.shape().cells().all(|(_, _, v)| v == kind.color_id()));
            assert_eq!(kind.shape().cells().count(), 4);
        }
    }

    #[test]
    fn test_rotate_t_clockwise() {
        let t = PieceKind::T.shape().rotated();
        assert_eq!(t, Shape::from_rows(vec![vec![3, 0], vec![3, 3], vec![3, 0]]));
    }

    #[test]
    fn test_rotate_i_lies_flat() {
        let i = PieceKind::I.shape().rotated();
        assert_eq!((i.height(), i.width()), (1, 4));
    }

    #[test]
    fn test_four_turns_restore_shape() {
        for kind in PieceKind::ALL {
            let s = kind.shape();
            assert_eq!(s.rotated().rotated().rotated().rotated(), s);
        }
    }

    #[test]
    fn test_spawn_is_centered() {
        assert_eq!(Piece::spawn(PieceKind::I, 10).col, 5);
        assert_eq!(Piece::spawn(PieceKind::O, 10).col, 4);
        assert_eq!(Piece::spawn(PieceKind::T, 10).col, 4);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Bag::new(99);
        let mut b = Bag::new(99);
        for _ in 0..21 {
            assert_eq!(a.next_kind(), b.next_kind());
        }
    }

    proptest! {
        #[test]
        fn prop_every_window_of_seven_is_a_permutation(seed in any::<u64>(), bags in 1usize..6) {
            let mut bag = Bag::new(seed);
            for _ in 0..bags {
                let window: HashSet<PieceKind> = (0..7).map(|_| bag.next_kind()).collect();
                prop_assert_eq!(window.len(), 7);
            }
        }
    }
}
