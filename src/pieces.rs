//! Piece catalog and generator: fixed polyomino shapes, colour tags, ids.

use rand::Rng;
use rand::seq::SliceRandom;
use std::fmt;
use uuid::Uuid;

/// Largest side of any shape in the catalog.
pub const MAX_SIDE: usize = 3;

/// Rectangular occupancy matrix, 1..=3 rows and columns. Row `i` is `bits[i]`, column `j` is bit `j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: u8,
    cols: u8,
    bits: [u8; MAX_SIDE],
}

impl Shape {
    /// Build from a 0/1 matrix. Panics (at compile time for the catalog) on an empty or oversized matrix.
    pub const fn from_matrix(matrix: &[&[u8]]) -> Self {
        let rows = matrix.len();
        assert!(rows >= 1 && rows <= MAX_SIDE);
        let cols = matrix[0].len();
        assert!(cols >= 1 && cols <= MAX_SIDE);
        let mut bits = [0u8; MAX_SIDE];
        let mut i = 0;
        while i < rows {
            assert!(matrix[i].len() == cols);
            let mut j = 0;
            while j < cols {
                if matrix[i][j] != 0 {
                    bits[i] |= 1 << j;
                }
                j += 1;
            }
            i += 1;
        }
        Self {
            rows: rows as u8,
            cols: cols as u8,
            bits,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows as usize
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols as usize
    }

    /// True if sub-cell (i, j) is occupied. Out-of-matrix coordinates are unoccupied.
    #[inline]
    pub fn is_filled(&self, i: usize, j: usize) -> bool {
        i < self.rows() && j < self.cols() && self.bits[i] & (1 << j) != 0
    }

    /// Occupied sub-cells (i, j), row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows())
            .flat_map(move |i| (0..self.cols()).map(move |j| (i, j)))
            .filter(|&(i, j)| self.is_filled(i, j))
    }
}

/// The fixed set every tray piece is drawn from.
pub const CATALOG: [Shape; 14] = [
    Shape::from_matrix(&[&[1]]),
    Shape::from_matrix(&[&[1, 1]]),
    Shape::from_matrix(&[&[1, 1, 1]]),
    Shape::from_matrix(&[&[1], &[1]]),
    Shape::from_matrix(&[&[1], &[1], &[1]]),
    Shape::from_matrix(&[&[1, 1], &[1, 1]]),
    Shape::from_matrix(&[&[1, 1], &[1, 0]]),
    Shape::from_matrix(&[&[1, 1, 1], &[1, 0, 0]]),
    Shape::from_matrix(&[&[1, 1, 1], &[0, 1, 0]]),
    Shape::from_matrix(&[&[1, 1, 1], &[1, 1, 1]]),
    Shape::from_matrix(&[&[1, 1], &[0, 1], &[0, 1]]),
    Shape::from_matrix(&[&[1, 1], &[1, 0], &[1, 0]]),
    Shape::from_matrix(&[&[1, 1, 1], &[1, 1, 1], &[1, 1, 1]]),
    Shape::from_matrix(&[&[1, 1, 1], &[1, 0, 0], &[1, 0, 0]]),
];

/// Colour of a placed cell; always in 1..=5 so it never collides with "empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorTag(u8);

impl ColorTag {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    #[cfg(test)]
    pub const fn new(tag: u8) -> Option<Self> {
        if tag >= Self::MIN && tag <= Self::MAX {
            Some(Self(tag))
        } else {
            None
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position among the five tags.
    #[inline]
    pub const fn index(self) -> usize {
        (self.get() - Self::MIN) as usize
    }

    /// Uniform over 1..=5.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(Self::MIN..=Self::MAX))
    }
}

/// Distinguishes tray pieces even when shape and colour collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceId(Uuid);

impl PieceId {
    /// Random v4 id from the caller's rng, so seeded sessions stay reproducible.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill(&mut bytes);
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub id: PieceId,
    pub shape: Shape,
    pub color: ColorTag,
}

/// Draw `count` pieces: shapes without replacement from a shuffled catalog, independent colours,
/// ids unique against `live` and each other. `count` is clamped to the catalog size.
pub fn generate<R: Rng + ?Sized>(rng: &mut R, count: usize, live: &[PieceId]) -> Vec<Piece> {
    let mut shapes = CATALOG;
    shapes.shuffle(rng);
    let mut out: Vec<Piece> = Vec::with_capacity(count.min(CATALOG.len()));
    for shape in shapes.into_iter().take(count) {
        let color = ColorTag::random(rng);
        let id = loop {
            let id = PieceId::random(rng);
            if !live.contains(&id) && out.iter().all(|p| p.id != id) {
                break id;
            }
        };
        out.push(Piece { id, shape, color });
    }
    out
}
