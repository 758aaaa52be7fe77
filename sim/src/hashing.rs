//! Hash helpers for grid positions and labels.
//!
//! - `cell_key` pairs a (row, col) into a single collision-free key.
//! - `Djb2Hasher` / `hash_str` are the fast rolling hash used for labels and
//!   as the mixing source of the Bloom filter probes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;

/// Default djb2 starting value.
pub const DJB2_SEED: u64 = 5381;

/// Single scalar key of a grid cell, produced by the triangular pairing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellKey(pub u64);

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Pair two non-negative coordinates into one key.
///
/// `((row + col) * (row + col + 1)) / 2 + col` is injective over all pairs of
/// `u32`, and the intermediate values fit in `u64`, so distinct cells never
/// collide.
#[inline]
pub fn cell_key(row: u32, col: u32) -> CellKey {
    let sum = row as u64 + col as u64;
    CellKey(sum * (sum + 1) / 2 + col as u64)
}

/// Invert `cell_key`. Returns `(row, col)`.
pub fn cell_from_key(key: CellKey) -> (u32, u32) {
    let z = key.0 as u128;
    let triangle = |w: u128| w * (w + 1) / 2;

    // Float estimate, then correct for rounding on large keys.
    let mut w = ((((8 * z + 1) as f64).sqrt() - 1.0) / 2.0) as u128;
    while triangle(w) > z {
        w -= 1;
    }
    while triangle(w + 1) <= z {
        w += 1;
    }

    let col = z - triangle(w);
    let row = w - col;
    (row as u32, col as u32)
}

/// Multiplicative rolling hash: `h = h * 33 + byte`.
#[derive(Debug, Clone, Copy)]
pub struct Djb2Hasher {
    state: u64,
}

impl Djb2Hasher {
    pub fn with_seed(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl Default for Djb2Hasher {
    fn default() -> Self {
        Self::with_seed(DJB2_SEED)
    }
}

impl Hasher for Djb2Hasher {
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state = self.state.wrapping_mul(33).wrapping_add(byte as u64);
        }
    }

    // Little-endian so keys hash the same on every platform.
    fn write_u32(&mut self, i: u32) {
        self.write(&i.to_le_bytes());
    }

    fn write_u64(&mut self, i: u64) {
        self.write(&i.to_le_bytes());
    }

    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    fn finish(&self) -> u64 {
        self.state
    }
}

/// djb2 hash of a string, O(length).
pub fn hash_str(s: &str) -> u64 {
    hash_str_seeded(s, DJB2_SEED)
}

/// djb2 hash of a string starting from a custom seed.
pub fn hash_str_seeded(s: &str, seed: u64) -> u64 {
    let mut hasher = Djb2Hasher::with_seed(seed);
    hasher.write(s.as_bytes());
    hasher.finish()
}
