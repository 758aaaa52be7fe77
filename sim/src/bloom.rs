//! Bloom filter used as a cheap "definitely absent" pre-check before exact lookups.
//!
//! The filter is insert-only. Removing an element from the exact structure it
//! guards leaves its bits set, which can only add false positives. Callers
//! that need removal keep their own authoritative set and treat a positive
//! answer here as "go and check".

use crate::hashing::{Djb2Hasher, DJB2_SEED};
use std::f64::consts::LN_2;
use std::hash::{Hash, Hasher};

/// Second probe seed, independent of `DJB2_SEED`.
const PROBE_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Fixed-size bit array with `k` double-hashed probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    bits: Vec<u64>,
    bit_len: usize,
    hashes: u32,
    inserted: usize,
}

impl BloomFilter {
    /// Create a filter with an explicit bit count and probe count.
    pub fn new(bit_len: usize, hashes: u32) -> Self {
        let bit_len = bit_len.max(1);
        Self {
            bits: vec![0; bit_len.div_ceil(64)],
            bit_len,
            hashes: hashes.max(1),
            inserted: 0,
        }
    }

    /// Size the filter for `expected` insertions at a target false-positive rate.
    ///
    /// `m = -n ln(p) / ln(2)^2`, `k = (m / n) ln(2)`.
    pub fn with_rate(expected: usize, false_positive_rate: f64) -> Self {
        let n = expected.max(1) as f64;
        let p = false_positive_rate.clamp(1e-9, 0.5);
        let m = (-n * p.ln() / (LN_2 * LN_2)).ceil();
        let k = ((m / n) * LN_2).round();
        Self::new(m as usize, k as u32)
    }

    pub fn insert<K: Hash + ?Sized>(&mut self, key: &K) {
        for bit in self.probes(key) {
            self.bits[bit / 64] |= 1u64 << (bit % 64);
        }
        self.inserted += 1;
    }

    /// `false` means the key was never inserted. `true` means it probably was.
    pub fn might_contain<K: Hash + ?Sized>(&self, key: &K) -> bool {
        self.probes(key)
            .all(|bit| self.bits[bit / 64] & (1u64 << (bit % 64)) != 0)
    }

    pub fn clear(&mut self) {
        self.bits.iter_mut().for_each(|word| *word = 0);
        self.inserted = 0;
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn hash_count(&self) -> u32 {
        self.hashes
    }

    /// Number of `insert` calls since creation or the last `clear`.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Theoretical false-positive probability at the current fill:
    /// `(1 - e^(-k n / m))^k`.
    pub fn expected_false_positive_rate(&self) -> f64 {
        let k = self.hashes as f64;
        let exponent = -k * self.inserted as f64 / self.bit_len as f64;
        (1.0 - exponent.exp()).powf(k)
    }

    /// Bit positions for a key: `(h1 + i * h2) mod m` for `i` in `0..k`.
    fn probes<K: Hash + ?Sized>(&self, key: &K) -> impl Iterator<Item = usize> {
        let h1 = seeded_hash(key, DJB2_SEED);
        // Odd step so consecutive probes never collapse onto one bit.
        let h2 = seeded_hash(key, PROBE_SEED) | 1;
        let m = self.bit_len as u64;
        (0..self.hashes as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
    }
}

/// djb2 over the key's hash stream, finalised so nearby keys spread over the array.
fn seeded_hash<K: Hash + ?Sized>(key: &K, seed: u64) -> u64 {
    let mut hasher = Djb2Hasher::with_seed(seed);
    key.hash(&mut hasher);
    fmix64(hasher.finish())
}

/// MurmurHash3 64-bit finaliser.
#[inline]
fn fmix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}
