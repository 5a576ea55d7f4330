//! Deterministic 32-bit PRNG for reproducible cohorts.
//!
//! `Mulberry32` carries a single `u32` of state and is an ordinary value: two
//! generators built from the same seed produce the same stream, and nothing is
//! shared between instances. It implements `rand::RngCore`/`SeedableRng`, so
//! the usual `rand` adaptors (`Rng::gen_range`, `SliceRandom::shuffle`, ...)
//! work on it as well.

use rand::{RngCore, SeedableRng};
use std::f64::consts::PI;

const STATE_INCREMENT: u32 = 0x6D2B_79F5;
const TWO_POW_32: f64 = 4_294_967_296.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    /// Any integer is accepted; it is wrapped into the 32-bit state.
    pub fn new(seed: i64) -> Self {
        Self { state: seed as u32 }
    }

    /// Uniform variate in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }

    /// Standard normal variate (Box–Muller, cosine branch).
    ///
    /// Consumes exactly two uniforms. Both are reflected to `(0, 1]`, so the
    /// logarithm argument is never zero.
    pub fn standard_normal(&mut self) -> f64 {
        let u = 1.0 - self.uniform();
        let v = 1.0 - self.uniform();
        (-2.0 * u.ln()).sqrt() * (2.0 * PI * v).cos()
    }

    pub fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + self.standard_normal() * std_dev
    }

    /// Index in `0..len`, drawn as `floor(u * len)`. `len` must be positive.
    pub fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "cannot draw an index from an empty pool");
        ((self.uniform() * len as f64) as usize).min(len - 1)
    }

    /// Uniformly picks one element of a non-empty pool.
    pub fn pick<'a, T>(&mut self, pool: &'a [T]) -> &'a T {
        &pool[self.index(pool.len())]
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(STATE_INCREMENT);
        let a = self.state;
        let mut t = (a ^ (a >> 15)).wrapping_mul(a | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next_u32());
        let hi = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u32::from_le_bytes(seed),
        }
    }

    /// Truncates instead of expanding, so `seed_from_u64(s)` matches `new(s)`.
    fn seed_from_u64(state: u64) -> Self {
        Self {
            state: state as u32,
        }
    }
}
