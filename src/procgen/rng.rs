//! Deterministic sine-hash pseudo-random source.
//!
//! Every stochastic draw in road and building generation flows through
//! one `SineRng`, advanced by one per draw, so a fixed initial seed
//! reproduces an identical city. The same hash family feeds the
//! cellular noise and site sampling.

use bevy::math::DVec2;
use bevy::prelude::*;

/// Fractional part, mapped into `[0, 1)` for negative inputs as well.
fn fract(v: f64) -> f64 {
    v - v.floor()
}

/// One-component sine hash of a float seed.
pub fn sine_hash(seed: f32) -> f32 {
    fract((seed as f64 * 127.1).sin() * 43758.5453) as f32
}

/// Two-component sine hash; `seed` offsets the input lattice.
pub fn sine_hash2(p: DVec2, seed: DVec2) -> DVec2 {
    let x1 = p.x + seed.x;
    let x2 = p.y + seed.y;
    let v = DVec2::new(x1 * 311.7 + x2 * 127.1, x1 * 269.5 + x2 * 183.3);
    DVec2::new(fract(v.x.sin()), fract(v.y.sin()))
}

/// `sine_hash2` for callers working in f32 map space.
pub fn sine_hash2_f32(p: Vec2, seed: Vec2) -> Vec2 {
    sine_hash2(p.as_dvec2(), seed.as_dvec2()).as_vec2()
}

/// Seed-counter PRNG: each draw hashes the counter, then advances it.
#[derive(Clone, Copy, Debug)]
pub struct SineRng {
    seed: f32,
}

impl SineRng {
    pub fn new(seed: f32) -> Self {
        Self { seed }
    }

    /// Next pseudo-random float in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        let value = sine_hash(self.seed);
        self.seed += 1.0;
        value
    }

    /// Uniform index in `[0, len)`. `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize) -> usize {
        ((self.next_f32() * len as f32) as usize).min(len - 1)
    }

    /// One Bernoulli draw, true with probability `p`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.next_f32() > 1.0 - p
    }
}
