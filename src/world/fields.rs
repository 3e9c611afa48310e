//! Terrain and population scalar fields.
//!
//! Both fields are pure functions of a map coordinate, computed from
//! layered cellular (Worley) noise with the same constants the terrain
//! shader evaluates, so CPU-side growth decisions stay visually
//! consistent with any GPU visualization of the fields.

use bevy::math::DVec2;
use bevy::prelude::*;

use crate::procgen::rng::sine_hash2;

/// Seed constant for the terrain field.
const TERRAIN_SEED: f64 = 1.46;
/// Seed constant for the population field, decorrelated from terrain.
const POPULATION_SEED: f64 = 3.2049;
const OCTAVES: u32 = 8;

/// Samples terrain suitability and population density over the map.
pub struct ScalarFields {
    width: f64,
    height: f64,
}

impl ScalarFields {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width as f64,
            height: height as f64,
        }
    }

    /// Map `[0, w) x [0, h)` into the shader's `[-50, 50]` screen range.
    fn to_screen(&self, coord: Vec2) -> DVec2 {
        let norm = DVec2::new(coord.x as f64 / self.width, coord.y as f64 / self.height);
        (norm * 2.0 - DVec2::ONE) * 50.0
    }

    /// Signed terrain suitability; land where the value is >= 0.
    pub fn terrain(&self, coord: Vec2) -> f32 {
        let screen = self.to_screen(coord);
        let t = 1.0 - fbm_worley(screen / 55.0 + DVec2::new(1.45, 0.0), OCTAVES, TERRAIN_SEED);
        ((t - 0.55) / 0.45) as f32
    }

    /// Smooth-stepped population density in `[0, 1]`.
    pub fn population(&self, coord: Vec2) -> f32 {
        let screen = self.to_screen(coord);
        let mut p = 1.0 - fbm_worley(screen * (12.0 / 250.0), OCTAVES, POPULATION_SEED);
        p = p * p;
        // smoothstep(0, 0.8, p)
        p = (p / 0.8).clamp(0.0, 1.0);
        p = p * p * (3.0 - 2.0 * p);
        p as f32
    }
}

/// Pseudo-random feature point inside the unit cell at `(x, y)`.
fn feature_point(x: f64, y: f64, seed: f64) -> DVec2 {
    sine_hash2(
        DVec2::new(13.72 * x * seed, 2.38 * y * seed),
        DVec2::new(0.28, 0.328),
    )
}

/// Distance to the nearest feature point over the 3x3 cell
/// neighborhood, clamped to `[0, 1]`.
fn worley(pos: DVec2, seed: f64) -> f64 {
    let cx = pos.x.floor();
    let cy = pos.y.floor();
    let mut dist = f64::MAX;
    for i in -1..=1 {
        for j in -1..=1 {
            let x = cx + i as f64;
            let y = cy + j as f64;
            let feature = DVec2::new(x, y) + feature_point(x, y, seed);
            dist = dist.min(pos.distance(feature));
        }
    }
    dist.clamp(0.0, 1.0)
}

/// Fractal sum of worley octaves: frequency doubles, amplitude halves.
fn fbm_worley(pos: DVec2, octaves: u32, seed: f64) -> f64 {
    let persistence: f64 = 0.5;
    let mut total = 0.0;
    for i in 0..octaves {
        let freq = 2f64.powi(i as i32);
        // Halved so the octave amplitudes sum to at most one.
        let amp = persistence.powi(i as i32) / 2.0;
        total += worley(pos * freq, seed) * amp;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_pure() {
        let fields = ScalarFields::new(100, 100);
        let coord = Vec2::new(37.5, 62.25);
        assert_eq!(fields.terrain(coord), fields.terrain(coord));
        assert_eq!(fields.population(coord), fields.population(coord));
    }

    #[test]
    fn population_is_bounded() {
        let fields = ScalarFields::new(100, 100);
        for x in 0..20 {
            for y in 0..20 {
                let p = fields.population(Vec2::new(x as f32 * 5.0, y as f32 * 5.0));
                assert!((0.0..=1.0).contains(&p), "population {p} out of range");
            }
        }
    }

    #[test]
    fn fields_cover_the_whole_plane() {
        let fields = ScalarFields::new(100, 100);
        // Out-of-map coordinates are valid inputs, never errors.
        for coord in [
            Vec2::new(-25.0, -25.0),
            Vec2::new(250.0, 10.0),
            Vec2::new(50.0, 1000.0),
        ] {
            assert!(fields.terrain(coord).is_finite());
            assert!((0.0..=1.0).contains(&fields.population(coord)));
        }
    }

    #[test]
    fn worley_distance_is_clamped() {
        for i in 0..10 {
            let pos = DVec2::new(i as f64 * 1.3, i as f64 * -0.7);
            let w = worley(pos, TERRAIN_SEED);
            assert!((0.0..=1.0).contains(&w));
        }
    }

    #[test]
    fn map_has_both_land_and_water() {
        // The default extent should not degenerate into all-land or
        // all-water; highway growth depends on crossing both.
        let fields = ScalarFields::new(100, 100);
        let mut land = 0;
        let mut water = 0;
        for x in 0..100 {
            for y in 0..100 {
                if fields.terrain(Vec2::new(x as f32, y as f32)) >= 0.0 {
                    land += 1;
                } else {
                    water += 1;
                }
            }
        }
        assert!(land > 0, "no land cells");
        assert!(water > 0, "no water cells");
    }
}
