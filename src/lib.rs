//! Procedural city layout generation.
//!
//! Worley-noise terrain and population fields steer a turtle-based
//! growth automaton that lays highways toward dense areas, hangs
//! street grids off them, and masses buildings on the remaining land.
//! Output is instance buffers (split transform columns plus colors)
//! ready for an instanced renderer.

pub mod procgen;
pub mod world;
