//! Building massing over sampled sites.
//!
//! Each site grows a stack of footprint primitives: a column is placed,
//! the lift drops by the class gap, and the next column re-centers on a
//! random vertex of the union outline so far, so towers step and drift
//! instead of extruding a single prism. Population density picks the
//! class (footprint scale, target height, gap, facade color).

use bevy::prelude::*;

use crate::procgen::cursor::Cursor;
use crate::procgen::geometry::approx_eq;
use crate::procgen::instances::InstanceBuffer;
use crate::procgen::rng::SineRng;
use crate::world::fields::ScalarFields;

/// Ordered ground polygon a building column is extruded from.
#[derive(Clone, Debug)]
pub struct FootprintPrototype {
    pub name: String,
    pub vertices: Vec<Vec2>,
}

impl FootprintPrototype {
    /// Regular `sides`-gon of the given circumradius, centered on the
    /// origin.
    pub fn regular(name: &str, sides: usize, radius: f32) -> Self {
        let vertices = (0..sides)
            .map(|k| {
                let angle = std::f32::consts::TAU * k as f32 / sides as f32;
                Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
        Self {
            name: name.to_string(),
            vertices,
        }
    }
}

/// The footprint shapes available to the generator; one instance
/// buffer is produced per prototype.
#[derive(Resource)]
pub struct FootprintLibrary {
    pub prototypes: Vec<FootprintPrototype>,
}

impl Default for FootprintLibrary {
    fn default() -> Self {
        Self {
            prototypes: (3..=6)
                .map(|sides| FootprintPrototype::regular(&format!("{sides}gon"), sides, 0.5))
                .collect(),
        }
    }
}

/// Massing parameters for one population bucket.
#[derive(Clone, Copy, Debug)]
pub struct BuildingClass {
    /// Target height above the ground plane.
    pub height: f32,
    /// Vertical drop between stacked columns.
    pub gap: f32,
    /// Footprint scale.
    pub scale: f32,
    /// Facade base color, dimmed before emission.
    pub color: Vec4,
}

/// Low-density sprawl, mid-density blocks, high-density towers.
pub static CLASSES: [BuildingClass; 3] = [
    BuildingClass {
        height: 0.75,
        gap: 1.5,
        scale: 2.0,
        color: Vec4::new(50.0 / 255.0, 70.0 / 255.0, 114.0 / 255.0, 1.0),
    },
    BuildingClass {
        height: 1.5,
        gap: 0.8,
        scale: 1.0,
        color: Vec4::new(68.0 / 255.0, 187.0 / 255.0, 164.0 / 255.0, 1.0),
    },
    BuildingClass {
        height: 3.0,
        gap: 1.0,
        scale: 1.0,
        color: Vec4::new(120.0 / 255.0, 140.0 / 255.0, 1.0, 1.0),
    },
];

/// Bucket a population density into a building class.
pub fn classify(population: f32) -> &'static BuildingClass {
    if population < 0.25 {
        &CLASSES[0]
    } else if population < 0.45 {
        &CLASSES[1]
    } else {
        &CLASSES[2]
    }
}

pub struct BuildingGenerator<'a> {
    fields: &'a ScalarFields,
    library: &'a FootprintLibrary,
    rng: &'a mut SineRng,
    cursor: Cursor,
    /// World-space vertices of every footprint placed in the current
    /// stack; the next column centers on one of these.
    frontier: Vec<Vec2>,
    buffers: Vec<InstanceBuffer>,
}

impl<'a> BuildingGenerator<'a> {
    pub fn new(
        fields: &'a ScalarFields,
        library: &'a FootprintLibrary,
        rng: &'a mut SineRng,
    ) -> Self {
        let buffers = vec![InstanceBuffer::default(); library.prototypes.len()];
        Self {
            fields,
            library,
            rng,
            cursor: Cursor::default(),
            frontier: Vec::new(),
            buffers,
        }
    }

    /// One instance buffer per library prototype, in library order.
    pub fn buffers(&self) -> &[InstanceBuffer] {
        &self.buffers
    }

    pub fn into_buffers(self) -> Vec<InstanceBuffer> {
        self.buffers
    }

    /// Grow one building stack on every site.
    pub fn generate(&mut self, sites: &[Vec2]) {
        for &site in sites {
            let class = classify(self.fields.population(site));
            self.build_stack(site, class);
        }
    }

    /// Stack columns from `class.height + 1` (ground plane at y = 1)
    /// down to zero lift, drifting the center across the accumulated
    /// outline. Always places at least one column.
    fn build_stack(&mut self, site: Vec2, class: &BuildingClass) {
        self.cursor.scale = class.scale;
        self.cursor.color = class.color * Vec4::new(0.2, 0.2, 0.2, 1.0);
        self.frontier.clear();

        let mut lift = class.height + 1.0;
        let mut center = site;
        loop {
            let pick = self.rng.pick_index(self.library.prototypes.len());
            self.cursor.position = center;
            self.buffers[pick].push(self.cursor.column_transform(lift), self.cursor.color);
            lift -= class.gap;

            let placed: Vec<Vec2> = self.library.prototypes[pick]
                .vertices
                .iter()
                .map(|&v| center + v)
                .collect();
            self.merge_frontier(&placed, center);
            center = self.frontier[self.rng.pick_index(self.frontier.len())];
            if lift <= 0.0 {
                break;
            }
        }
    }

    /// Fold a placed footprint into the frontier: drop the first
    /// vertex matching the spent center, append the new outline.
    fn merge_frontier(&mut self, placed: &[Vec2], spent: Vec2) {
        if let Some(i) = self.frontier.iter().position(|&v| approx_eq(v, spent)) {
            self.frontier.remove(i);
        }
        self.frontier.extend_from_slice(placed);
    }
}
