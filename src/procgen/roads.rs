//! Road network growth: population-guided highways, then a secondary
//! grid hung off them.
//!
//! One cursor is live at a time; branch points are pushed as cursor
//! snapshots and explored depth-first after the live thread dies by
//! stepping into water, leaving the map, or merging into the existing
//! network. The snap checks run before a step commits, so no segment
//! silently crosses the network uncut.

use bevy::prelude::*;

use crate::procgen::cursor::Cursor;
use crate::procgen::geometry::{
    approx_eq, closest_point_on_segment, intersection_distance, point_on_segment, Segment,
};
use crate::procgen::instances::InstanceBuffer;
use crate::procgen::rng::{sine_hash2_f32, SineRng};
use crate::world::fields::ScalarFields;
use crate::world::index::SpatialIndex;

use super::{CityGenConfig, DebugOverlay};

/// Marching resolution when stamping a committed segment into cells.
const STAMP_STEP: f32 = 0.25;
/// Marching resolution for snap and collision scans along a candidate.
const SCAN_STEP: f32 = 0.5;
/// Heading agreement (cosine) required to snap to a recorded point.
const SNAP_ALIGNMENT: f32 = 0.7;
/// Widest deviation tried when hunting for a terrain-valid step.
const VALID_SEARCH_ANGLE: f32 = 60.0;
/// Hard bound on one grid walk; a safety valve against dead-end
/// thrash, not part of the intended algorithm.
const GRID_ITERATION_CAP: u32 = 1000;
/// Rejection-sampling attempts per requested building site.
const SITE_ATTEMPTS: u32 = 1000;

/// Phase of the growth state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GrowthPhase {
    Highways,
    Grid,
    Done,
}

pub struct RoadNetworkGenerator<'a> {
    config: &'a CityGenConfig,
    fields: &'a ScalarFields,
    index: &'a mut SpatialIndex,
    rng: &'a mut SineRng,
    cursor: Cursor,
    /// Pending branch points, explored LIFO.
    stack: Vec<Cursor>,
    phase: GrowthPhase,
    instances: InstanceBuffer,
}

impl<'a> RoadNetworkGenerator<'a> {
    pub fn new(
        config: &'a CityGenConfig,
        fields: &'a ScalarFields,
        index: &'a mut SpatialIndex,
        rng: &'a mut SineRng,
    ) -> Self {
        let cursor = Cursor {
            color: Vec4::new(0.01, 0.01, 0.01, 1.0),
            ..Cursor::default()
        };
        Self {
            config,
            fields,
            index,
            rng,
            cursor,
            stack: Vec::new(),
            phase: GrowthPhase::Highways,
            instances: InstanceBuffer::default(),
        }
    }

    pub fn phase(&self) -> GrowthPhase {
        self.phase
    }

    pub fn instances(&self) -> &InstanceBuffer {
        &self.instances
    }

    pub fn into_instances(self) -> InstanceBuffer {
        self.instances
    }

    /// Run both growth phases to completion.
    pub fn run(&mut self) {
        while self.phase != GrowthPhase::Done {
            self.step_phase();
        }
    }

    /// Advance the state machine by one phase.
    pub fn step_phase(&mut self) {
        match self.phase {
            GrowthPhase::Highways => {
                self.grow_highways();
                self.phase = GrowthPhase::Grid;
            }
            GrowthPhase::Grid => {
                self.grow_grid();
                self.phase = GrowthPhase::Done;
            }
            GrowthPhase::Done => {}
        }
    }

    /// A position is steppable when it is on the map and on land.
    fn check_valid(&self, pos: Vec2) -> bool {
        self.index.contains(pos) && self.fields.terrain(pos) >= 0.0
    }

    /// Restore the most recent branch point; false ends the phase.
    fn pop_thread(&mut self) -> bool {
        match self.stack.pop() {
            Some(snapshot) => {
                self.cursor = snapshot;
                true
            }
            None => false,
        }
    }

    /// Record a branch site and queue the ±90° candidates whose first
    /// step lands on valid terrain.
    fn branch(&mut self, step: f32) {
        self.index.record_intersection(self.cursor.position);
        let mut left = self.cursor;
        left.rotate(90.0);
        if self.check_valid(left.moved(step)) {
            self.stack.push(left);
        }
        let mut right = self.cursor;
        right.rotate(-90.0);
        if self.check_valid(right.moved(step)) {
            self.stack.push(right);
        }
    }

    /// Record the current site and queue the reversed heading, so the
    /// growth point explores both directions.
    fn push_reversal(&mut self) {
        self.index.record_intersection(self.cursor.position);
        let mut back = self.cursor;
        back.rotate(180.0);
        self.stack.push(back);
    }

    // ----- highway phase -------------------------------------------------

    fn grow_highways(&mut self) {
        self.cursor.scale = 0.5;
        let coarse = self.index.coarse_size();
        let width = self.config.width as f32;
        let height = self.config.height as f32;

        // Two seeds near the bottom edge growing inward, one at the
        // center growing outward; each explores both directions and
        // spawns perpendicular candidates.
        self.cursor.position = Vec2::new(width / 4.0, 5.0);
        self.cursor.orientation = Vec2::Y;
        self.push_reversal();
        self.branch(coarse);

        self.cursor.position = Vec2::new(width * 3.0 / 4.0, 5.0);
        self.cursor.orientation = Vec2::Y;
        self.push_reversal();
        self.branch(coarse);

        self.cursor.position = Vec2::new(width / 2.0, height / 2.0);
        self.cursor.orientation = Vec2::NEG_Y;
        self.push_reversal();
        self.branch(coarse);

        loop {
            self.orient_toward_population(self.config.highway_angle, coarse);
            let Some(step) = self.find_valid_step(VALID_SEARCH_ANGLE, coarse) else {
                if !self.pop_thread() {
                    return;
                }
                continue;
            };
            if let Some(snap) = self.snap_to_network(step) {
                // Merged into the network: commit the truncated step
                // and retire the thread without branching.
                self.commit_highway(snap);
                if !self.pop_thread() {
                    return;
                }
            } else {
                self.commit_highway(step);
                if self.rng.chance(self.config.highway_density) {
                    self.branch(coarse);
                }
            }
        }
    }

    /// Rotate the cursor toward the strongest population signal among
    /// five headings spanning ±`max_angle`, each ray-marched with
    /// nearer samples weighted `population / distance`. False when
    /// every sample along every heading is invalid.
    fn orient_toward_population(&mut self, max_angle: f32, dist: f32) -> bool {
        let mut best = 0.0;
        let mut target = 0.0;
        let mut angle = -max_angle;
        while angle <= max_angle {
            let mut probe = self.cursor;
            probe.rotate(angle);
            let mut sum = 0.0;
            let mut i = dist / 5.0;
            while i <= dist {
                let sample = probe.moved(i);
                if self.check_valid(sample) {
                    sum += self.fields.population(sample) / i;
                }
                i += 1.0;
            }
            if sum > best {
                best = sum;
                target = angle;
            }
            angle += max_angle / 2.0;
        }
        if best > 0.0 {
            self.cursor.rotate(target);
            return true;
        }
        false
    }

    /// Find the longest terrain-valid step up to `dist`, trying the
    /// straight full and half steps, then rotated half steps, then
    /// rotated full steps, in a fixed priority order. The cursor is
    /// left on the chosen heading.
    fn find_valid_step(&mut self, max_angle: f32, dist: f32) -> Option<f32> {
        if self.check_valid(self.cursor.moved(dist)) {
            return Some(dist);
        }
        if self.check_valid(self.cursor.moved(dist / 2.0)) {
            return Some(dist / 2.0);
        }
        self.cursor.rotate(max_angle / 2.0);
        if self.check_valid(self.cursor.moved(dist / 2.0)) {
            return Some(dist / 2.0);
        }
        self.cursor.rotate(-max_angle);
        if self.check_valid(self.cursor.moved(dist / 2.0)) {
            return Some(dist / 2.0);
        }
        self.cursor.rotate(-max_angle / 2.0);
        if self.check_valid(self.cursor.moved(dist / 2.0)) {
            return Some(dist / 2.0);
        }
        self.cursor.rotate(max_angle * 2.0);
        if self.check_valid(self.cursor.moved(dist / 2.0)) {
            return Some(dist / 2.0);
        }
        self.cursor.rotate(-max_angle / 2.0);
        if self.check_valid(self.cursor.moved(dist)) {
            return Some(dist);
        }
        self.cursor.rotate(-max_angle);
        if self.check_valid(self.cursor.moved(dist)) {
            return Some(dist);
        }
        self.cursor.rotate(-max_angle);
        if self.check_valid(self.cursor.moved(dist)) {
            return Some(dist);
        }
        self.cursor.rotate(max_angle * 2.0);
        if self.check_valid(self.cursor.moved(dist)) {
            return Some(dist);
        }
        None
    }

    /// Look along the candidate step for network to merge into: first
    /// recorded intersection points (within a third of a coarse cell,
    /// bearing roughly ahead), then highway segments (within half a
    /// cell). On a hit the cursor is reoriented toward the snap target
    /// and the clamped step distance is returned.
    fn snap_to_network(&mut self, dist: f32) -> Option<f32> {
        let mut min_dist = 100.0;
        let mut target = 0.0;
        let mut heading = Vec2::ZERO;

        let mut incr = SCAN_STEP;
        while incr <= dist {
            let probe = self.cursor.moved(incr);
            for point in self.index.intersections_near(probe) {
                if approx_eq(point, self.cursor.position) {
                    continue;
                }
                let toward = (point - self.cursor.position).normalize_or_zero();
                if point.distance(probe) < min_dist
                    && toward.dot(self.cursor.orientation) > SNAP_ALIGNMENT
                {
                    min_dist = point.distance(probe);
                    target = point.distance(self.cursor.position);
                    heading = toward;
                }
            }
            incr += SCAN_STEP;
        }
        if min_dist < self.index.coarse_size() / 3.0 {
            self.cursor.orientation = heading;
            return Some(target);
        }

        let mut min_dist = 100.0;
        let mut target = 0.0;
        let mut heading = Vec2::ZERO;

        let mut incr = SCAN_STEP;
        while incr <= dist {
            let probe = self.cursor.moved(incr);
            for segment in self.index.highways_near(probe) {
                if approx_eq(segment.a, self.cursor.position)
                    || approx_eq(segment.b, self.cursor.position)
                {
                    continue;
                }
                let nearest = closest_point_on_segment(probe, &segment);
                if nearest.distance(probe) < min_dist {
                    min_dist = nearest.distance(probe);
                    target = nearest.distance(self.cursor.position);
                    heading = (nearest - self.cursor.position).normalize_or_zero();
                }
            }
            incr += SCAN_STEP;
        }
        if min_dist < self.index.coarse_size() / 2.0 {
            self.cursor.orientation = heading;
            let snap = self.cursor.moved(target);
            self.index.record_intersection(snap);
            return Some(target);
        }
        None
    }

    /// Commit a highway step: record the start as an intersection
    /// site, stamp the segment into every coarse cell the ray crosses,
    /// mark fine occupancy along it, emit the instance, and advance.
    fn commit_highway(&mut self, dist: f32) {
        self.index.record_intersection(self.cursor.position);
        let segment = Segment::new(self.cursor.position, self.cursor.moved(dist));
        let mut prev_fine: Option<(i32, i32)> = None;
        let mut prev_coarse: Option<(i32, i32)> = None;
        let mut i = 0.0;
        while i <= dist {
            let probe = self.cursor.moved(i);
            if self.check_valid(probe) {
                let fine = self.index.fine_cell(probe);
                if prev_fine != Some(fine) {
                    self.index.mark_occupied(probe);
                    prev_fine = Some(fine);
                }
                let coarse = self.index.coarse_cell(probe);
                if prev_coarse != Some(coarse) {
                    self.index.push_highway(coarse, segment);
                    prev_coarse = Some(coarse);
                }
            }
            i += STAMP_STEP;
        }
        self.emit(dist);
    }

    // ----- grid phase ----------------------------------------------------

    fn grow_grid(&mut self) {
        self.cursor.scale = 0.2;
        let coarse = self.index.coarse_size();
        let step = self
            .config
            .grid_step
            .unwrap_or(coarse * self.config.road_size / 5.0);
        let (coarse_w, coarse_h) = self.index.coarse_dims();

        for x in 1..coarse_w {
            for y in 1..coarse_h {
                let cell = (x as i32, y as i32);
                if self.index.is_filled(cell) || self.index.highways_at(cell).is_empty() {
                    continue;
                }
                self.start_grid_walk(cell, step);
            }
        }
    }

    /// Start a backtracking walk perpendicular to a randomly chosen
    /// highway in the cell, bounded by the iteration cap.
    fn start_grid_walk(&mut self, cell: (i32, i32), step: f32) {
        let highways = self.index.highways_at(cell);
        let highway = highways[self.rng.pick_index(highways.len())];
        let slope = if highway.b.x - highway.a.x == 0.0 {
            0.0
        } else if highway.b.y - highway.a.y == 0.0 {
            10_000.0
        } else {
            -1.0 / ((highway.b.y - highway.a.y) / (highway.b.x - highway.a.x))
        };
        self.cursor.position = highway.midpoint();
        self.cursor.orientation = Vec2::new(5.0, 5.0 * slope).normalize();
        self.stack.clear();
        self.push_reversal();

        let mut alive = true;
        let mut iterations = 0;
        while alive && iterations < GRID_ITERATION_CAP {
            iterations += 1;
            if let Some(hit) = self.find_grid_collision(step) {
                // Truncate at the crossing and retire the thread.
                self.commit_grid_road(hit);
                alive = self.pop_thread();
            } else if self.check_valid(self.cursor.moved(step)) {
                self.commit_grid_road(step);
                if self.on_highway() {
                    alive = self.pop_thread();
                } else if self.rng.chance(0.5) {
                    self.branch(step);
                }
            } else {
                alive = self.pop_thread();
            }
        }
    }

    /// Exact intersection distance of the full candidate step against
    /// fine-grid roads and coarse-grid highways, visiting each cell
    /// along the ray once.
    fn find_grid_collision(&self, dist: f32) -> Option<f32> {
        let candidate = Segment::new(self.cursor.position, self.cursor.moved(dist));
        let mut target = 1000.0f32;

        let mut prev: Option<(i32, i32)> = None;
        let mut incr = 0.0;
        while incr <= dist {
            let probe = self.cursor.moved(incr);
            let cell = self.index.fine_cell(probe);
            if self.check_valid(probe) && prev != Some(cell) {
                prev = Some(cell);
                for road in self.index.roads_at(cell) {
                    if approx_eq(road.a, self.cursor.position)
                        || approx_eq(road.b, self.cursor.position)
                    {
                        continue;
                    }
                    if let Some(d) = intersection_distance(&candidate, road) {
                        if d < target {
                            target = d;
                        }
                    }
                }
            }
            incr += SCAN_STEP;
        }

        let mut prev: Option<(i32, i32)> = None;
        let mut incr = 0.0;
        while incr <= dist {
            let probe = self.cursor.moved(incr);
            let cell = self.index.coarse_cell(probe);
            if self.check_valid(probe) && prev != Some(cell) {
                prev = Some(cell);
                for highway in self.index.highways_at(cell) {
                    if approx_eq(highway.a, self.cursor.position)
                        || approx_eq(highway.b, self.cursor.position)
                    {
                        continue;
                    }
                    if let Some(d) = intersection_distance(&candidate, highway) {
                        if d < target {
                            target = d;
                        }
                    }
                }
            }
            incr += SCAN_STEP;
        }

        (target <= dist).then_some(target)
    }

    /// Whether the cursor stands on a highway in its own coarse cell.
    fn on_highway(&self) -> bool {
        let cell = self.index.coarse_cell(self.cursor.position);
        self.index
            .highways_at(cell)
            .iter()
            .any(|highway| point_on_segment(self.cursor.position, highway))
    }

    /// Commit a grid step: stamp the segment into fine cells, mark
    /// occupancy, flag crossed coarse cells as filled, emit, advance.
    fn commit_grid_road(&mut self, dist: f32) {
        let segment = Segment::new(self.cursor.position, self.cursor.moved(dist));
        let mut prev_fine: Option<(i32, i32)> = None;
        let mut prev_coarse: Option<(i32, i32)> = None;
        let mut i = 0.0;
        while i <= dist {
            let probe = self.cursor.moved(i);
            if self.check_valid(probe) {
                let fine = self.index.fine_cell(probe);
                if prev_fine != Some(fine) {
                    self.index.mark_occupied(probe);
                    self.index.push_road(fine, segment);
                    prev_fine = Some(fine);
                }
                let coarse = self.index.coarse_cell(probe);
                if prev_coarse != Some(coarse) {
                    self.index.mark_filled(probe);
                    prev_coarse = Some(coarse);
                }
            }
            i += STAMP_STEP;
        }
        self.emit(dist);
    }

    /// Emit one instance for the step and advance the cursor.
    fn emit(&mut self, dist: f32) {
        self.instances
            .push(self.cursor.segment_transform(dist), self.cursor.color);
        self.cursor.forward(dist);
    }

    // ----- site sampling and overlays ------------------------------------

    /// Up to `n` terrain-valid, unoccupied coordinates by rejection
    /// sampling; each accepted cell is marked occupied and returned at
    /// its center. Exhausting the retry budget ends the query early,
    /// so callers tolerate a short list.
    pub fn generate_points(&mut self, n: usize) -> Vec<Vec2> {
        let width = self.config.width as f32;
        let height = self.config.height as f32;
        let mut seed = 0.0f32;
        let mut points = Vec::new();
        for _ in 0..n {
            let mut found = None;
            for _ in 0..SITE_ATTEMPTS {
                let sample = sine_hash2_f32(Vec2::new(2.3, 4.5), Vec2::new(6.7, seed));
                seed += 1.0;
                let point = Vec2::new((sample.x * width).floor(), (sample.y * height).floor());
                if self.fields.terrain(point) >= 0.0 && !self.index.is_occupied(point) {
                    self.index.mark_occupied(point);
                    found = Some(point);
                    break;
                }
            }
            match found {
                Some(point) => points.push(point + Vec2::splat(0.5)),
                None => break,
            }
        }
        points
    }

    /// Flood the instance buffer with diagnostic markers.
    pub fn emit_overlay(&mut self, overlay: DebugOverlay) {
        match overlay {
            DebugOverlay::Terrain => self.emit_terrain_overlay(),
            DebugOverlay::Occupancy => self.emit_occupancy_overlay(),
            DebugOverlay::Sites => self.emit_site_overlay(),
        }
    }

    /// Green marker per land cell, blue every tenth lane.
    fn emit_terrain_overlay(&mut self) {
        self.cursor.scale = 0.5;
        self.cursor.orientation = Vec2::Y;
        for i in 0..self.config.width {
            for j in 0..self.config.height {
                let pos = Vec2::new(i as f32, j as f32);
                if self.fields.terrain(pos) >= 0.0 {
                    self.cursor.color = if i % 10 == 0 || j % 10 == 0 {
                        Vec4::new(0.0, 0.0, 1.0, 1.0)
                    } else {
                        Vec4::new(0.0, 0.5, 0.0, 1.0)
                    };
                    self.cursor.position = pos;
                    self.emit(0.5);
                }
            }
        }
    }

    /// White marker per occupied fine cell.
    fn emit_occupancy_overlay(&mut self) {
        self.cursor.scale = 1.0;
        self.cursor.orientation = Vec2::Y;
        self.cursor.color = Vec4::ONE;
        for i in 0..self.config.width {
            for j in 0..self.config.height {
                if self.index.is_occupied(Vec2::new(i as f32, j as f32)) {
                    self.cursor.position = Vec2::new(i as f32 + 0.5, j as f32);
                    self.emit(1.0);
                }
            }
        }
    }

    /// Red marker per freshly sampled building site.
    fn emit_site_overlay(&mut self) {
        self.cursor.scale = 0.5;
        self.cursor.orientation = Vec2::Y;
        self.cursor.color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let points = self.generate_points(500);
        for point in points {
            self.cursor.position = point + Vec2::new(0.0, -0.25);
            self.emit(0.5);
        }
    }
}
