//! Two-resolution spatial index over the map bounds.
//!
//! A fine grid (unit cells) holds local road segments and occupancy
//! flags; a coarse grid (one twentieth of the map width per cell) holds
//! highway segments, recorded intersection points, and per-cell
//! "filled" flags for grid growth. Cells only grow during a generation
//! run; a fresh index is constructed per run.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::procgen::geometry::Segment;

type SegmentList = SmallVec<[Segment; 2]>;
type PointList = SmallVec<[Vec2; 2]>;

pub struct SpatialIndex {
    width: usize,
    height: usize,
    coarse_size: f32,
    coarse_w: usize,
    coarse_h: usize,
    /// Fine-cell road segment lists.
    roads: Vec<SegmentList>,
    /// Fine-cell occupancy, shared by roads and building sites.
    occupied: Vec<bool>,
    /// Coarse-cell highway segment lists.
    highways: Vec<SegmentList>,
    /// Branch and merge points recorded per coarse cell.
    intersections: Vec<PointList>,
    /// Coarse cells already covered by a grid road system.
    filled: Vec<bool>,
}

impl SpatialIndex {
    pub fn new(width: u32, height: u32) -> Self {
        let coarse_size = width as f32 / 20.0;
        let coarse_w = (width as f32 / coarse_size).ceil() as usize;
        let coarse_h = (height as f32 / coarse_size).ceil() as usize;
        let fine = (width as usize) * (height as usize);
        let coarse = coarse_w * coarse_h;
        Self {
            width: width as usize,
            height: height as usize,
            coarse_size,
            coarse_w,
            coarse_h,
            roads: vec![SegmentList::new(); fine],
            occupied: vec![false; fine],
            highways: vec![SegmentList::new(); coarse],
            intersections: vec![PointList::new(); coarse],
            filled: vec![false; coarse],
        }
    }

    /// Edge length of one coarse cell in map units.
    pub fn coarse_size(&self) -> f32 {
        self.coarse_size
    }

    pub fn coarse_dims(&self) -> (usize, usize) {
        (self.coarse_w, self.coarse_h)
    }

    pub fn fine_dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Whether a position lies inside `[0, w) x [0, h)`.
    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= 0.0 && pos.x < self.width as f32 && pos.y >= 0.0 && pos.y < self.height as f32
    }

    /// Fine cell of a position; derivable purely from the coordinate.
    pub fn fine_cell(&self, pos: Vec2) -> (i32, i32) {
        (pos.x.floor() as i32, pos.y.floor() as i32)
    }

    /// Coarse cell of a position.
    pub fn coarse_cell(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.coarse_size).floor() as i32,
            (pos.y / self.coarse_size).floor() as i32,
        )
    }

    fn fine_slot(&self, cell: (i32, i32)) -> Option<usize> {
        let (x, y) = cell;
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    fn coarse_slot(&self, cell: (i32, i32)) -> Option<usize> {
        let (x, y) = cell;
        if x < 0 || y < 0 || x as usize >= self.coarse_w || y as usize >= self.coarse_h {
            return None;
        }
        Some(y as usize * self.coarse_w + x as usize)
    }

    /// Road segments stored under one fine cell; empty out of range.
    pub fn roads_at(&self, cell: (i32, i32)) -> &[Segment] {
        self.fine_slot(cell)
            .map(|slot| self.roads[slot].as_slice())
            .unwrap_or(&[])
    }

    pub fn push_road(&mut self, cell: (i32, i32), segment: Segment) {
        if let Some(slot) = self.fine_slot(cell) {
            self.roads[slot].push(segment);
        }
    }

    /// Highway segments stored under one coarse cell; empty out of range.
    pub fn highways_at(&self, cell: (i32, i32)) -> &[Segment] {
        self.coarse_slot(cell)
            .map(|slot| self.highways[slot].as_slice())
            .unwrap_or(&[])
    }

    pub fn push_highway(&mut self, cell: (i32, i32), segment: Segment) {
        if let Some(slot) = self.coarse_slot(cell) {
            self.highways[slot].push(segment);
        }
    }

    pub fn intersections_at(&self, cell: (i32, i32)) -> &[Vec2] {
        self.coarse_slot(cell)
            .map(|slot| self.intersections[slot].as_slice())
            .unwrap_or(&[])
    }

    /// Record a branch or merge point under its coarse cell.
    pub fn record_intersection(&mut self, pos: Vec2) {
        let cell = self.coarse_cell(pos);
        if let Some(slot) = self.coarse_slot(cell) {
            self.intersections[slot].push(pos);
        }
    }

    /// Highway segments in the 3x3 coarse block around `pos`; the scan
    /// block bounds misses from segments straddling a cell boundary.
    pub fn highways_near(&self, pos: Vec2) -> impl Iterator<Item = Segment> + '_ {
        let (cx, cy) = self.coarse_cell(pos);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .flat_map(move |cell| self.highways_at(cell).iter().copied())
    }

    /// Recorded intersection points in the 3x3 coarse block around `pos`.
    pub fn intersections_near(&self, pos: Vec2) -> impl Iterator<Item = Vec2> + '_ {
        let (cx, cy) = self.coarse_cell(pos);
        (-1..=1)
            .flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy)))
            .flat_map(move |cell| self.intersections_at(cell).iter().copied())
    }

    pub fn mark_occupied(&mut self, pos: Vec2) {
        let cell = self.fine_cell(pos);
        if let Some(slot) = self.fine_slot(cell) {
            self.occupied[slot] = true;
        }
    }

    pub fn is_occupied(&self, pos: Vec2) -> bool {
        self.fine_slot(self.fine_cell(pos))
            .map(|slot| self.occupied[slot])
            .unwrap_or(false)
    }

    pub fn mark_filled(&mut self, pos: Vec2) {
        let cell = self.coarse_cell(pos);
        if let Some(slot) = self.coarse_slot(cell) {
            self.filled[slot] = true;
        }
    }

    pub fn is_filled(&self, cell: (i32, i32)) -> bool {
        self.coarse_slot(cell)
            .map(|slot| self.filled[slot])
            .unwrap_or(false)
    }
}
