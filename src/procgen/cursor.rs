//! Movable reference frame (turtle) used to lay down geometry
//! incrementally.
//!
//! Cursors are plain `Copy` values: branch points push snapshots onto
//! the growth stack, and mutating the live cursor never touches a
//! snapshot pushed earlier.

use bevy::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cursor {
    pub position: Vec2,
    /// Unit heading; every rotation keeps it normalized.
    pub orientation: Vec2,
    pub scale: f32,
    pub color: Vec4,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            orientation: Vec2::Y,
            scale: 1.0,
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl Cursor {
    /// Position `distance` ahead along the heading, without moving.
    pub fn moved(&self, distance: f32) -> Vec2 {
        self.position + self.orientation * distance
    }

    /// Translate along the heading.
    pub fn forward(&mut self, distance: f32) {
        self.position = self.moved(distance);
    }

    /// Rotate the heading `degrees` counterclockwise.
    pub fn rotate(&mut self, degrees: f32) {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.orientation = Vec2::new(
            cos * self.orientation.x - sin * self.orientation.y,
            sin * self.orientation.x + cos * self.orientation.y,
        );
    }

    /// Placement transform for a road slab spanning `length` along the
    /// heading: a unit primitive scaled to `(scale, 0.01, length)`,
    /// rotated so +Z follows the heading, resting on the ground plane.
    pub fn segment_transform(&self, length: f32) -> Mat4 {
        let heading = Vec3::new(self.orientation.x, 0.0, self.orientation.y).normalize();
        let rotation = Quat::from_rotation_arc(Vec3::Z, heading);
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.scale, 0.01, length),
            rotation,
            Vec3::new(self.position.x, 1.0, self.position.y),
        )
    }

    /// Placement transform for a building column of `height` anchored
    /// at the cursor position, hung `height` above the origin so the
    /// stack's remaining extent doubles as its lift.
    pub fn column_transform(&self, height: f32) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.scale, height, self.scale),
            Quat::IDENTITY,
            Vec3::new(self.position.x, height, self.position.y),
        )
    }
}
