//! Parallel transform/color arrays consumed by instanced draw calls.
//!
//! Transforms are stored split into their four columns, matching the
//! per-instance vertex attributes the renderer binds; colors ride in a
//! fifth array. Everything is `Pod` so upload is a byte-slice cast.

use bevy::prelude::*;
use bytemuck::{Pod, Zeroable};

/// One 4-float attribute row: a transform column or an RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct InstanceRow(pub [f32; 4]);

/// Instance data for one primitive family.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstanceBuffer {
    pub transform1: Vec<InstanceRow>,
    pub transform2: Vec<InstanceRow>,
    pub transform3: Vec<InstanceRow>,
    pub transform4: Vec<InstanceRow>,
    pub colors: Vec<InstanceRow>,
    count: usize,
}

impl InstanceBuffer {
    /// Append one placement.
    pub fn push(&mut self, transform: Mat4, color: Vec4) {
        let cols = transform.to_cols_array_2d();
        self.transform1.push(InstanceRow(cols[0]));
        self.transform2.push(InstanceRow(cols[1]));
        self.transform3.push(InstanceRow(cols[2]));
        self.transform4.push(InstanceRow(cols[3]));
        self.colors.push(InstanceRow(color.to_array()));
        self.count += 1;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn transform1_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transform1)
    }

    pub fn transform2_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transform2)
    }

    pub fn transform3_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transform3)
    }

    pub fn transform4_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transform4)
    }

    pub fn colors_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }
}
