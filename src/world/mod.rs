//! Map-wide state: scalar fields and the spatial index.

pub mod fields;
pub mod index;
