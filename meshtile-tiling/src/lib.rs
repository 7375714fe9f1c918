//! Spatial tiling of triangle meshes
//!
//! This crate cuts meshes into tiles for streaming:
//! - Splitting a mesh by an axis-aligned plane, with exact crossing vertices
//!   and interpolated texture coordinates
//! - Recursive quadtree (X, Y) and octree (X, Y, Z) subdivision
//! - Concurrent collection of the resulting leaf tiles

pub mod collector;
pub mod splitter;
pub mod tiler;

pub use collector::*;
pub use splitter::*;
pub use tiler::*;
