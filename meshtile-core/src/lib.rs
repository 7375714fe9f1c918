//! Core data structures for meshtile
//!
//! This crate provides the geometry shared by the splitter, the tiler and the
//! decimator: double precision points, faces and edges, bounding boxes, the
//! axis strategy and the indexed [`Mesh`] container.

pub mod axis;
pub mod bounds;
pub mod error;
pub mod face;
pub mod mesh;
pub mod point;

pub use axis::*;
pub use bounds::*;
pub use error::*;
pub use face::*;
pub use mesh::*;
pub use point::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point2, Point3, Vector3};
