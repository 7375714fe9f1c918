//! # meshtile
//!
//! Spatial tiling and quadric decimation of textured triangle meshes, as
//! used to cut large models into 3D Tiles.
//!
//! This is the umbrella crate that provides convenient access to all meshtile
//! functionality. Use the individual crates for finer control over
//! dependencies.
//!
//! ## Features
//!
//! - **Core**: Mesh container, faces, materials, bounding boxes, split axes
//! - **Simplification**: Quadric edge-collapse decimation and LOD levels
//! - **Tiling**: Plane splitting and recursive quadtree/octree tiling
//! - **I/O**: OBJ/MTL reading and writing
//!
//! ## Quick Start
//!
//! ```rust
//! use meshtile::prelude::*;
//!
//! let mesh = Mesh::from_vertices_and_faces(
//!     vec![
//!         Point3d::new(0.0, 0.0, 0.0),
//!         Point3d::new(2.0, 0.0, 0.0),
//!         Point3d::new(0.0, 2.0, 0.0),
//!     ],
//!     vec![[0, 1, 2]],
//! );
//!
//! let (left, right) = split_mesh(&mesh, Axis::X, 1.0).unwrap();
//! assert_eq!(left.face_count(), 2);
//! assert_eq!(right.face_count(), 1);
//!
//! let tiles = tile_mesh_quadtree(&mesh, 1).unwrap();
//! assert_eq!(tiles.len(), 3);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables io
//! - `io`: OBJ/MTL support

// Re-export core functionality
pub use meshtile_core::*;

// Re-export sub-crates
pub use meshtile_simplification as simplification;
pub use meshtile_tiling as tiling;

#[cfg(feature = "io")]
pub use meshtile_io as io;

pub mod job;

pub use job::*;

use meshtile_simplification::DecimatorOptions;

/// Decimate `mesh` towards `target_triangle_count` with default options.
///
/// Negative targets are treated as 0 and targets above the face count leave
/// the mesh unchanged.
pub fn decimate_mesh(mesh: &Mesh, target_triangle_count: isize) -> Result<Mesh> {
    meshtile_simplification::decimate_mesh(
        mesh,
        target_triangle_count,
        &DecimatorOptions::default(),
    )
}

/// Remove only geometry that can go without visible change.
pub fn decimate_mesh_lossless(mesh: &Mesh) -> Result<Mesh> {
    meshtile_simplification::decimate_mesh_lossless(mesh, &DecimatorOptions::default())
}

/// Split `mesh` by the plane `axis = value` into (below, above).
pub fn split_mesh(mesh: &Mesh, axis: Axis, value: f64) -> Result<(Mesh, Mesh)> {
    let split = meshtile_tiling::split_mesh(mesh, axis, value)?;
    Ok((split.left, split.right))
}

pub fn tile_mesh_quadtree(mesh: &Mesh, depth: i32) -> Result<Vec<Mesh>> {
    meshtile_tiling::tile_quadtree(mesh, depth)
}

pub fn tile_mesh_octree(mesh: &Mesh, depth: i32) -> Result<Vec<Mesh>> {
    meshtile_tiling::tile_octree(mesh, depth)
}

/// Convenient imports for common use cases
pub mod prelude {
    pub use meshtile_core::*;

    pub use crate::job::{
        DecimationStage, JobOutput, JobStats, ThreadPoolConfig, Tile, TilingJob, TilingJobConfig,
    };
    pub use crate::{
        decimate_mesh, decimate_mesh_lossless, split_mesh, tile_mesh_octree, tile_mesh_quadtree,
    };

    pub use meshtile_simplification::{
        build_lod_levels, DecimationAlgorithm, DecimationStatus, DecimatorOptions, LodLevel,
        QuadricDecimator,
    };
    pub use meshtile_tiling::{CancellationToken, TileCollector, TilingMode};

    #[cfg(feature = "io")]
    pub use meshtile_io::{read_mesh, write_mesh, ObjReader, ObjWriteOptions, ObjWriter};
}
