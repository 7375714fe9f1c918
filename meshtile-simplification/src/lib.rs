//! Mesh simplification and decimation algorithms
//!
//! This crate reduces mesh complexity with quadric error metric edge
//! collapse:
//! - Target triangle count decimation
//! - Lossless decimation of redundant geometry
//! - Level-of-detail generation from a list of ratios

pub mod lod;
pub mod options;
pub mod quadric;
pub mod quadric_decimator;

pub use lod::*;
pub use options::*;
pub use quadric::*;
pub use quadric_decimator::*;

use meshtile_core::{Mesh, Result};

/// Lifecycle of a decimator instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecimatorState {
    Uninitialized,
    Initialized,
    Decimated,
    Finalized,
}

/// Progress reported after every collapse pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecimationStatus {
    pub iteration: usize,
    pub original_triangles: usize,
    pub current_triangles: usize,
    /// `None` for lossless runs, which have no triangle target
    pub target_triangles: Option<usize>,
}

/// Initialize from a mesh, reduce it, emit the result.
///
/// Implementations follow `Uninitialized -> Initialized -> Decimated ->
/// Finalized`. Calling [`initialize`](Self::initialize) again at any point
/// discards the previous run. Exactly one of the two decimation calls may run
/// per initialisation; [`to_mesh`](Self::to_mesh) may be called before it and
/// then returns an unmodified copy.
pub trait DecimationAlgorithm {
    fn initialize(&mut self, mesh: &Mesh) -> Result<()>;

    /// Reduce to `target_triangle_count`, clamped to `[0, current]`.
    fn decimate_mesh(
        &mut self,
        target_triangle_count: isize,
        observer: &mut dyn FnMut(&DecimationStatus),
    ) -> Result<()>;

    /// Collapse only edges whose error stays below the lossless threshold.
    fn decimate_mesh_lossless(
        &mut self,
        observer: &mut dyn FnMut(&DecimationStatus),
    ) -> Result<()>;

    fn to_mesh(&mut self) -> Result<Mesh>;

    fn state(&self) -> DecimatorState;
}

/// Decimate `mesh` towards `target_triangle_count` with a fresh
/// [`QuadricDecimator`].
pub fn decimate_mesh(
    mesh: &Mesh,
    target_triangle_count: isize,
    options: &DecimatorOptions,
) -> Result<Mesh> {
    let mut decimator = QuadricDecimator::new(options.clone());
    decimator.initialize(mesh)?;
    decimator.decimate_mesh(target_triangle_count, &mut |_| {})?;
    decimator.to_mesh()
}

/// Losslessly decimate `mesh` with a fresh [`QuadricDecimator`].
pub fn decimate_mesh_lossless(mesh: &Mesh, options: &DecimatorOptions) -> Result<Mesh> {
    let mut decimator = QuadricDecimator::new(options.clone());
    decimator.initialize(mesh)?;
    decimator.decimate_mesh_lossless(&mut |_| {})?;
    decimator.to_mesh()
}
