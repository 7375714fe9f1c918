//! Level-of-detail generation
//!
//! A LOD chain is a list of triangle ratios. Level 0 is always the full
//! detail mesh; every other level is decimated independently from the same
//! source so errors do not compound across levels.

use crate::{decimate_mesh, DecimatorOptions};
use meshtile_core::{Error, Mesh, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LodLevel {
    /// Fraction of the source triangles to keep, in `(0, 1]`
    pub ratio: f64,
}

impl LodLevel {
    pub fn full() -> Self {
        Self { ratio: 1.0 }
    }

    /// True when this level needs decimation at all
    pub fn is_simplified(&self) -> bool {
        self.ratio < 1.0
    }

    /// Triangle target for a source with `triangles` faces, never below one
    pub fn target_triangles(&self, triangles: usize) -> usize {
        ((triangles as f64 * self.ratio).ceil() as usize).clamp(1usize.min(triangles), triangles)
    }
}

/// Build LOD levels from ratios, in the given order.
///
/// Ratios are clamped to `(0, 1]` and the first level is forced to full
/// detail. Non-finite or non-positive ratios are rejected.
pub fn build_lod_levels(ratios: &[f64]) -> Result<Vec<LodLevel>> {
    if let Some(bad) = ratios.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(Error::InvalidData(format!(
            "LOD ratio must be a positive number, got {}",
            bad
        )));
    }

    let mut levels: Vec<LodLevel> = ratios
        .iter()
        .map(|&ratio| LodLevel {
            ratio: ratio.min(1.0),
        })
        .collect();
    match levels.first_mut() {
        Some(first) => *first = LodLevel::full(),
        None => levels.push(LodLevel::full()),
    }
    Ok(levels)
}

/// Decimate `mesh` once per level, in parallel. Output order matches `levels`.
pub fn generate_lods(
    mesh: &Mesh,
    levels: &[LodLevel],
    options: &DecimatorOptions,
) -> Result<Vec<Mesh>> {
    levels
        .par_iter()
        .enumerate()
        .map(|(index, level)| {
            if !level.is_simplified() || mesh.is_empty() {
                return Ok(mesh.clone());
            }
            let target = level.target_triangles(mesh.face_count());
            let lod = decimate_mesh(mesh, target as isize, options)?;
            debug!(
                level = index,
                ratio = level.ratio,
                source = mesh.face_count(),
                triangles = lod.face_count(),
                "Generated LOD"
            );
            Ok(lod)
        })
        .collect()
}
