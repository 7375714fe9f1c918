//! Recursive quadtree/octree tiling
//!
//! Every level bisects the current mesh once per tiled axis (X then Y for a
//! quadtree, X then Y then Z for an octree). Non-empty children descend in
//! parallel and each level joins all of its children before returning, so a
//! failure anywhere below reaches the caller. Only non-empty leaves are
//! collected.

use crate::collector::TileCollector;
use crate::splitter::split_mesh;
use meshtile_core::{Axis, BoundingBox, Error, Mesh, Point3d, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Spatial subdivision scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TilingMode {
    /// Four children per level, cut along X and Y
    #[default]
    Quadtree,
    /// Eight children per level, cut along X, Y and Z
    Octree,
}

impl TilingMode {
    pub fn axes(self) -> &'static [Axis] {
        match self {
            TilingMode::Quadtree => &[Axis::X, Axis::Y],
            TilingMode::Octree => &Axis::ALL,
        }
    }

    /// Children produced by one level
    pub fn fan_out(self) -> usize {
        1 << self.axes().len()
    }
}

/// Cooperative cancellation flag, cloned into every task of a run
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Error::Cancelled)` once cancelled
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Where a node gets cut
#[derive(Clone, Copy)]
enum Cut<'f> {
    /// Centre of a fixed box, halved along each axis for the children
    Bounds(BoundingBox),
    /// Evaluated afresh on each node's mesh
    Adaptive(&'f (dyn Fn(&Mesh) -> Point3d + Sync)),
}

impl Cut<'_> {
    fn point(&self, mesh: &Mesh) -> Point3d {
        match self {
            Cut::Bounds(bounds) => bounds.center(),
            Cut::Adaptive(f) => f(mesh),
        }
    }

    fn halves(&self, axis: Axis) -> [Self; 2] {
        match self {
            Cut::Bounds(bounds) => bounds.split(axis).map(Cut::Bounds),
            Cut::Adaptive(_) => [*self, *self],
        }
    }
}

fn check_depth(depth: i32) -> Result<u32> {
    u32::try_from(depth).map_err(|_| {
        Error::InvalidData(format!("tiling depth must be non-negative, got {}", depth))
    })
}

/// One level: split `mesh` into its non-empty children.
fn split_level<'f>(
    mesh: &Mesh,
    cut: Cut<'f>,
    mode: TilingMode,
) -> Result<(Vec<(Mesh, Cut<'f>)>, usize)> {
    let point = cut.point(mesh);
    let axes = mode.axes();
    let mut operations = 0;

    let first = split_mesh(mesh, axes[0], axes[0].component(&point))?;
    operations += first.operations;
    let [lower, upper] = cut.halves(axes[0]);
    let mut parts = vec![(first.left, lower), (first.right, upper)];

    for &axis in &axes[1..] {
        let value = axis.component(&point);
        let mut next = Vec::with_capacity(parts.len() * 2);
        for (part, part_cut) in parts {
            if part.is_empty() {
                continue;
            }
            let split = split_mesh(&part, axis, value)?;
            operations += split.operations;
            let [lower, upper] = part_cut.halves(axis);
            next.push((split.left, lower));
            next.push((split.right, upper));
        }
        parts = next;
    }

    parts.retain(|(part, _)| !part.is_empty());
    Ok((parts, operations))
}

fn descend(
    mesh: Cow<'_, Mesh>,
    depth: u32,
    cut: Cut<'_>,
    mode: TilingMode,
    collector: &TileCollector,
    cancel: &CancellationToken,
) -> Result<usize> {
    cancel.check()?;

    if depth == 0 {
        if mesh.is_empty() {
            trace!("Dropping empty tile");
        } else {
            collector.push(mesh.into_owned());
        }
        return Ok(0);
    }

    let (children, operations) = split_level(&mesh, cut, mode)?;
    drop(mesh);
    trace!(depth, children = children.len(), operations, "Split level");

    let below = children
        .into_par_iter()
        .map(|(child, child_cut)| {
            descend(Cow::Owned(child), depth - 1, child_cut, mode, collector, cancel)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    Ok(operations + below)
}

/// Tile `mesh` down to `depth` levels, cutting every node at the centre of
/// its share of `bounds`. Returns the total split operation count.
pub fn recurse_split(
    mesh: &Mesh,
    depth: i32,
    bounds: &BoundingBox,
    mode: TilingMode,
    collector: &TileCollector,
    cancel: &CancellationToken,
) -> Result<usize> {
    let depth = check_depth(depth)?;
    descend(
        Cow::Borrowed(mesh),
        depth,
        Cut::Bounds(*bounds),
        mode,
        collector,
        cancel,
    )
}

/// Like [`recurse_split`], but every node is cut at `split_point(node_mesh)`.
pub fn recurse_split_with<F>(
    mesh: &Mesh,
    depth: i32,
    split_point: F,
    mode: TilingMode,
    collector: &TileCollector,
    cancel: &CancellationToken,
) -> Result<usize>
where
    F: Fn(&Mesh) -> Point3d + Sync,
{
    let depth = check_depth(depth)?;
    descend(
        Cow::Borrowed(mesh),
        depth,
        Cut::Adaptive(&split_point),
        mode,
        collector,
        cancel,
    )
}

/// Tile over the mesh's own bounds and return the leaves in sorted order.
pub fn tile_mesh(mesh: &Mesh, depth: i32, mode: TilingMode) -> Result<Vec<Mesh>> {
    let depth_checked = check_depth(depth)?;
    let Some(bounds) = mesh.bounding_box().filter(|_| !mesh.is_empty()) else {
        return Ok(Vec::new());
    };

    let collector = TileCollector::new();
    let operations = recurse_split(
        mesh,
        depth,
        &bounds,
        mode,
        &collector,
        &CancellationToken::new(),
    )?;
    trace!(depth = depth_checked, operations, tiles = collector.len(), "Tiling complete");
    Ok(collector.into_sorted_tiles())
}

pub fn tile_quadtree(mesh: &Mesh, depth: i32) -> Result<Vec<Mesh>> {
    tile_mesh(mesh, depth, TilingMode::Quadtree)
}

pub fn tile_octree(mesh: &Mesh, depth: i32) -> Result<Vec<Mesh>> {
    tile_mesh(mesh, depth, TilingMode::Octree)
}
