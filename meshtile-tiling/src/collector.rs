//! Concurrent tile collection

use meshtile_core::{BoundingBox, Mesh};
use std::cmp::Ordering;
use std::sync::{Mutex, PoisonError};

/// Append-only set of leaf meshes shared by concurrent tiling tasks.
///
/// Insertion order follows task completion and is not meaningful; use
/// [`into_sorted_tiles`](Self::into_sorted_tiles) for a reproducible order.
#[derive(Debug, Default)]
pub struct TileCollector {
    tiles: Mutex<Vec<Mesh>>,
}

impl TileCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, tile: Mesh) {
        self.tiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tile);
    }

    pub fn len(&self) -> usize {
        self.tiles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collected tiles in completion order
    pub fn into_tiles(self) -> Vec<Mesh> {
        self.tiles
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Collected tiles ordered by bounding-box minimum corner (x, then y,
    /// then z), ties broken by the maximum corner.
    pub fn into_sorted_tiles(self) -> Vec<Mesh> {
        let mut keyed: Vec<(Option<BoundingBox>, Mesh)> = self
            .into_tiles()
            .into_iter()
            .map(|tile| (tile.bounding_box(), tile))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| compare_boxes(a.as_ref(), b.as_ref()));
        keyed.into_iter().map(|(_, tile)| tile).collect()
    }
}

fn compare_boxes(a: Option<&BoundingBox>, b: Option<&BoundingBox>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let corners = |bb: &BoundingBox| {
                [bb.min.x, bb.min.y, bb.min.z, bb.max.x, bb.max.y, bb.max.z]
            };
            corners(a)
                .iter()
                .zip(corners(b).iter())
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        }
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
    }
}
