//! Axis-aligned bounding boxes

use crate::axis::Axis;
use crate::point::{Point3d, Vector3d};
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box. `min <= max` holds component-wise; a box
/// with zero extent on some axis is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    /// Create a box from two corners, reordering components as needed
    pub fn new(a: Point3d, b: Point3d) -> Self {
        Self {
            min: Point3d::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3d::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Tight box around a set of points, `None` if there are none
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3d>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    pub fn center(&self) -> Point3d {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3d {
        self.max - self.min
    }

    pub fn contains(&self, p: &Point3d) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Like [`contains`](Self::contains) but tolerating `eps` outside each face
    pub fn contains_eps(&self, p: &Point3d, eps: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - eps && p[i] <= self.max[i] + eps)
    }

    /// Bisect the box at its center along `axis`, returning `[lower, upper]`.
    pub fn split(&self, axis: Axis) -> [BoundingBox; 2] {
        let mid = axis.component(&self.center());
        let lower = BoundingBox {
            min: self.min,
            max: axis.with_component(&self.max, mid),
        };
        let upper = BoundingBox {
            min: axis.with_component(&self.min, mid),
            max: self.max,
        };
        [lower, upper]
    }
}
