//! Axis strategy used by the splitter and the bounding box

use crate::point::{lerp_point, Point3d};
use serde::{Deserialize, Serialize};

/// A coordinate axis.
///
/// Each axis dispatches through a static table of plain functions so that the
/// split loop never goes through a vtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

struct AxisOps {
    component: fn(&Point3d) -> f64,
    with_component: fn(&Point3d, f64) -> Point3d,
}

static AXIS_OPS: [AxisOps; 3] = [
    AxisOps {
        component: |p| p.x,
        with_component: |p, v| Point3d::new(v, p.y, p.z),
    },
    AxisOps {
        component: |p| p.y,
        with_component: |p, v| Point3d::new(p.x, v, p.z),
    },
    AxisOps {
        component: |p| p.z,
        with_component: |p, v| Point3d::new(p.x, p.y, v),
    },
];

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    #[inline]
    fn ops(self) -> &'static AxisOps {
        &AXIS_OPS[self.index()]
    }

    /// The coordinate of `p` along this axis
    #[inline]
    pub fn component(self, p: &Point3d) -> f64 {
        (self.ops().component)(p)
    }

    /// A copy of `p` with this axis' coordinate replaced by `value`
    #[inline]
    pub fn with_component(self, p: &Point3d, value: f64) -> Point3d {
        (self.ops().with_component)(p, value)
    }

    /// Intersect the segment `a → b` with the plane `axis = value`.
    ///
    /// Returns the crossing point and its parameter `t` along the segment. The
    /// axis coordinate of the result is snapped to `value` exactly. A segment
    /// parallel to the plane yields its start point.
    pub fn cut(self, a: &Point3d, b: &Point3d, value: f64) -> (Point3d, f64) {
        let ca = self.component(a);
        let cb = self.component(b);
        let denom = cb - ca;
        let t = if denom == 0.0 {
            0.0
        } else {
            ((value - ca) / denom).clamp(0.0, 1.0)
        };
        let p = lerp_point(a, b, t);
        (self.with_component(&p, value), t)
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}
