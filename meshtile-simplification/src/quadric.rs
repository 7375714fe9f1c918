//! Symmetric error matrices
//!
//! A quadric is the upper triangle of a symmetric 4x4 matrix accumulated from
//! supporting planes. Evaluating it at a point gives the sum of squared
//! distances from that point to every plane that contributed to it.

use meshtile_core::{Point3d, Vector3d};
use std::ops::{Add, AddAssign};

/// Ten coefficients of a symmetric 4x4 matrix, row-major upper triangle:
///
/// ```text
/// [0 1 2 3]
/// [  4 5 6]
/// [    7 8]
/// [      9]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SymmetricMatrix {
    m: [f64; 10],
}

impl SymmetricMatrix {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(m: [f64; 10]) -> Self {
        Self { m }
    }

    /// Outer product of the plane `a x + b y + c z + d = 0` with itself
    pub fn from_plane(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self {
            m: [
                a * a,
                a * b,
                a * c,
                a * d,
                b * b,
                b * c,
                b * d,
                c * c,
                c * d,
                d * d,
            ],
        }
    }

    /// Plane through `point` with unit `normal`
    pub fn from_point_normal(point: &Point3d, normal: &Vector3d) -> Self {
        Self::from_plane(normal.x, normal.y, normal.z, -normal.dot(&point.coords))
    }

    /// Determinant of the 3x3 matrix picked out by nine coefficient indices
    #[rustfmt::skip]
    #[allow(clippy::too_many_arguments)]
    pub fn det(
        &self,
        a11: usize, a12: usize, a13: usize,
        a21: usize, a22: usize, a23: usize,
        a31: usize, a32: usize, a33: usize,
    ) -> f64 {
        let m = &self.m;
        m[a11] * m[a22] * m[a33] + m[a13] * m[a21] * m[a32] + m[a12] * m[a23] * m[a31]
            - m[a13] * m[a22] * m[a31]
            - m[a11] * m[a23] * m[a32]
            - m[a12] * m[a21] * m[a33]
    }

    /// Determinant of the upper-left 3x3 block
    #[inline]
    pub fn det3(&self) -> f64 {
        self.det(0, 1, 2, 1, 4, 5, 2, 5, 7)
    }

    /// Point minimising the error, solved by Cramer's rule on the 3x3 block.
    /// `None` when the block's determinant is within `epsilon` of zero.
    pub fn minimizer(&self, epsilon: f64) -> Option<Point3d> {
        let det = self.det3();
        if det.abs() <= epsilon || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Point3d::new(
            -inv * self.det(1, 2, 3, 4, 5, 6, 5, 7, 8),
            inv * self.det(0, 2, 3, 1, 5, 6, 2, 7, 8),
            -inv * self.det(0, 1, 3, 1, 4, 6, 2, 5, 8),
        ))
    }

    /// vᵀ Q v for v = (x, y, z, 1). Rounding can push flat configurations a
    /// hair below zero; the result is clamped.
    pub fn evaluate(&self, p: &Point3d) -> f64 {
        let m = &self.m;
        let (x, y, z) = (p.x, p.y, p.z);
        let e = m[0] * x * x
            + 2.0 * m[1] * x * y
            + 2.0 * m[2] * x * z
            + 2.0 * m[3] * x
            + m[4] * y * y
            + 2.0 * m[5] * y * z
            + 2.0 * m[6] * y
            + m[7] * z * z
            + 2.0 * m[8] * z
            + m[9];
        e.max(0.0)
    }
}

impl Add for SymmetricMatrix {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for SymmetricMatrix {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.m.iter_mut().zip(rhs.m.iter()) {
            *a += b;
        }
    }
}
