//! Point types and related functionality

use nalgebra::{Point2, Point3, Vector3};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// A texture coordinate. Both components are expected to be non-negative.
pub type TexCoord = Point2<f64>;

/// Linear interpolation between two points, `t = 0` yields `a`.
#[inline]
pub fn lerp_point(a: &Point3d, b: &Point3d, t: f64) -> Point3d {
    Point3d::from(a.coords + (b.coords - a.coords) * t)
}

/// Linear interpolation between two texture coordinates.
#[inline]
pub fn lerp_tex(a: &TexCoord, b: &TexCoord, t: f64) -> TexCoord {
    TexCoord::from(a.coords + (b.coords - a.coords) * t)
}

/// Area of the triangle spanned by three points.
pub fn triangle_area(a: &Point3d, b: &Point3d, c: &Point3d) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}
