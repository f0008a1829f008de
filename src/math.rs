//! Types, aliases and helper operations for doing math with `ultraviolet`.
use std::f64::consts::PI;
pub use ultraviolet as uv;

pub type Vec2 = uv::DVec2;

/// An angle in either degrees or radians.
/// Default conversion from f64 is in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
pub enum Angle {
    Rad(f64),
    Deg(f64),
}
impl Angle {
    /// Get the angle as degrees.
    #[inline]
    pub fn deg(&self) -> f64 {
        match self {
            Angle::Rad(rad) => rad * 180.0 / PI,
            Angle::Deg(deg) => *deg,
        }
    }

    /// Get the angle as radians.
    #[inline]
    pub fn rad(&self) -> f64 {
        match self {
            Angle::Rad(rad) => *rad,
            Angle::Deg(deg) => deg * PI / 180.0,
        }
    }
}
impl Default for Angle {
    fn default() -> Self {
        Angle::Rad(0.0)
    }
}
impl From<f64> for Angle {
    #[inline]
    fn from(deg: f64) -> Self {
        Angle::Deg(deg)
    }
}

/// A wrapper type to indicate a vector should always be normalized.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Unit<T>(T);

impl Unit<Vec2> {
    pub fn new_normalize(v: Vec2) -> Self {
        Unit(v.normalized())
    }

    pub const fn new_unchecked(v: Vec2) -> Self {
        Unit(v)
    }

    pub fn unit_x() -> Self {
        Unit(Vec2::unit_x())
    }

    pub fn unit_y() -> Self {
        Unit(Vec2::unit_y())
    }

    /// Rotate by the given angle in radians.
    #[inline]
    pub fn rotated(self, angle: f64) -> Self {
        Unit(rotate(self.0, angle))
    }
}

impl<T> std::ops::Deref for Unit<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> std::ops::Neg for Unit<T>
where
    T: std::ops::Neg,
{
    type Output = Unit<<T as std::ops::Neg>::Output>;

    fn neg(self) -> Self::Output {
        Unit(-self.0)
    }
}

// Vec2 utils

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}
#[inline]
pub fn unit_left_normal(u: Unit<Vec2>) -> Unit<Vec2> {
    Unit::new_unchecked(left_normal(*u))
}

/// The z component of the 3D cross product of two vectors in the xy plane.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Rotate a vector about the origin.
#[inline]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Rotate a point about another point.
#[inline]
pub fn rotate_about(v: Vec2, point: Vec2, angle: f64) -> Vec2 {
    point + rotate(v - point, angle)
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_counterclockwise_in_xy() {
        let r = rotate(Vec2::unit_x(), PI / 2.0);
        assert!(r.x.abs() < 1e-12);
        assert!((r.y - 1.0).abs() < 1e-12);

        let about = rotate_about(Vec2::new(2.0, 1.0), Vec2::new(1.0, 1.0), PI);
        assert!((about - Vec2::new(0.0, 1.0)).mag() < 1e-12);
    }

    #[test]
    fn cross_and_normals() {
        let a = Vec2::new(2.0, 0.0);
        let b = Vec2::new(0.0, 3.0);
        assert_eq!(cross(a, b), 6.0);
        assert_eq!(cross(b, a), -6.0);
        assert_eq!(left_normal(a), Vec2::new(0.0, 2.0));
        assert_eq!(right_normal(a), Vec2::new(0.0, -2.0));
    }

    #[test]
    fn angle_conversions() {
        assert!((Angle::Deg(180.0).rad() - PI).abs() < 1e-12);
        assert!((Angle::Rad(PI / 2.0).deg() - 90.0).abs() < 1e-12);
        assert_eq!(Angle::from(45.0), Angle::Deg(45.0));
    }
}
