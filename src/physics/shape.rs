//! Convex shapes that body parts are made of.

use super::{
    geometry::{self, Vertex, AABB},
    BodyId,
};
use crate::math::{Unit, Vec2};

/// Maximum number of sides used to approximate a circle.
const CIRCLE_MAX_SIDES: usize = 25;
/// Minimum number of sides used to approximate a circle.
const CIRCLE_MIN_SIDES: usize = 10;

/// The shape of a single convex body part, in world space.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Polygon(Polygon),
    /// A circle approximated by a regular polygon for the separating axis test.
    Circle(Circle),
}

/// A convex polygon with its precomputed separating axes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) axes: Vec<Unit<Vec2>>,
}

impl Polygon {
    /// Create a polygon from points, sorting them into clockwise order.
    pub fn new(points: &[Vec2], owner: BodyId) -> Self {
        debug_assert!(points.len() >= 3, "a polygon needs at least three points");
        let mut vertices = geometry::build(points, owner);
        geometry::sort_clockwise(&mut vertices);
        geometry::reindex(&mut vertices, owner);
        let axes = geometry::axes(&vertices);
        Self { vertices, axes }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[inline]
    pub fn axes(&self) -> &[Unit<Vec2>] {
        &self.axes
    }

    fn scale(&mut self, scale: Vec2, point: Vec2) {
        geometry::scale(&mut self.vertices, scale, point);
        self.axes = geometry::axes(&self.vertices);
    }
}

/// A circle with a polygonal hull used for collision detection.
#[derive(Clone, Debug, PartialEq)]
pub struct Circle {
    pub(crate) radius: f64,
    pub(crate) hull: Polygon,
}

impl Circle {
    /// Create a circle of the given radius around a centre point.
    pub fn new(centre: Vec2, radius: f64, owner: BodyId) -> Self {
        let sides = Self::side_count(radius);
        let theta = 2.0 * std::f64::consts::PI / sides as f64;
        let offset = theta * 0.5;
        let points: Vec<Vec2> = (0..sides)
            .map(|i| {
                let angle = offset + i as f64 * theta;
                centre + Vec2::new(angle.cos(), angle.sin()) * radius
            })
            .collect();
        Self {
            radius,
            hull: Polygon::new(&points, owner),
        }
    }

    /// Number of hull sides for a radius, always even so that opposite edges share an axis.
    fn side_count(radius: f64) -> usize {
        let sides = (radius.ceil().max(0.0) as usize).clamp(CIRCLE_MIN_SIDES, CIRCLE_MAX_SIDES);
        if sides % 2 == 1 {
            sides + 1
        } else {
            sides
        }
    }

    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    pub fn hull(&self) -> &Polygon {
        &self.hull
    }
}

impl Shape {
    /// The polygon used for collision detection.
    #[inline]
    pub fn polygon(&self) -> &Polygon {
        match self {
            Shape::Polygon(poly) => poly,
            Shape::Circle(circle) => &circle.hull,
        }
    }

    #[inline]
    fn polygon_mut(&mut self) -> &mut Polygon {
        match self {
            Shape::Polygon(poly) => poly,
            Shape::Circle(circle) => &mut circle.hull,
        }
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.polygon().vertices
    }

    #[inline]
    pub fn axes(&self) -> &[Unit<Vec2>] {
        &self.polygon().axes
    }

    /// Radius if this is still a circle.
    #[inline]
    pub fn radius(&self) -> Option<f64> {
        match self {
            Shape::Polygon(_) => None,
            Shape::Circle(circle) => Some(circle.radius),
        }
    }

    /// Tight bounds of the shape, with `centre` being the position of the owning part.
    pub fn bounds(&self, centre: Vec2) -> AABB {
        match self {
            Shape::Polygon(poly) => AABB::from_vertices(&poly.vertices),
            Shape::Circle(circle) => {
                let r = Vec2::broadcast(circle.radius);
                AABB {
                    min: centre - r,
                    max: centre + r,
                }
            }
        }
    }

    pub(crate) fn set_owner(&mut self, owner: BodyId) {
        geometry::reindex(&mut self.polygon_mut().vertices, owner);
    }

    pub(crate) fn translate(&mut self, offset: Vec2) {
        geometry::translate(&mut self.polygon_mut().vertices, offset);
    }

    pub(crate) fn rotate(&mut self, angle: f64, point: Vec2) {
        let poly = self.polygon_mut();
        geometry::rotate(&mut poly.vertices, angle, point);
        geometry::rotate_axes(&mut poly.axes, angle);
    }

    /// Scale about a point.
    /// A circle scaled unevenly turns into a polygon.
    pub(crate) fn scale(&mut self, scale: Vec2, point: Vec2) {
        if let Shape::Circle(circle) = self {
            if scale.x == scale.y {
                circle.radius *= scale.x.abs();
            } else {
                let hull = std::mem::take(&mut circle.hull);
                *self = Shape::Polygon(hull);
            }
        }
        self.polygon_mut().scale(scale, point);
    }
}

//
// tests
//
