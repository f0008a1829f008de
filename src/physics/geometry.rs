//! Vertex rings, separating axes and axis-aligned bounding boxes.
//!
//! Vertex rings are kept in clockwise order as seen on a y-down screen
//! (ascending angle about the centroid in standard coordinates),
//! which is the winding [`contains`] expects.

use super::BodyId;
use crate::math::{self as m, Unit, Vec2};

use itertools::Itertools;

/// A corner of a convex polygon belonging to a body part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub pos: Vec2,
    /// Position of this vertex in its polygon's ring.
    pub index: usize,
    /// Id of the part that owns this vertex.
    pub body: BodyId,
    pub is_internal: bool,
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            pos: Vec2::zero(),
            index: 0,
            body: BodyId::UNASSIGNED,
            is_internal: false,
        }
    }
}

/// Build a vertex ring from points, in the given order.
pub fn build(points: &[Vec2], body: BodyId) -> Vec<Vertex> {
    points
        .iter()
        .enumerate()
        .map(|(index, &pos)| Vertex {
            pos,
            index,
            body,
            is_internal: false,
        })
        .collect()
}

/// Reassign indices and owner after the ring has been reordered or moved to another part.
pub fn reindex(vertices: &mut [Vertex], body: BodyId) {
    for (index, v) in vertices.iter_mut().enumerate() {
        v.index = index;
        v.body = body;
    }
}

/// Area of the polygon, optionally signed by winding.
pub fn area(vertices: &[Vertex], signed: bool) -> f64 {
    let Some(last) = vertices.last() else {
        return 0.0;
    };
    let mut area = 0.0;
    let mut prev = last.pos;
    for v in vertices {
        area += (prev.x - v.pos.x) * (prev.y + v.pos.y);
        prev = v.pos;
    }
    if signed {
        area / 2.0
    } else {
        area.abs() / 2.0
    }
}

/// Area-weighted centroid of the polygon.
pub fn centre(vertices: &[Vertex]) -> Vec2 {
    let mut sum = Vec2::zero();
    let mut cross_sum = 0.0;
    for (curr, next) in edges(vertices) {
        let cross = m::cross(curr, next);
        sum += (curr + next) * cross;
        cross_sum += cross;
    }
    if cross_sum == 0.0 {
        return mean(vertices);
    }
    sum / (3.0 * cross_sum)
}

/// Arithmetic mean of the vertex positions.
pub fn mean(vertices: &[Vertex]) -> Vec2 {
    if vertices.is_empty() {
        return Vec2::zero();
    }
    let sum = vertices.iter().fold(Vec2::zero(), |acc, v| acc + v.pos);
    sum / vertices.len() as f64
}

/// Moment of inertia of the polygon about the origin for the given mass.
pub fn inertia(vertices: &[Vertex], mass: f64) -> f64 {
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (vi, vj) in edges(vertices) {
        let cross = m::cross(vj, vi).abs();
        numerator += cross * (vj.dot(vj) + vj.dot(vi) + vi.dot(vi));
        denominator += cross;
    }
    if denominator == 0.0 {
        return 0.0;
    }
    (mass / 6.0) * (numerator / denominator)
}

/// Consecutive pairs of vertex positions, wrapping around from the last to the first.
fn edges(vertices: &[Vertex]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    vertices.iter().map(|v| v.pos).circular_tuple_windows()
}

pub fn translate(vertices: &mut [Vertex], offset: Vec2) {
    for v in vertices {
        v.pos += offset;
    }
}

pub fn rotate(vertices: &mut [Vertex], angle: f64, point: Vec2) {
    if angle == 0.0 {
        return;
    }
    for v in vertices {
        v.pos = m::rotate_about(v.pos, point, angle);
    }
}

/// Scale per axis about a point.
pub fn scale(vertices: &mut [Vertex], scale: Vec2, point: Vec2) {
    if scale.x == 1.0 && scale.y == 1.0 {
        return;
    }
    for v in vertices {
        let delta = v.pos - point;
        v.pos = point + Vec2::new(delta.x * scale.x, delta.y * scale.y);
    }
}

/// Check whether a point lies inside (or on the edge of) a convex polygon.
pub fn contains(vertices: &[Vertex], point: Vec2) -> bool {
    let Some(last) = vertices.last() else {
        return false;
    };
    let mut v = last.pos;
    for next in vertices {
        let nv = next.pos;
        if (point.x - v.x) * (nv.y - v.y) + (point.y - v.y) * (v.x - nv.x) > 0.0 {
            return false;
        }
        v = nv;
    }
    true
}

/// Sort by angle about the mean so the ring winds clockwise on screen.
pub fn sort_clockwise(vertices: &mut [Vertex]) {
    let centre = mean(vertices);
    let angle = |v: &Vertex| (v.pos.y - centre.y).atan2(v.pos.x - centre.x);
    vertices.sort_by(|a, b| angle(a).total_cmp(&angle(b)));
}

/// Convex hull of a point set using the monotone chain algorithm.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    if sorted.len() < 3 {
        return sorted;
    }

    let turn = |o: Vec2, a: Vec2, b: Vec2| m::cross(a - o, b - o);

    let mut lower: Vec<Vec2> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && turn(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Vec2> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && turn(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    // endpoints of each chain are the start of the other
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

//
// Axes
//

/// Unit edge normals of the polygon with parallel edges collapsed into one axis.
///
/// Each normal is flipped into the upper half plane first,
/// so opposite edges produce the same axis.
pub fn axes(vertices: &[Vertex]) -> Vec<Unit<Vec2>> {
    const EPSILON: f64 = 1e-9;

    let mut by_angle: Vec<(f64, Unit<Vec2>)> = Vec::with_capacity(vertices.len());
    for (curr, next) in edges(vertices) {
        let edge_normal = Vec2::new(next.y - curr.y, curr.x - next.x);
        if edge_normal.mag_sq() == 0.0 {
            continue;
        }
        let mut normal = edge_normal.normalized();
        if normal.y < -EPSILON || (normal.y.abs() <= EPSILON && normal.x < 0.0) {
            normal = -normal;
        }
        by_angle.push((normal.y.atan2(normal.x), Unit::new_unchecked(normal)));
    }

    let parallel = |a: &Unit<Vec2>, b: &Unit<Vec2>| m::cross(**a, **b).abs() < EPSILON;

    by_angle.sort_by(|a, b| a.0.total_cmp(&b.0));
    by_angle.dedup_by(|a, b| parallel(&a.1, &b.1));
    // angles near 0 and near pi are the same direction
    if by_angle.len() > 1 && parallel(&by_angle[0].1, &by_angle[by_angle.len() - 1].1) {
        by_angle.pop();
    }
    by_angle.into_iter().map(|(_, axis)| axis).collect()
}

pub fn rotate_axes(axes: &mut [Unit<Vec2>], angle: f64) {
    if angle == 0.0 {
        return;
    }
    for axis in axes {
        *axis = axis.rotated(angle);
    }
}

/// Minimum and maximum of the projections of a polygon onto an axis.
pub fn project(vertices: &[Vertex], axis: Unit<Vec2>) -> (f64, f64) {
    vertices
        .iter()
        .map(|v| v.pos.dot(*axis))
        .fold((f64::MAX, f64::MIN), |(min, max), d| (min.min(d), max.max(d)))
}

//
// AABB
//

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(clippy::upper_case_acronyms)]
pub struct AABB {
    pub min: Vec2,
    pub max: Vec2,
}

impl AABB {
    pub fn from_vertices(vertices: &[Vertex]) -> Self {
        let mut bounds = Self {
            min: Vec2::new(f64::MAX, f64::MAX),
            max: Vec2::new(f64::MIN, f64::MIN),
        };
        for v in vertices {
            bounds.min = bounds.min.min_by_component(v.pos);
            bounds.max = bounds.max.max_by_component(v.pos);
        }
        bounds
    }

    /// Extend the box in the direction of travel so that it covers the motion of the next tick.
    pub fn swept(mut self, velocity: Vec2) -> Self {
        if velocity.x > 0.0 {
            self.max.x += velocity.x;
        } else {
            self.min.x += velocity.x;
        }
        if velocity.y > 0.0 {
            self.max.y += velocity.y;
        } else {
            self.min.y += velocity.y;
        }
        self
    }

    #[inline]
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f64) -> Vec<Vertex> {
        build(
            &[
                Vec2::new(-half, -half),
                Vec2::new(half, -half),
                Vec2::new(half, half),
                Vec2::new(-half, half),
            ],
            BodyId::UNASSIGNED,
        )
    }

    #[test]
    fn square_properties() {
        let sq = square(1.0);
        assert!((area(&sq, false) - 4.0).abs() < 1e-12);
        assert!(centre(&sq).mag() < 1e-12);
        // m (w^2 + h^2) / 12
        let i = inertia(&sq, 6.0);
        assert!((i - 4.0).abs() < 1e-12, "got {i}");
    }

    #[test]
    fn parallel_edges_share_an_axis() {
        let sq = square(1.0);
        let axes = axes(&sq);
        assert_eq!(axes.len(), 2);

        let triangle = build(
            &[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)],
            BodyId::UNASSIGNED,
        );
        assert_eq!(self::axes(&triangle).len(), 3);
    }

    #[test]
    fn nearly_vertical_edges_share_an_axis() {
        // opposite edges whose normals differ only by rounding error
        let quad = build(
            &[
                Vec2::new(-1.0, -1.0),
                Vec2::new(1.0, -1.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(-1.0 + 4e-16, 1.0),
            ],
            BodyId::UNASSIGNED,
        );
        let axes = axes(&quad);
        assert_eq!(axes.len(), 2, "{axes:?}");
        assert!(axes.iter().any(|a| (a.x.abs() - 1.0).abs() < 1e-9));
        assert!(axes.iter().any(|a| (a.y.abs() - 1.0).abs() < 1e-9));

        // side normals land just below 0 and just below pi
        let tilted = build(
            &[
                Vec2::new(-1.0 - 2.4e-9, -1.0),
                Vec2::new(1.0, -1.0),
                Vec2::new(1.0 + 1e-9, 1.0),
                Vec2::new(-1.0, 1.0),
            ],
            BodyId::UNASSIGNED,
        );
        assert_eq!(self::axes(&tilted).len(), 2);

        let octagon: Vec<Vec2> = (0..8)
            .map(|i| {
                let angle = std::f64::consts::PI * (2 * i + 1) as f64 / 8.0;
                Vec2::new(angle.cos(), angle.sin()) * 7.0
            })
            .collect();
        assert_eq!(self::axes(&build(&octagon, BodyId::UNASSIGNED)).len(), 4);
    }

    #[test]
    fn clockwise_sort_and_containment() {
        let mut shuffled = build(
            &[
                Vec2::new(1.0, 1.0),
                Vec2::new(-1.0, -1.0),
                Vec2::new(-1.0, 1.0),
                Vec2::new(1.0, -1.0),
            ],
            BodyId::UNASSIGNED,
        );
        sort_clockwise(&mut shuffled);
        reindex(&mut shuffled, BodyId(3));
        itertools::assert_equal(shuffled.iter().map(|v| v.index), 0..4);
        assert!(shuffled.iter().all(|v| v.body == BodyId(3)));

        assert!(contains(&shuffled, Vec2::new(0.0, 0.0)));
        assert!(contains(&shuffled, Vec2::new(0.99, -0.99)));
        assert!(!contains(&shuffled, Vec2::new(1.5, 0.0)));
        assert!(!contains(&shuffled, Vec2::new(0.0, -1.01)));
    }

    #[test]
    fn aabb_sweeps_along_velocity() {
        let sq = square(1.0);
        let bounds = AABB::from_vertices(&sq).swept(Vec2::new(2.0, -3.0));
        assert_eq!(bounds.min, Vec2::new(-1.0, -4.0));
        assert_eq!(bounds.max, Vec2::new(3.0, 1.0));
        assert!(bounds.overlaps(&AABB {
            min: Vec2::new(2.5, -3.5),
            max: Vec2::new(5.0, 5.0)
        }));
    }

    #[test]
    fn hull_drops_interior_points() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.5),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
            Vec2::new(1.0, 1.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.contains(&Vec2::new(1.0, 1.0)));
        assert!(!hull.contains(&Vec2::new(1.0, 0.5)));
    }

    #[test]
    fn rotation_keeps_area_and_moves_axes() {
        let mut sq = square(1.0);
        let mut ax = axes(&sq);
        rotate(&mut sq, std::f64::consts::FRAC_PI_4, Vec2::zero());
        rotate_axes(&mut ax, std::f64::consts::FRAC_PI_4);
        assert!((area(&sq, false) - 4.0).abs() < 1e-9);
        let recomputed = axes(&sq);
        for axis in &ax {
            assert!(recomputed
                .iter()
                .any(|r| (r.dot(**axis)).abs() > 1.0 - 1e-9));
        }
    }
}
