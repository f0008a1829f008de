//! Separating axis test between convex polygons.

use super::{Collision, Supports};
use crate::math::{self as m, Unit, Vec2};
use crate::physics::{
    body::Part,
    geometry::{self, Vertex},
    BodyKey,
};

/// The axis of least overlap found on one polygon's axes.
#[derive(Clone, Copy, Debug)]
pub struct AxisOverlap {
    pub axis: Unit<Vec2>,
    pub overlap: f64,
}

/// Project both polygons onto each axis and find the one where they overlap the least.
///
/// Stops early once a separating axis (overlap `<= 0`) is found.
pub fn overlap_axes(
    vertices_a: &[Vertex],
    vertices_b: &[Vertex],
    axes: &[Unit<Vec2>],
) -> AxisOverlap {
    let mut least = AxisOverlap {
        axis: Unit::unit_x(),
        overlap: f64::MAX,
    };
    for &axis in axes {
        let (min_a, max_a) = geometry::project(vertices_a, axis);
        let (min_b, max_b) = geometry::project(vertices_b, axis);
        let overlap = (max_a - min_b).min(max_b - min_a);

        if overlap < least.overlap {
            least = AxisOverlap { axis, overlap };
            if overlap <= 0.0 {
                break;
            }
        }
    }
    least
}

/// The vertex furthest along `direction` as seen from `origin`,
/// and whichever of its neighbours forms the edge more perpendicular to the direction.
fn find_supports(origin: Vec2, vertices: &[Vertex], direction: Vec2) -> [Vertex; 2] {
    let n = vertices.len();
    let dist = |v: &Vertex| direction.dot(origin - v.pos);

    let mut nearest = 0;
    let mut nearest_dist = f64::MAX;
    for (i, v) in vertices.iter().enumerate() {
        let d = dist(v);
        if d < nearest_dist {
            nearest_dist = d;
            nearest = i;
        }
    }

    let prev = &vertices[(nearest + n - 1) % n];
    let next = &vertices[(nearest + 1) % n];
    if dist(next) < dist(prev) {
        [vertices[nearest], *next]
    } else {
        [vertices[nearest], *prev]
    }
}

/// Test two parts for overlap.
///
/// The result is ordered so that the part with the smaller id comes first,
/// and the normal points from that part towards the other.
pub fn collides(
    part_a: &Part,
    body_a: BodyKey,
    part_b: &Part,
    body_b: BodyKey,
) -> Option<Collision> {
    let ab = overlap_axes(part_a.vertices(), part_b.vertices(), part_a.axes());
    if ab.overlap <= 0.0 {
        return None;
    }
    let ba = overlap_axes(part_b.vertices(), part_a.vertices(), part_b.axes());
    if ba.overlap <= 0.0 {
        return None;
    }

    let ((part_a, body_a), (part_b, body_b)) = if part_a.id() <= part_b.id() {
        ((part_a, body_a), (part_b, body_b))
    } else {
        ((part_b, body_b), (part_a, body_a))
    };

    let least = if ab.overlap < ba.overlap { ab } else { ba };
    let normal = if least.axis.dot(part_b.position() - part_a.position()) < 0.0 {
        -least.axis
    } else {
        least.axis
    };
    let depth = least.overlap;

    let mut found: [Option<Vertex>; 2] = [None; 2];
    let mut count = 0;

    // vertices of B inside A
    let supports_b = find_supports(part_a.position(), part_b.vertices(), -*normal);
    for v in supports_b {
        if geometry::contains(part_a.vertices(), v.pos) {
            found[count] = Some(v);
            count += 1;
        }
    }

    // vertices of A inside B
    let mut fallback = supports_b[0];
    if count < 2 {
        let supports_a = find_supports(part_b.position(), part_a.vertices(), *normal);
        fallback = supports_a[0];
        for v in supports_a {
            if count < 2 && geometry::contains(part_b.vertices(), v.pos) {
                found[count] = Some(v);
                count += 1;
            }
        }
    }

    let supports = match found {
        [Some(v1), Some(v2)] => Supports::Two(v1, v2),
        [Some(v), None] => Supports::One(v),
        // overlapping without any contained vertex
        _ => Supports::One(fallback),
    };

    Some(Collision {
        parts: [part_a.id(), part_b.id()],
        bodies: [body_a, body_b],
        depth,
        normal,
        tangent: m::unit_left_normal(normal),
        penetration: *normal * depth,
        supports,
        vertex_counts: [part_a.vertices().len(), part_b.vertices().len()],
    })
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{Body, IdAllocator};
    use rand::Rng;
    use thunderdome as td;

    fn keyed(bodies: Vec<Body>) -> (Vec<Body>, Vec<BodyKey>) {
        let mut ids = IdAllocator::new();
        let mut arena = td::Arena::new();
        let bodies: Vec<Body> = bodies
            .into_iter()
            .map(|mut b| {
                b.assign_ids(&mut ids);
                b
            })
            .collect();
        let keys = bodies.iter().map(|_| BodyKey(arena.insert(()))).collect();
        (bodies, keys)
    }

    fn test_pair(a: &Body, ka: BodyKey, b: &Body, kb: BodyKey) -> Option<Collision> {
        collides(a.parts().self_part(), ka, b.parts().self_part(), kb)
    }

    #[test]
    fn overlapping_squares() {
        let (bodies, keys) = keyed(vec![
            Body::rectangle(Vec2::new(0.0, 0.0), 20.0, 20.0),
            Body::rectangle(Vec2::new(15.0, 0.0), 20.0, 20.0),
        ]);
        let coll = test_pair(&bodies[0], keys[0], &bodies[1], keys[1])
            .expect("squares overlap");
        assert!((coll.depth - 5.0).abs() < 1e-9);
        assert!((*coll.normal - Vec2::new(1.0, 0.0)).mag() < 1e-9);
        assert!((coll.penetration - Vec2::new(5.0, 0.0)).mag() < 1e-9);
        assert!(coll.tangent.dot(*coll.normal).abs() < 1e-12);
        assert_eq!(coll.parts, [bodies[0].id(), bodies[1].id()]);

        // swapping the arguments gives the same canonical result
        let swapped = test_pair(&bodies[1], keys[1], &bodies[0], keys[0]).unwrap();
        assert_eq!(swapped.parts, coll.parts);
        assert_eq!(swapped.bodies, coll.bodies);
        assert!((*swapped.normal - *coll.normal).mag() < 1e-12);
    }

    #[test]
    fn separated_squares() {
        let (bodies, keys) = keyed(vec![
            Body::rectangle(Vec2::new(0.0, 0.0), 20.0, 20.0),
            Body::rectangle(Vec2::new(25.0, 3.0), 20.0, 20.0),
        ]);
        assert!(test_pair(&bodies[0], keys[0], &bodies[1], keys[1]).is_none());
    }

    #[test]
    fn supports_lie_inside_the_other_polygon() {
        let (bodies, keys) = keyed(vec![
            Body::rectangle(Vec2::new(0.0, 0.0), 100.0, 20.0),
            Body::rectangle(Vec2::new(5.0, -14.0), 20.0, 10.0),
        ]);
        let coll = test_pair(&bodies[0], keys[0], &bodies[1], keys[1]).unwrap();
        // the small box rests on top of the wide one, the normal points up towards it
        assert!((*coll.normal - Vec2::new(0.0, -1.0)).mag() < 1e-9);
        assert!((coll.depth - 1.0).abs() < 1e-9);
        assert_eq!(coll.supports.len(), 2);
        for v in coll.supports.iter() {
            assert_eq!(v.body, bodies[1].id());
            assert!(geometry::contains(bodies[0].vertices(), v.pos));
        }
    }

    #[test]
    fn random_overlaps_always_have_supports() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let (bodies, keys) = keyed(vec![
                Body::rectangle(Vec2::zero(), 30.0, 10.0).with_angle(rng.gen_range(0.0..360.0f64)),
                Body::circle(
                    Vec2::new(rng.gen_range(-15.0..15.0), rng.gen_range(-15.0..15.0)),
                    rng.gen_range(2.0..12.0),
                ),
            ]);
            let Some(coll) = test_pair(&bodies[0], keys[0], &bodies[1], keys[1]) else {
                continue;
            };
            assert!(coll.depth > 0.0);
            assert!((coll.normal.mag() - 1.0).abs() < 1e-9);
            assert!(!coll.supports.is_empty());
            // the normal points from the first part towards the second
            let centres = bodies[1].position() - bodies[0].position();
            assert!(coll.normal.dot(centres) >= 0.0);
        }
    }
}
