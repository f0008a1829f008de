use super::{sat, Collision};
use crate::physics::{Body, BodyKey};

use thunderdome as td;

/// Broad phase collision detection by sorting bodies along the x axis
/// and sweeping over overlapping intervals.
#[derive(Debug, Default)]
pub struct Detector {
    bodies: Vec<BodyKey>,
    collisions: Vec<Collision>,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of bodies being tested.
    pub fn set_bodies(&mut self, bodies: &[BodyKey]) {
        self.bodies.clear();
        self.bodies.extend_from_slice(bodies);
    }

    #[inline]
    pub fn bodies(&self) -> &[BodyKey] {
        &self.bodies
    }

    /// Collisions found during the last call to [`detect`][Self::detect].
    #[inline]
    pub fn collisions(&self) -> &[Collision] {
        &self.collisions
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.collisions.clear();
    }

    /// Find all overlapping parts among the detector's bodies.
    pub fn detect(&mut self, arena: &td::Arena<Body>) -> &[Collision] {
        let _span = tracy_span!("detect collisions", "detect");

        self.collisions.clear();
        // bodies may have been removed since the list was set
        self.bodies.retain(|k| arena.contains(k.0));
        self.bodies.sort_by(|a, b| {
            let (a, b) = (&arena[a.0], &arena[b.0]);
            a.bounds().min.x.total_cmp(&b.bounds().min.x)
        });

        for (i, &key_a) in self.bodies.iter().enumerate() {
            let body_a = &arena[key_a.0];
            let bounds_a = body_a.bounds();
            let a_fixed = !body_a.is_moving();

            for &key_b in &self.bodies[i + 1..] {
                let body_b = &arena[key_b.0];
                let bounds_b = body_b.bounds();

                if bounds_b.min.x > bounds_a.max.x {
                    break;
                }
                if bounds_a.max.y < bounds_b.min.y || bounds_a.min.y > bounds_b.max.y {
                    continue;
                }
                if a_fixed && !body_b.is_moving() {
                    continue;
                }
                if !body_a.filter().can_collide(body_b.filter()) {
                    continue;
                }

                let compound = body_a.parts().is_compound() || body_b.parts().is_compound();
                for part_a in body_a.parts().colliding() {
                    for part_b in body_b.parts().colliding() {
                        if compound && !part_a.bounds().overlaps(&part_b.bounds()) {
                            continue;
                        }
                        if let Some(coll) = sat::collides(part_a, key_a, part_b, key_b) {
                            self.collisions.push(coll);
                        }
                    }
                }
            }
        }

        &self.collisions
    }
}

//
// tests
//
