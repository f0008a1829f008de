//! Collision detection and persistent contact pairs.

mod detector;
pub use detector::Detector;

pub mod sat;

mod pair;
pub use pair::{Contact, Pair, PairKey, PairState, Pairs};

use super::{geometry::Vertex, BodyId, BodyKey};
use crate::math::{Unit, Vec2};

/// 1-2 points of contact are found for every pair of overlapping polygons.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Supports {
    One(Vertex),
    Two(Vertex, Vertex),
}

impl Supports {
    pub fn iter(&self) -> SupportIterator<'_> {
        SupportIterator { s: self, idx: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Supports::One(_) => 1,
            Supports::Two(_, _) => 2,
        }
    }

    /// Always false, a collision has at least one support.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// An iterator over the vertices in a [`Supports`].
pub struct SupportIterator<'a> {
    s: &'a Supports,
    idx: u8,
}
impl<'a> Iterator for SupportIterator<'a> {
    type Item = &'a Vertex;

    fn next(&mut self) -> Option<Self::Item> {
        self.idx += 1;
        use Supports::*;
        match (self.s, self.idx - 1) {
            (One(v), 0) => Some(v),
            (One(_), _) => None,
            (Two(v1, _), 0) => Some(v1),
            (Two(_, v2), 1) => Some(v2),
            (Two(_, _), _) => None,
        }
    }
}

/// An overlap between two body parts found by the narrow phase.
///
/// Part A is always the one with the smaller id.
#[derive(Clone, Copy, Debug)]
pub struct Collision {
    /// Ids of the colliding parts.
    pub parts: [BodyId; 2],
    /// Bodies owning the parts.
    pub bodies: [BodyKey; 2],
    /// Penetration depth along the normal.
    pub depth: f64,
    /// The normal, facing away from part A.
    pub normal: Unit<Vec2>,
    pub tangent: Unit<Vec2>,
    /// `normal * depth`.
    pub penetration: Vec2,
    /// Points of contact, vertices of either part inside the other.
    pub supports: Supports,
    /// Vertex counts of the two parts, used to assign contact slots.
    pub vertex_counts: [usize; 2],
}

impl Collision {
    /// Key of the pair this collision belongs to.
    #[inline]
    pub fn key(&self) -> PairKey {
        PairKey::new(self.parts[0], self.parts[1])
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn support_iteration() {
        let v = |index| Vertex {
            index,
            ..Default::default()
        };
        itertools::assert_equal(Supports::One(v(3)).iter().map(|v| v.index), [3]);
        itertools::assert_equal(Supports::Two(v(1), v(2)).iter().map(|v| v.index), [1, 2]);
        assert_eq!(Supports::Two(v(1), v(2)).len(), 2);
    }
}
