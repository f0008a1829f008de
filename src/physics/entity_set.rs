use super::{Body, BodyId, Constraint};

use std::collections::HashMap;
use thunderdome as td;

/// Key type to look up a body stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey(pub(super) td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    /// Useful for creating your own mappings from bodies to other things.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Key type to look up a constraint stored in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintKey(pub(super) td::Index);

impl ConstraintKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Storage of the bodies and constraints of a world.
///
/// Bodies are also indexed by the ids of all their parts,
/// which is how collision results find their way back to the owning body.
#[derive(Default)]
pub struct EntitySet {
    // there are invariants between these that can be violated by inserting directly,
    // but the solver only reads and mutates bodies in place
    pub(super) bodies: td::Arena<Body>,
    pub(super) constraints: td::Arena<Constraint>,
    pub(super) part_owners: HashMap<BodyId, BodyKey>,
}

impl EntitySet {
    #[inline]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Access a body, if it still exists.
    #[inline]
    pub fn get_body(&self, body: BodyKey) -> Option<&Body> {
        self.bodies.get(body.0)
    }

    /// Mutably access a body, if it still exists.
    #[inline]
    pub fn get_body_mut(&mut self, body: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(body.0)
    }

    /// Find the body that owns the part with the given id.
    #[inline]
    pub fn owner_of(&self, part: BodyId) -> Option<BodyKey> {
        self.part_owners.get(&part).copied()
    }

    #[inline]
    pub fn get_constraint(&self, constraint: ConstraintKey) -> Option<&Constraint> {
        self.constraints.get(constraint.0)
    }

    #[inline]
    pub fn get_constraint_mut(&mut self, constraint: ConstraintKey) -> Option<&mut Constraint> {
        self.constraints.get_mut(constraint.0)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Insert a body whose parts have already been given ids.
    pub(crate) fn insert_body(&mut self, body: Body) -> BodyKey {
        let part_ids: Vec<BodyId> = body.part_ids().collect();
        let key = BodyKey(self.bodies.insert(body));
        for id in part_ids {
            self.part_owners.insert(id, key);
        }
        key
    }

    pub(crate) fn insert_constraint(&mut self, constraint: Constraint) -> ConstraintKey {
        ConstraintKey(self.constraints.insert(constraint))
    }

    /// Remove a body, returning it if it still existed.
    ///
    /// Constraints attached to the body are not removed here,
    /// see [`remove_orphan_constraints`][Self::remove_orphan_constraints].
    pub(crate) fn remove_body(&mut self, body: BodyKey) -> Option<Body> {
        let removed = self.bodies.remove(body.0)?;
        for id in removed.part_ids() {
            self.part_owners.remove(&id);
        }
        Some(removed)
    }

    #[inline]
    pub(crate) fn remove_constraint(&mut self, constraint: ConstraintKey) -> Option<Constraint> {
        self.constraints.remove(constraint.0)
    }

    /// Remove constraints that have had one of their bodies removed,
    /// returning the keys of the removed constraints.
    pub(super) fn remove_orphan_constraints(&mut self) -> Vec<ConstraintKey> {
        let mut removed = Vec::new();
        self.constraints.retain(|k, c| {
            let alive = c
                .bodies()
                .iter()
                .flatten()
                .all(|b| self.bodies.contains(b.0));
            if !alive {
                removed.push(ConstraintKey(k));
            }
            alive
        });
        removed
    }

    pub(super) fn clear(&mut self) {
        self.bodies.clear();
        self.constraints.clear();
        self.part_owners.clear();
    }
}

//
// tests
//
