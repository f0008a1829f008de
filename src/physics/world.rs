use super::{
    collision::{Detector, Pair, PairKey, Pairs},
    composite::{CompositeKey, Composites},
    constraint::{Constraint, ConstraintBuilder},
    entity_set::{BodyKey, ConstraintKey, EntitySet},
    sleeping, Body, BodyId, IdAllocator, PhysicsError,
};

/// Everything that exists in a simulation: bodies, constraints,
/// the composite tree organizing them and the contact pairs between them.
///
/// A world is stepped forward by an [`Engine`][super::Engine].
pub struct World {
    pub(crate) entities: EntitySet,
    pub(crate) composites: Composites,
    pub(crate) pairs: Pairs,
    pub(crate) detector: Detector,
    ids: IdAllocator,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_ids(IdAllocator::new())
    }

    /// Create a world that takes body ids, collision groups and categories from the given allocator.
    pub fn with_ids(ids: IdAllocator) -> Self {
        Self {
            entities: EntitySet::new(),
            composites: Composites::new(),
            pairs: Pairs::new(),
            detector: Detector::new(),
            ids,
        }
    }

    #[inline]
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    /// Access the id allocator to hand out collision groups and categories.
    #[inline]
    pub fn ids_mut(&mut self) -> &mut IdAllocator {
        &mut self.ids
    }

    //
    // bodies
    //

    /// Add a body to a composite, assigning ids to it and all its parts.
    pub fn add_body(
        &mut self,
        composite: CompositeKey,
        mut body: Body,
    ) -> Result<BodyKey, PhysicsError> {
        if !self.composites.contains(composite) {
            return Err(PhysicsError::UnknownComposite);
        }
        body.assign_ids(&mut self.ids);
        let id = body.id();
        let key = self.entities.insert_body(body);
        self.composites.add_body(composite, key)?;
        tracing::debug!(id = id.get(), "body added");
        Ok(key)
    }

    /// Remove a body along with its contact pairs and every constraint attached to it.
    /// Its ids are released for reuse.
    pub fn remove_body(&mut self, key: BodyKey) -> Result<Body, PhysicsError> {
        let mut body = self
            .entities
            .remove_body(key)
            .ok_or(PhysicsError::UnknownBody)?;
        let root = self.composites.root();
        self.composites.remove_body(root, key, true);

        let part_ids: Vec<BodyId> = body.part_ids().collect();
        self.pairs.remove_parts(&part_ids);

        for constraint in self.entities.remove_orphan_constraints() {
            self.composites.remove_constraint(root, constraint, true);
            tracing::debug!(?constraint, "constraint removed with its body");
        }

        tracing::debug!(id = body.id().get(), "body removed");
        body.release_ids(&mut self.ids);
        Ok(body)
    }

    #[inline]
    pub fn body(&self, key: BodyKey) -> Option<&Body> {
        self.entities.get_body(key)
    }

    #[inline]
    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.entities.get_body_mut(key)
    }

    /// Find the key of the body that has a part with the given id.
    #[inline]
    pub fn body_key(&self, id: BodyId) -> Option<BodyKey> {
        self.entities.owner_of(id)
    }

    /// Find the body that has a part with the given id.
    pub fn body_by_id(&self, id: BodyId) -> Option<&Body> {
        self.body_key(id).and_then(|key| self.body(key))
    }

    /// Iterate over every body in the world.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &Body)> {
        self.entities
            .bodies
            .iter()
            .map(|(idx, body)| (BodyKey(idx), body))
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.entities.body_count()
    }

    /// Put a body to sleep or wake it up.
    pub fn set_sleeping(&mut self, key: BodyKey, is_sleeping: bool) -> Result<(), PhysicsError> {
        let body = self.body_mut(key).ok_or(PhysicsError::UnknownBody)?;
        sleeping::set_sleeping(body, is_sleeping);
        Ok(())
    }

    //
    // constraints
    //

    /// Create a constraint and add it to a composite.
    pub fn add_constraint(
        &mut self,
        composite: CompositeKey,
        constraint: ConstraintBuilder,
    ) -> Result<ConstraintKey, PhysicsError> {
        if !self.composites.contains(composite) {
            return Err(PhysicsError::UnknownComposite);
        }
        let constraint = constraint.build(&self.entities.bodies)?;
        let key = self.entities.insert_constraint(constraint);
        self.composites.add_constraint(composite, key)?;
        tracing::debug!(?key, length = constraint.length, "constraint added");
        Ok(key)
    }

    pub fn remove_constraint(&mut self, key: ConstraintKey) -> Result<Constraint, PhysicsError> {
        let constraint = self
            .entities
            .remove_constraint(key)
            .ok_or(PhysicsError::UnknownConstraint)?;
        let root = self.composites.root();
        self.composites.remove_constraint(root, key, true);
        tracing::debug!(?key, "constraint removed");
        Ok(constraint)
    }

    #[inline]
    pub fn constraint(&self, key: ConstraintKey) -> Option<&Constraint> {
        self.entities.get_constraint(key)
    }

    #[inline]
    pub fn constraint_mut(&mut self, key: ConstraintKey) -> Option<&mut Constraint> {
        self.entities.get_constraint_mut(key)
    }

    /// Current distance between the ends of a constraint.
    pub fn constraint_length(&self, key: ConstraintKey) -> Option<f64> {
        let constraint = self.constraint(key)?;
        Some(constraint.current_length(&self.entities.bodies))
    }

    #[inline]
    pub fn constraint_count(&self) -> usize {
        self.entities.constraint_count()
    }

    //
    // composites
    //

    /// The composite everything in the world descends from.
    #[inline]
    pub fn root(&self) -> CompositeKey {
        self.composites.root()
    }

    /// The composite tree, for queries like flattened body lists.
    #[inline]
    pub fn composites(&self) -> &Composites {
        &self.composites
    }

    pub fn create_composite(&mut self, parent: CompositeKey) -> Result<CompositeKey, PhysicsError> {
        let key = self.composites.create(parent)?;
        tracing::debug!(?key, "composite created");
        Ok(key)
    }

    /// Move a composite and everything in it under another parent.
    pub fn move_composite(
        &mut self,
        composite: CompositeKey,
        new_parent: CompositeKey,
    ) -> Result<(), PhysicsError> {
        self.composites.add_composite(new_parent, composite)
    }

    /// Remove a composite along with every body, constraint and composite inside it.
    pub fn remove_composite(&mut self, key: CompositeKey) -> Result<(), PhysicsError> {
        let removed = self.composites.remove_composite(key)?;
        for constraint in removed.constraints {
            self.entities.remove_constraint(constraint);
        }
        for body in removed.bodies {
            // already detached from the tree, so this only clears up the rest
            self.remove_body(body)?;
        }
        tracing::debug!(?key, "composite removed");
        Ok(())
    }

    //
    // pairs
    //

    /// Every contact pair currently tracked.
    #[inline]
    pub fn pairs(&self) -> &Pairs {
        &self.pairs
    }

    /// The contact pair between two parts, if they are in contact
    /// (or were, and one of them is asleep).
    pub fn pair(&self, a: BodyId, b: BodyId) -> Option<&Pair> {
        self.pairs.get(PairKey::new(a, b))
    }

    /// Remove everything, leaving an empty root composite.
    pub fn clear(&mut self) {
        for (_, body) in self.entities.bodies.iter_mut() {
            body.release_ids(&mut self.ids);
        }
        self.entities.clear();
        self.composites.clear();
        self.pairs.clear();
        self.detector.clear();
        tracing::debug!("world cleared");
    }
}

//
// tests
//
