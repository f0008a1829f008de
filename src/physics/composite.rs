//! Hierarchical grouping of bodies and constraints.

use super::{BodyKey, ConstraintKey, PhysicsError};

use std::cell::OnceCell;
use thunderdome as td;

/// Key type to look up a composite in the physics world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CompositeKey(pub(super) td::Index);

impl CompositeKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// A node in the composite tree.
#[derive(Debug, Default)]
pub struct Composite {
    parent: Option<CompositeKey>,
    bodies: Vec<BodyKey>,
    constraints: Vec<ConstraintKey>,
    composites: Vec<CompositeKey>,
    is_modified: bool,
    cache: FlattenCache,
}

/// Flattened contents of a subtree, computed on first access after a modification.
#[derive(Debug, Default)]
struct FlattenCache {
    bodies: OnceCell<Vec<BodyKey>>,
    constraints: OnceCell<Vec<ConstraintKey>>,
    composites: OnceCell<Vec<CompositeKey>>,
}

impl FlattenCache {
    fn invalidate(&mut self) {
        self.bodies.take();
        self.constraints.take();
        self.composites.take();
    }
}

impl Composite {
    #[inline]
    pub fn parent(&self) -> Option<CompositeKey> {
        self.parent
    }

    /// Bodies added directly to this composite.
    #[inline]
    pub fn bodies(&self) -> &[BodyKey] {
        &self.bodies
    }

    /// Constraints added directly to this composite.
    #[inline]
    pub fn constraints(&self) -> &[ConstraintKey] {
        &self.constraints
    }

    /// Direct children of this composite.
    #[inline]
    pub fn composites(&self) -> &[CompositeKey] {
        &self.composites
    }

    /// Whether the contents of this composite have changed since the flag was last cleared.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.is_modified
    }
}

/// What was stored in a removed subtree.
#[derive(Debug, Default)]
pub struct RemovedSubtree {
    pub bodies: Vec<BodyKey>,
    pub constraints: Vec<ConstraintKey>,
}

/// The composite tree of a world, with a root that always exists.
pub struct Composites {
    nodes: td::Arena<Composite>,
    root: CompositeKey,
}

impl Default for Composites {
    fn default() -> Self {
        Self::new()
    }
}

impl Composites {
    pub fn new() -> Self {
        let mut nodes = td::Arena::new();
        let root = CompositeKey(nodes.insert(Composite::default()));
        Self { nodes, root }
    }

    /// The root composite that every other composite descends from.
    #[inline]
    pub fn root(&self) -> CompositeKey {
        self.root
    }

    #[inline]
    pub fn get(&self, key: CompositeKey) -> Option<&Composite> {
        self.nodes.get(key.0)
    }

    #[inline]
    pub fn contains(&self, key: CompositeKey) -> bool {
        self.nodes.contains(key.0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node_mut(&mut self, key: CompositeKey) -> Result<&mut Composite, PhysicsError> {
        self.nodes
            .get_mut(key.0)
            .ok_or(PhysicsError::UnknownComposite)
    }

    /// Set the modified flag of a composite, optionally propagating to its
    /// ancestors and descendants. Setting the flag drops cached flattened lists.
    pub fn set_modified(
        &mut self,
        key: CompositeKey,
        is_modified: bool,
        update_parents: bool,
        update_children: bool,
    ) {
        let Some(node) = self.nodes.get_mut(key.0) else {
            return;
        };
        node.is_modified = is_modified;
        if is_modified {
            node.cache.invalidate();
        }
        let parent = node.parent;
        let children = if update_children {
            node.composites.clone()
        } else {
            Vec::new()
        };

        if update_parents {
            if let Some(parent) = parent {
                self.set_modified(parent, is_modified, true, false);
            }
        }
        for child in children {
            self.set_modified(child, is_modified, false, true);
        }
    }

    /// Mark a composite and its ancestors as modified.
    #[inline]
    fn touch(&mut self, key: CompositeKey) {
        self.set_modified(key, true, true, false);
    }

    /// Create an empty composite as a child of `parent`.
    pub fn create(&mut self, parent: CompositeKey) -> Result<CompositeKey, PhysicsError> {
        if !self.contains(parent) {
            return Err(PhysicsError::UnknownComposite);
        }
        let key = CompositeKey(self.nodes.insert(Composite {
            parent: Some(parent),
            ..Default::default()
        }));
        self.node_mut(parent)?.composites.push(key);
        self.touch(parent);
        Ok(key)
    }

    /// Move an existing composite (with everything in it) under a new parent.
    pub fn add_composite(
        &mut self,
        parent: CompositeKey,
        child: CompositeKey,
    ) -> Result<(), PhysicsError> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(PhysicsError::UnknownComposite);
        }
        if child == self.root || self.is_ancestor_or_self(child, parent) {
            return Err(PhysicsError::CompositeCycle);
        }
        self.detach(child);
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.composites.push(child);
        self.touch(parent);
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: CompositeKey, mut key: CompositeKey) -> bool {
        loop {
            if key == ancestor {
                return true;
            }
            match self.get(key).and_then(|c| c.parent) {
                Some(parent) => key = parent,
                None => return false,
            }
        }
    }

    /// Unlink a composite from its parent's child list.
    fn detach(&mut self, key: CompositeKey) {
        let Some(parent) = self.get(key).and_then(|c| c.parent) else {
            return;
        };
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.composites.retain(|&c| c != key);
        }
        self.touch(parent);
    }

    /// Remove a composite and its whole subtree from the tree,
    /// returning the bodies and constraints that were stored in it.
    pub fn remove_composite(&mut self, key: CompositeKey) -> Result<RemovedSubtree, PhysicsError> {
        if key == self.root {
            return Err(PhysicsError::RootRemoval);
        }
        if !self.contains(key) {
            return Err(PhysicsError::UnknownComposite);
        }
        self.detach(key);

        let mut subtree = vec![key];
        subtree.extend_from_slice(self.all_composites(key));
        let mut removed = RemovedSubtree::default();
        for node_key in subtree {
            if let Some(node) = self.nodes.remove(node_key.0) {
                removed.bodies.extend(node.bodies);
                removed.constraints.extend(node.constraints);
            }
        }
        Ok(removed)
    }

    pub fn add_body(&mut self, composite: CompositeKey, body: BodyKey) -> Result<(), PhysicsError> {
        self.node_mut(composite)?.bodies.push(body);
        self.touch(composite);
        Ok(())
    }

    /// Remove a body from a composite, or with `deep` from anywhere in its subtree.
    /// Returns whether the body was found.
    pub fn remove_body(&mut self, composite: CompositeKey, body: BodyKey, deep: bool) -> bool {
        self.remove_where(composite, deep, &mut |node| remove_item(&mut node.bodies, body))
    }

    pub fn add_constraint(
        &mut self,
        composite: CompositeKey,
        constraint: ConstraintKey,
    ) -> Result<(), PhysicsError> {
        self.node_mut(composite)?.constraints.push(constraint);
        self.touch(composite);
        Ok(())
    }

    /// Remove a constraint from a composite, or with `deep` from anywhere in its subtree.
    /// Returns whether the constraint was found.
    pub fn remove_constraint(
        &mut self,
        composite: CompositeKey,
        constraint: ConstraintKey,
        deep: bool,
    ) -> bool {
        self.remove_where(composite, deep, &mut |node| {
            remove_item(&mut node.constraints, constraint)
        })
    }

    fn remove_where(
        &mut self,
        composite: CompositeKey,
        deep: bool,
        remove: &mut dyn FnMut(&mut Composite) -> bool,
    ) -> bool {
        let Some(node) = self.nodes.get_mut(composite.0) else {
            return false;
        };
        let mut found = remove(node);
        let children = if deep {
            node.composites.clone()
        } else {
            Vec::new()
        };
        if found {
            self.touch(composite);
        }
        for child in children {
            found |= self.remove_where(child, true, remove);
        }
        found
    }

    /// All bodies in a composite and its descendants.
    ///
    /// The result is cached until the subtree is next modified.
    pub fn all_bodies(&self, key: CompositeKey) -> &[BodyKey] {
        let Some(node) = self.get(key) else {
            return &[];
        };
        node.cache.bodies.get_or_init(|| {
            let mut bodies = node.bodies.clone();
            for &child in &node.composites {
                bodies.extend_from_slice(self.all_bodies(child));
            }
            bodies
        })
    }

    /// All constraints in a composite and its descendants.
    pub fn all_constraints(&self, key: CompositeKey) -> &[ConstraintKey] {
        let Some(node) = self.get(key) else {
            return &[];
        };
        node.cache.constraints.get_or_init(|| {
            let mut constraints = node.constraints.clone();
            for &child in &node.composites {
                constraints.extend_from_slice(self.all_constraints(child));
            }
            constraints
        })
    }

    /// All composites below a composite, not including itself.
    pub fn all_composites(&self, key: CompositeKey) -> &[CompositeKey] {
        let Some(node) = self.get(key) else {
            return &[];
        };
        node.cache.composites.get_or_init(|| {
            let mut composites = node.composites.clone();
            for &child in &node.composites {
                composites.extend_from_slice(self.all_composites(child));
            }
            composites
        })
    }

    /// Remove everything except an empty root.
    pub(super) fn clear(&mut self) {
        *self = Self::new();
    }
}

fn remove_item<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    match items.iter().position(|i| *i == item) {
        Some(idx) => {
            items.remove(idx);
            true
        }
        None => false,
    }
}

//
// tests
//
