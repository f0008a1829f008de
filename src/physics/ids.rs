//! Allocation of body ids, collision groups and collision categories.

/// Identifier of a body or body part.
///
/// Ids are assigned when a body is added to a [`World`][super::World]
/// and recycled when it is removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) u64);

impl BodyId {
    /// Placeholder id of bodies that haven't been added to a world yet.
    pub const UNASSIGNED: BodyId = BodyId(0);

    #[inline]
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Hands out unique ids for everything in a world.
///
/// Body ids of removed bodies go to a free list and are reused,
/// most recently freed first, so that ids stay small.
#[derive(Clone, Debug)]
pub struct IdAllocator {
    next_body: u64,
    free_bodies: Vec<BodyId>,
    next_colliding_group: i32,
    next_non_colliding_group: i32,
    last_category: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next_body: 1,
            free_bodies: Vec::new(),
            next_colliding_group: 1,
            next_non_colliding_group: -1,
            last_category: 0x0001,
        }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an unused body id.
    pub fn next_body_id(&mut self) -> BodyId {
        self.free_bodies.pop().unwrap_or_else(|| {
            let id = BodyId(self.next_body);
            self.next_body += 1;
            id
        })
    }

    /// Return a body id to be reused.
    pub fn release_body_id(&mut self, id: BodyId) {
        if id != BodyId::UNASSIGNED {
            self.free_bodies.push(id);
        }
    }

    /// The largest body id handed out so far.
    #[inline]
    pub fn max_body_id(&self) -> u64 {
        self.next_body - 1
    }

    /// Get a new collision group.
    ///
    /// Bodies sharing a positive group always collide with each other
    /// and bodies sharing a negative group never do,
    /// regardless of their categories and masks.
    pub fn next_group(&mut self, non_colliding: bool) -> i32 {
        if non_colliding {
            let group = self.next_non_colliding_group;
            self.next_non_colliding_group -= 1;
            group
        } else {
            let group = self.next_colliding_group;
            self.next_colliding_group += 1;
            group
        }
    }

    /// Get a new collision category bit, or `None` once all 32 bits are taken.
    /// The first bit is the default category of every body and never handed out.
    pub fn next_category(&mut self) -> Option<u32> {
        let next = self.last_category.checked_shl(1).filter(|&c| c != 0)?;
        self.last_category = next;
        Some(next)
    }
}

//
// tests
//
