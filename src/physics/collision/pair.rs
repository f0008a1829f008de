use super::Collision;
use crate::physics::{geometry::Vertex, Body, BodyId};

use std::collections::HashMap;
use thunderdome as td;

/// Identity of a pair of colliding parts, with the smaller id first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(BodyId, BodyId);

impl PairKey {
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b {
            PairKey(a, b)
        } else {
            PairKey(b, a)
        }
    }

    #[inline]
    pub fn ids(&self) -> [BodyId; 2] {
        [self.0, self.1]
    }

    #[inline]
    pub fn involves(&self, id: BodyId) -> bool {
        self.0 == id || self.1 == id
    }
}

/// A point of contact with the impulses accumulated on it,
/// kept from tick to tick to warm start the velocity solver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub vertex: Vertex,
    /// Accumulated impulse pushing the bodies apart along the normal.
    pub normal_impulse: f64,
    /// Accumulated friction impulse along the tangent.
    pub tangent_impulse: f64,
}

impl Contact {
    fn new(vertex: Vertex) -> Self {
        Self {
            vertex,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
        }
    }
}

/// Where a pair is in its contact episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairState {
    /// Started colliding this tick, either for the first time or after a break.
    Start,
    /// Colliding this tick and the previous one.
    Active,
    /// Stopped colliding this tick.
    End,
}

/// A persistent record of two parts being in contact.
#[derive(Clone, Debug)]
pub struct Pair {
    pub(crate) key: PairKey,
    pub(crate) collision: Collision,
    /// Contacts indexed by vertex identity so impulses survive between ticks.
    pub(crate) slots: Vec<Option<Contact>>,
    /// Slots in use this tick.
    pub(crate) active_slots: Vec<usize>,
    pub(crate) separation: f64,
    pub(crate) inv_mass: f64,
    pub(crate) friction: f64,
    pub(crate) friction_static: f64,
    pub(crate) restitution: f64,
    pub(crate) slop: f64,
    pub(crate) is_active: bool,
    pub(crate) confirmed_active: bool,
    pub(crate) is_sensor: bool,
    pub(crate) state: PairState,
    pub(crate) time_created: f64,
    pub(crate) time_updated: f64,
}

impl Pair {
    fn new(collision: Collision, body_a: &Body, body_b: &Body, timestamp: f64) -> Self {
        let mut pair = Pair {
            key: collision.key(),
            collision,
            slots: Vec::new(),
            active_slots: Vec::with_capacity(2),
            separation: 0.0,
            inv_mass: 0.0,
            friction: 0.0,
            friction_static: 0.0,
            restitution: 0.0,
            slop: 0.0,
            is_active: true,
            confirmed_active: true,
            is_sensor: false,
            state: PairState::Start,
            time_created: timestamp,
            time_updated: timestamp,
        };
        pair.update(collision, body_a, body_b, timestamp);
        pair
    }

    /// Refresh the pair with this tick's collision between its parts.
    fn update(&mut self, collision: Collision, body_a: &Body, body_b: &Body, timestamp: f64) {
        self.is_active = true;
        self.time_updated = timestamp;
        self.separation = collision.depth;
        self.is_sensor = body_a.is_sensor() || body_b.is_sensor();

        let (ma, mb) = (body_a.material(), body_b.material());
        self.inv_mass = body_a.mass().inv() + body_b.mass().inv();
        self.friction = ma.friction.min(mb.friction);
        self.friction_static = ma.friction_static.max(mb.friction_static);
        self.restitution = ma.restitution.max(mb.restitution);
        self.slop = ma.slop.max(mb.slop);

        let [count_a, count_b] = collision.vertex_counts;
        let slot_count = 2 * count_a.max(count_b);
        if self.slots.len() < slot_count {
            self.slots.resize(slot_count, None);
        }

        self.active_slots.clear();
        for vertex in collision.supports.iter() {
            let slot = if vertex.body == collision.parts[0] {
                vertex.index
            } else {
                count_a + vertex.index
            };
            match &mut self.slots[slot] {
                Some(contact) => contact.vertex = *vertex,
                empty => *empty = Some(Contact::new(*vertex)),
            }
            if !self.active_slots.contains(&slot) {
                self.active_slots.push(slot);
            }
        }

        self.collision = collision;
    }

    fn deactivate(&mut self) {
        self.is_active = false;
        self.active_slots.clear();
    }

    #[inline]
    pub fn key(&self) -> PairKey {
        self.key
    }

    /// The latest collision between the pair's parts.
    #[inline]
    pub fn collision(&self) -> &Collision {
        &self.collision
    }

    /// Contacts touching this tick.
    pub fn active_contacts(&self) -> impl Iterator<Item = &Contact> {
        self.active_slots
            .iter()
            .filter_map(|&slot| self.slots[slot].as_ref())
    }

    /// Penetration along the normal, accounting for position corrections made this tick.
    #[inline]
    pub fn separation(&self) -> f64 {
        self.separation
    }

    #[inline]
    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    #[inline]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    #[inline]
    pub fn friction_static(&self) -> f64 {
        self.friction_static
    }

    #[inline]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    #[inline]
    pub fn slop(&self) -> f64 {
        self.slop
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Sensor pairs are tracked but never pushed apart.
    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    #[inline]
    pub fn state(&self) -> PairState {
        self.state
    }

    #[inline]
    pub fn time_created(&self) -> f64 {
        self.time_created
    }

    #[inline]
    pub fn time_updated(&self) -> f64 {
        self.time_updated
    }
}

/// All contact pairs in a world.
#[derive(Debug, Default)]
pub struct Pairs {
    pub(crate) list: Vec<Pair>,
    table: HashMap<PairKey, usize>,
    collision_start: Vec<PairKey>,
    collision_active: Vec<PairKey>,
    collision_end: Vec<PairKey>,
}

impl Pairs {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: PairKey) -> Option<&Pair> {
        self.table.get(&key).map(|&i| &self.list[i])
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, key: PairKey) -> Option<&mut Pair> {
        self.table.get(&key).map(|&i| &mut self.list[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pair> {
        self.list.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Pairs that started colliding during the last update.
    #[inline]
    pub fn collision_start(&self) -> &[PairKey] {
        &self.collision_start
    }

    /// Pairs that were already colliding and still are.
    #[inline]
    pub fn collision_active(&self) -> &[PairKey] {
        &self.collision_active
    }

    /// Pairs that stopped colliding during the last update.
    /// These may have been removed already.
    #[inline]
    pub fn collision_end(&self) -> &[PairKey] {
        &self.collision_end
    }

    /// Feed in the collisions of a tick, creating, refreshing and retiring pairs.
    ///
    /// Pairs that weren't in contact are removed unless one of their bodies is asleep,
    /// in which case they are kept inactive with their impulses intact.
    pub fn update(&mut self, collisions: &[Collision], bodies: &td::Arena<Body>, timestamp: f64) {
        let _span = tracy_span!("update pairs", "update");

        self.collision_start.clear();
        self.collision_active.clear();
        self.collision_end.clear();

        for pair in &mut self.list {
            pair.confirmed_active = false;
        }

        for collision in collisions {
            let [key_a, key_b] = collision.bodies;
            let (Some(body_a), Some(body_b)) = (bodies.get(key_a.0), bodies.get(key_b.0)) else {
                continue;
            };
            let key = collision.key();

            match self.table.get(&key) {
                Some(&idx) => {
                    let pair = &mut self.list[idx];
                    if pair.is_active {
                        pair.state = PairState::Active;
                        self.collision_active.push(key);
                    } else {
                        pair.state = PairState::Start;
                        self.collision_start.push(key);
                    }
                    pair.update(*collision, body_a, body_b, timestamp);
                    pair.confirmed_active = true;
                }
                None => {
                    self.table.insert(key, self.list.len());
                    self.list
                        .push(Pair::new(*collision, body_a, body_b, timestamp));
                    self.collision_start.push(key);
                    tracing::trace!(?key, "contact pair created");
                }
            }
        }

        let count_before = self.list.len();
        let ended = &mut self.collision_end;
        self.list.retain_mut(|pair| {
            if pair.confirmed_active {
                return true;
            }
            if pair.is_active {
                pair.state = PairState::End;
                ended.push(pair.key);
            }
            pair.deactivate();

            let [a, b] = pair.collision.bodies;
            let asleep = |key: crate::physics::BodyKey| {
                bodies.get(key.0).map_or(false, |body| body.is_sleeping())
            };
            let exists = bodies.contains(a.0) && bodies.contains(b.0);
            exists && (asleep(a) || asleep(b))
        });

        if self.list.len() != count_before {
            tracing::trace!(removed = count_before - self.list.len(), "contact pairs removed");
            self.rebuild_table();
        }
    }

    fn rebuild_table(&mut self) {
        self.table.clear();
        self.table
            .extend(self.list.iter().enumerate().map(|(i, p)| (p.key, i)));
    }

    /// Remove every pair involving any of the given parts.
    pub(crate) fn remove_parts(&mut self, parts: &[BodyId]) {
        let count_before = self.list.len();
        self.list
            .retain(|p| !parts.iter().any(|&id| p.key.involves(id)));
        if self.list.len() != count_before {
            self.rebuild_table();
        }
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.table.clear();
        self.collision_start.clear();
        self.collision_active.clear();
        self.collision_end.clear();
    }
}

//
// tests
//
