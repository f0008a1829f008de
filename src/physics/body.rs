use super::{
    geometry::{self, Vertex, AABB},
    shape::{Circle, Polygon, Shape},
    BodyId, IdAllocator, Velocity,
};
use crate::math::{self as m, Angle, Unit, Vec2};

/// Polygon moments of inertia are multiplied by this
/// to make bodies resist rotation more, which keeps stacks steadier.
pub const INERTIA_SCALE: f64 = 4.0;

/// Mass or moment of inertia of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because calculating inverse mass
/// is expensive and needed a lot in physics calculations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    #[inline]
    fn from(mass: f64) -> Self {
        Mass::Finite {
            mass,
            inverse: 1.0 / mass,
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }

    /// Get the mass itself, which is `f64::INFINITY` if the mass is infinite.
    #[inline]
    pub fn get(&self) -> f64 {
        match self {
            Mass::Finite { mass, .. } => *mass,
            Mass::Infinite => f64::INFINITY,
        }
    }
}

/// Surface and bulk properties of a body.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct Material {
    /// Mass per unit of area.
    pub density: f64,
    /// Coefficient of kinetic friction.
    pub friction: f64,
    /// Fraction of velocity lost to air resistance every tick.
    pub friction_air: f64,
    /// Coefficient of static friction.
    pub friction_static: f64,
    /// Bounciness, between 0 and 1.
    pub restitution: f64,
    /// Penetration depth that is allowed without correction.
    pub slop: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 0.001,
            friction: 0.001,
            friction_air: 0.001,
            friction_static: 0.05,
            restitution: 0.0,
            slop: 0.05,
        }
    }
}

/// Rules deciding which bodies can collide with each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct CollisionFilter {
    /// Bit of the category this body belongs to.
    pub category: u32,
    /// Categories this body collides with.
    pub mask: u32,
    /// Nonzero groups override the category test:
    /// bodies in the same positive group always collide,
    /// bodies in the same negative group never do.
    pub group: i32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 0x0001,
            mask: 0xFFFF_FFFF,
            group: 0,
        }
    }
}

impl CollisionFilter {
    pub fn can_collide(&self, other: &CollisionFilter) -> bool {
        if self.group == other.group && self.group != 0 {
            return self.group > 0;
        }
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

//
// Parts
//

/// A single convex piece of a body.
#[derive(Clone, Debug)]
pub struct Part {
    pub(crate) id: BodyId,
    pub(crate) shape: Shape,
    pub(crate) position: Vec2,
    pub(crate) bounds: AABB,
    pub(crate) area: f64,
    pub(crate) mass: f64,
    pub(crate) inertia: f64,
}

impl Part {
    /// Create a part from a shape, computing its mass properties from the density.
    fn new(shape: Shape, density: f64) -> Self {
        let area = geometry::area(shape.vertices(), false);
        let position = geometry::centre(shape.vertices());
        let mass = density * area;
        let mut part = Part {
            id: BodyId::UNASSIGNED,
            bounds: shape.bounds(position),
            shape,
            position,
            area,
            mass,
            inertia: 0.0,
        };
        part.inertia = part.centred_inertia();
        part
    }

    /// Moment of inertia about the part's own centre.
    fn centred_inertia(&self) -> f64 {
        let mut centred = self.shape.vertices().to_vec();
        geometry::translate(&mut centred, -self.position);
        INERTIA_SCALE * geometry::inertia(&centred, self.mass)
    }

    #[inline]
    pub fn id(&self) -> BodyId {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        self.shape.vertices()
    }

    #[inline]
    pub fn axes(&self) -> &[Unit<Vec2>] {
        self.shape.axes()
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    #[inline]
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    fn set_id(&mut self, id: BodyId) {
        self.id = id;
        self.shape.set_owner(id);
    }

    #[inline]
    pub(crate) fn update_bounds(&mut self, velocity: Vec2) {
        self.bounds = self.shape.bounds(self.position).swept(velocity);
    }
}

/// The convex parts a body consists of.
///
/// A compound body has a hull part of its own, which is used for broad phase
/// bounds, and a list of sub-parts that are the ones actually tested for collision.
#[derive(Clone, Debug)]
pub enum Parts {
    Single(Part),
    Compound {
        self_part: Part,
        other_parts: Vec<Part>,
    },
}

impl Parts {
    /// The part representing the body as a whole.
    #[inline]
    pub fn self_part(&self) -> &Part {
        match self {
            Parts::Single(part) => part,
            Parts::Compound { self_part, .. } => self_part,
        }
    }

    #[inline]
    pub(crate) fn self_part_mut(&mut self) -> &mut Part {
        match self {
            Parts::Single(part) => part,
            Parts::Compound { self_part, .. } => self_part,
        }
    }

    /// Parts that take part in collision detection.
    #[inline]
    pub fn colliding(&self) -> &[Part] {
        match self {
            Parts::Single(part) => std::slice::from_ref(part),
            Parts::Compound { other_parts, .. } => other_parts,
        }
    }

    fn split(&self) -> (&Part, &[Part]) {
        match self {
            Parts::Single(part) => (part, &[]),
            Parts::Compound {
                self_part,
                other_parts,
            } => (self_part, other_parts),
        }
    }

    fn split_mut(&mut self) -> (&mut Part, &mut [Part]) {
        match self {
            Parts::Single(part) => (part, &mut []),
            Parts::Compound {
                self_part,
                other_parts,
            } => (self_part, other_parts),
        }
    }

    /// Every part, starting with the self part.
    pub fn iter(&self) -> impl Iterator<Item = &Part> {
        let (first, rest) = self.split();
        std::iter::once(first).chain(rest)
    }

    /// Every part, starting with the self part.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Part> {
        let (first, rest) = self.split_mut();
        std::iter::once(first).chain(rest)
    }

    /// Number of parts including the self part.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Parts::Single(_) => 1,
            Parts::Compound { other_parts, .. } => 1 + other_parts.len(),
        }
    }

    #[inline]
    pub fn is_compound(&self) -> bool {
        matches!(self, Parts::Compound { .. })
    }

    /// Move all parts along with the body's geometry.
    /// The self part's position is the body position, which callers may have already moved.
    fn translate(&mut self, offset: Vec2, move_self: bool) {
        for (i, part) in self.iter_mut().enumerate() {
            part.shape.translate(offset);
            if i > 0 || move_self {
                part.position += offset;
            }
        }
    }

    /// Rotate all parts about a point, which is the body position.
    fn rotate(&mut self, angle: f64, point: Vec2) {
        if angle == 0.0 {
            return;
        }
        for (i, part) in self.iter_mut().enumerate() {
            part.shape.rotate(angle, point);
            if i > 0 {
                part.position = m::rotate_about(part.position, point, angle);
            }
        }
    }

    fn update_bounds(&mut self, velocity: Vec2) {
        for part in self.iter_mut() {
            part.update_bounds(velocity);
        }
    }
}

/// Values replaced while a body is static.
#[derive(Clone, Copy, Debug)]
struct DynamicProperties {
    restitution: f64,
    friction: f64,
    density: f64,
    mass: Mass,
    inertia: Mass,
}

//
// Body
//

/// A rigid body made of one or more convex parts.
///
/// Bodies are integrated with position Verlet: velocity is implied by the difference
/// between the current and previous pose, so every setter keeps the previous pose in step.
#[derive(Clone, Debug)]
pub struct Body {
    pub(crate) parts: Parts,
    pub(crate) position_prev: Vec2,
    pub(crate) angle: f64,
    pub(crate) angle_prev: f64,
    pub(crate) velocity: Velocity,
    pub(crate) speed: f64,
    pub(crate) angular_speed: f64,
    pub(crate) force: Vec2,
    pub(crate) torque: f64,
    // solver scratch
    pub(crate) position_impulse: Vec2,
    pub(crate) constraint_impulse: Vec2,
    pub(crate) constraint_impulse_angle: f64,
    pub(crate) total_contacts: usize,
    pub(crate) material: Material,
    pub(crate) area: f64,
    pub(crate) mass: Mass,
    pub(crate) inertia: Mass,
    pub(crate) filter: CollisionFilter,
    pub(crate) is_static: bool,
    pub(crate) is_sensor: bool,
    pub(crate) is_sleeping: bool,
    pub(crate) motion: f64,
    pub(crate) sleep_counter: u32,
    pub(crate) sleep_threshold: u32,
    pub(crate) time_scale: f64,
    dynamic: Option<DynamicProperties>,
}

impl Body {
    fn from_part(part: Part) -> Self {
        let position = part.position;
        let area = part.area;
        let mass = Mass::from(part.mass);
        let inertia = Mass::from(part.inertia);
        Body {
            parts: Parts::Single(part),
            position_prev: position,
            angle: 0.0,
            angle_prev: 0.0,
            velocity: Velocity::default(),
            speed: 0.0,
            angular_speed: 0.0,
            force: Vec2::zero(),
            torque: 0.0,
            position_impulse: Vec2::zero(),
            constraint_impulse: Vec2::zero(),
            constraint_impulse_angle: 0.0,
            total_contacts: 0,
            material: Material::default(),
            area,
            mass,
            inertia,
            filter: CollisionFilter::default(),
            is_static: false,
            is_sensor: false,
            is_sleeping: false,
            motion: 0.0,
            sleep_counter: 0,
            sleep_threshold: 60,
            time_scale: 1.0,
            dynamic: None,
        }
    }

    /// Create a body from the points of a convex polygon.
    /// The polygon is moved so that its centroid is at `position`.
    pub fn polygon(position: Vec2, points: &[Vec2]) -> Self {
        let mut body = Self::from_part(Part::new(
            Shape::Polygon(Polygon::new(points, BodyId::UNASSIGNED)),
            Material::default().density,
        ));
        body.set_position(position);
        body
    }

    /// Create an axis-aligned rectangle centred at `position`.
    pub fn rectangle(position: Vec2, width: f64, height: f64) -> Self {
        Self::polygon(
            position,
            &[
                Vec2::new(0.0, 0.0),
                Vec2::new(width, 0.0),
                Vec2::new(width, height),
                Vec2::new(0.0, height),
            ],
        )
    }

    /// Create a circle centred at `position`.
    pub fn circle(position: Vec2, radius: f64) -> Self {
        Self::from_part(Part::new(
            Shape::Circle(Circle::new(position, radius, BodyId::UNASSIGNED)),
            Material::default().density,
        ))
    }

    /// Combine bodies into one compound body.
    ///
    /// The compound takes the combined mass, area and moment of inertia of the parts
    /// and is positioned at their centre of mass.
    /// Only the geometry and mass properties of the given bodies are kept.
    /// If any of them is compound, its sub-parts are used.
    pub fn compound(bodies: impl IntoIterator<Item = Body>) -> Self {
        let mut bodies: Vec<Body> = bodies.into_iter().collect();
        debug_assert!(!bodies.is_empty(), "a compound body needs at least one part");
        if bodies.len() == 1 {
            if let Some(body) = bodies.pop() {
                return body;
            }
        }

        // static bodies count as unit mass when locating the centre
        let mut parts: Vec<Part> = Vec::new();
        let mut weights: Vec<f64> = Vec::new();
        for body in bodies {
            let sub_parts = match body.parts {
                Parts::Single(part) => vec![part],
                Parts::Compound { other_parts, .. } => other_parts,
            };
            for part in sub_parts {
                weights.push(if body.is_static { 1.0 } else { part.mass });
                parts.push(part);
            }
        }

        let hull_points: Vec<Vec2> = parts
            .iter()
            .flat_map(|p| p.vertices().iter().map(|v| v.pos))
            .collect();
        let hull = Polygon::new(&geometry::convex_hull(&hull_points), BodyId::UNASSIGNED);
        let mut self_part = Part::new(Shape::Polygon(hull), Material::default().density);

        let total_mass: f64 = weights.iter().sum();
        let total_area: f64 = parts.iter().map(|p| p.area).sum();
        let total_inertia: f64 = parts.iter().map(|p| p.inertia).sum();
        let centre = parts
            .iter()
            .zip(&weights)
            .fold(Vec2::zero(), |acc, (p, w)| acc + p.position * *w)
            / total_mass;

        self_part.position = centre;
        self_part.area = total_area;
        self_part.mass = total_mass;
        self_part.inertia = total_inertia;

        let mut body = Self::from_part(self_part);
        if let Parts::Single(self_part) = body.parts {
            body.parts = Parts::Compound {
                self_part,
                other_parts: parts,
            };
        }
        body.material.density = total_mass / total_area;
        body
    }

    //
    // builder-style setters
    //

    /// Set the velocity of the body in a builder-like chain.
    pub fn with_velocity(mut self, vel: Velocity) -> Self {
        self.set_velocity(vel.linear);
        self.set_angular_velocity(vel.angular);
        self
    }

    /// Set the rotation of the body in a builder-like chain.
    pub fn with_angle(mut self, angle: impl Into<Angle>) -> Self {
        self.set_angle(angle.into().rad());
        self
    }

    /// Set the material of the body in a builder-like chain.
    /// Mass is recomputed from the material's density.
    pub fn with_material(mut self, material: Material) -> Self {
        self.set_material(material);
        self
    }

    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.set_static(is_static);
        self
    }

    /// Sensors detect collisions but are never pushed apart from other bodies.
    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.set_mass(mass);
        self
    }

    //
    // accessors
    //

    /// Id of the body, assigned when it's added to a world.
    #[inline]
    pub fn id(&self) -> BodyId {
        self.parts.self_part().id
    }

    #[inline]
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.parts.self_part().position
    }

    #[inline]
    pub fn position_prev(&self) -> Vec2 {
        self.position_prev
    }

    #[inline]
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Velocity computed during the last integration step.
    #[inline]
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    /// Velocity implied by the current and previous pose,
    /// including corrections applied after the last integration step.
    #[inline]
    pub fn current_velocity(&self) -> Velocity {
        Velocity {
            linear: self.position() - self.position_prev,
            angular: self.angle - self.angle_prev,
        }
    }

    #[inline]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    #[inline]
    pub fn angular_speed(&self) -> f64 {
        self.angular_speed
    }

    #[inline]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// Vertices of the body's hull (or its only part).
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        self.parts.self_part().vertices()
    }

    #[inline]
    pub fn bounds(&self) -> AABB {
        self.parts.self_part().bounds
    }

    #[inline]
    pub fn material(&self) -> &Material {
        &self.material
    }

    #[inline]
    pub fn filter(&self) -> &CollisionFilter {
        &self.filter
    }

    #[inline]
    pub fn filter_mut(&mut self) -> &mut CollisionFilter {
        &mut self.filter
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.area
    }

    #[inline]
    pub fn mass(&self) -> Mass {
        self.mass
    }

    #[inline]
    pub fn inertia(&self) -> Mass {
        self.inertia
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.is_sleeping
    }

    /// Whether the body is currently moved by the simulation.
    #[inline]
    pub fn is_moving(&self) -> bool {
        !(self.is_static || self.is_sleeping)
    }

    #[inline]
    pub fn motion(&self) -> f64 {
        self.motion
    }

    #[inline]
    pub fn sleep_threshold(&self) -> u32 {
        self.sleep_threshold
    }

    /// Set how many ticks of low motion it takes for the body to fall asleep.
    /// Zero keeps the body always awake.
    #[inline]
    pub fn set_sleep_threshold(&mut self, ticks: u32) {
        self.sleep_threshold = ticks;
    }

    #[inline]
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Speed up or slow down time for this body only.
    #[inline]
    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = time_scale;
    }

    #[inline]
    pub fn set_sensor(&mut self, is_sensor: bool) {
        self.is_sensor = is_sensor;
    }

    //
    // ids
    //

    /// Give every part a fresh id.
    pub(crate) fn assign_ids(&mut self, ids: &mut IdAllocator) {
        for part in self.parts.iter_mut() {
            part.set_id(ids.next_body_id());
        }
    }

    /// Return every part's id to the allocator.
    pub(crate) fn release_ids(&mut self, ids: &mut IdAllocator) {
        for part in self.parts.iter_mut() {
            ids.release_body_id(part.id);
            part.set_id(BodyId::UNASSIGNED);
        }
    }

    pub(crate) fn part_ids(&self) -> impl Iterator<Item = BodyId> + '_ {
        self.parts.iter().map(|p| p.id)
    }

    //
    // geometry
    //

    /// Replace the body's geometry with a convex polygon,
    /// recomputing mass and inertia from the current density.
    /// The polygon is centred on the body's current position.
    ///
    /// On a compound body this replaces the hull only.
    pub fn set_vertices(&mut self, points: &[Vec2]) {
        let id = self.id();
        let position = self.position();
        let density = self.dynamic.map_or(self.material.density, |d| d.density);
        let mut part = Part::new(Shape::Polygon(Polygon::new(points, id)), density);
        part.id = id;

        let offset = position - part.position;
        part.shape.translate(offset);
        part.position = position;
        part.update_bounds(self.velocity.linear);

        match &mut self.parts {
            Parts::Compound { self_part, .. } => {
                part.area = self_part.area;
                part.mass = self_part.mass;
                part.inertia = self_part.inertia;
                *self_part = part;
            }
            Parts::Single(single) => {
                let (area, mass, inertia) = (part.area, part.mass, part.inertia);
                *single = part;
                self.area = area;
                if self.is_static {
                    self.store_dynamic_mass(Mass::from(mass), Mass::from(inertia), density);
                } else {
                    self.set_mass(mass);
                    self.set_inertia(inertia);
                }
            }
        }
    }

    fn store_dynamic_mass(&mut self, mass: Mass, inertia: Mass, density: f64) {
        if let Some(dynamic) = &mut self.dynamic {
            dynamic.mass = mass;
            dynamic.inertia = inertia;
            dynamic.density = density;
        }
    }

    /// Set the material, recomputing mass from its density.
    pub fn set_material(&mut self, material: Material) {
        self.material = material;
        if self.is_static {
            if let Some(dynamic) = &mut self.dynamic {
                dynamic.restitution = material.restitution;
                dynamic.friction = material.friction;
            }
            self.material.restitution = 0.0;
            self.material.friction = 1.0;
            self.material.density = f64::INFINITY;
            let mass = Mass::from(material.density * self.area);
            let inertia = self.scaled_inertia(mass);
            self.store_dynamic_mass(mass, inertia, material.density);
        } else {
            self.set_density(material.density);
        }
    }

    /// The moment of inertia this body would have with another mass, keeping the
    /// moment-to-mass ratio.
    fn scaled_inertia(&self, mass: Mass) -> Mass {
        let (current_mass, current_inertia) = match self.dynamic {
            Some(d) => (d.mass, d.inertia),
            None => (self.mass, self.inertia),
        };
        match (current_mass, current_inertia, mass) {
            (
                Mass::Finite { mass: old, .. },
                Mass::Finite { mass: inertia, .. },
                Mass::Finite { mass: new, .. },
            ) if old > 0.0 => Mass::from(inertia * new / old),
            _ => current_inertia,
        }
    }

    /// Set the mass, scaling the moment of inertia by the same ratio
    /// and updating the density to match.
    ///
    /// A static body keeps its infinite mass.
    /// The new values take effect when it is made dynamic again.
    pub fn set_mass(&mut self, mass: f64) {
        let mass_value = Mass::from(mass);
        let inertia = self.scaled_inertia(mass_value);
        let density = mass / self.area;
        let part = self.parts.self_part_mut();
        part.mass = mass;
        if let Mass::Finite { mass: inertia, .. } = inertia {
            part.inertia = inertia;
        }
        if self.is_static {
            self.store_dynamic_mass(mass_value, inertia, density);
        } else {
            self.mass = mass_value;
            self.inertia = inertia;
            self.material.density = density;
        }
    }

    /// Set the density, updating the mass (and inertia) from the body's area.
    pub fn set_density(&mut self, density: f64) {
        self.set_mass(density * self.area);
        match &mut self.dynamic {
            Some(dynamic) => dynamic.density = density,
            None => self.material.density = density,
        }
    }

    pub fn set_inertia(&mut self, inertia: f64) {
        self.parts.self_part_mut().inertia = inertia;
        match &mut self.dynamic {
            Some(dynamic) => dynamic.inertia = Mass::from(inertia),
            None => self.inertia = Mass::from(inertia),
        }
    }

    /// Make the body static (immovable, infinite mass) or dynamic again.
    ///
    /// Material values replaced while static are restored when the body becomes dynamic.
    ///
    /// Material and static state belong to the body as a whole.
    /// Parts only carry their share of mass and area, which stays untouched here
    /// so a compound body made dynamic again aggregates the same values.
    pub fn set_static(&mut self, is_static: bool) {
        if self.is_static == is_static {
            return;
        }
        if is_static {
            self.dynamic = Some(DynamicProperties {
                restitution: self.material.restitution,
                friction: self.material.friction,
                density: self.material.density,
                mass: self.mass,
                inertia: self.inertia,
            });
            self.material.restitution = 0.0;
            self.material.friction = 1.0;
            self.material.density = f64::INFINITY;
            self.mass = Mass::Infinite;
            self.inertia = Mass::Infinite;

            self.position_prev = self.position();
            self.angle_prev = self.angle;
            self.velocity = Velocity::default();
            self.speed = 0.0;
            self.angular_speed = 0.0;
            self.motion = 0.0;
        } else if let Some(dynamic) = self.dynamic.take() {
            self.material.restitution = dynamic.restitution;
            self.material.friction = dynamic.friction;
            self.material.density = dynamic.density;
            self.mass = dynamic.mass;
            self.inertia = dynamic.inertia;
        }
        self.is_static = is_static;
    }

    //
    // kinematics
    //

    /// Move the body to a position without giving it velocity.
    pub fn set_position(&mut self, position: Vec2) {
        let delta = position - self.position();
        self.position_prev += delta;
        self.parts.translate(delta, true);
        self.parts.update_bounds(self.velocity.linear);
    }

    /// Rotate the body to an angle in radians without giving it angular velocity.
    pub fn set_angle(&mut self, angle: f64) {
        let delta = angle - self.angle;
        self.angle_prev += delta;
        self.angle = angle;
        let position = self.position();
        self.parts.rotate(delta, position);
        self.parts.update_bounds(self.velocity.linear);
    }

    /// Set the linear velocity, in units of distance per tick.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.position_prev = self.position() - velocity;
        self.velocity.linear = velocity;
        self.speed = velocity.mag();
    }

    /// Set the angular velocity, in radians per tick.
    pub fn set_angular_velocity(&mut self, velocity: f64) {
        self.angle_prev = self.angle - velocity;
        self.velocity.angular = velocity;
        self.angular_speed = velocity.abs();
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.set_position(self.position() + offset);
    }

    /// Rotate by an angle in radians, about the body's position or another point.
    pub fn rotate(&mut self, angle: f64, point: Option<Vec2>) {
        if let Some(point) = point {
            let position = m::rotate_about(self.position(), point, angle);
            self.set_position(position);
        }
        self.set_angle(self.angle + angle);
    }

    /// Move the centre of mass without moving the geometry.
    ///
    /// `relative` interprets `centre` as an offset from the current position.
    pub fn set_centre(&mut self, centre: Vec2, relative: bool) {
        let centre = if relative {
            self.position() + centre
        } else {
            centre
        };
        let delta = centre - self.position();
        self.position_prev += delta;
        let part = self.parts.self_part_mut();
        part.position = centre;
    }

    /// Scale the body per axis about a point (or its own position),
    /// recomputing area, mass and inertia.
    pub fn scale(&mut self, scale_x: f64, scale_y: f64, point: Option<Vec2>) {
        let scale = Vec2::new(scale_x, scale_y);
        let point = point.unwrap_or_else(|| self.position());
        let density = self.dynamic.map_or(self.material.density, |d| d.density);
        let old_position = self.position();

        let mut totals = (0.0, 0.0, 0.0);
        for (i, part) in self.parts.iter_mut().enumerate() {
            part.shape.scale(scale, point);
            let delta = part.position - point;
            part.position = point + Vec2::new(delta.x * scale_x, delta.y * scale_y);
            part.area = geometry::area(part.vertices(), false);
            part.mass = density * part.area;
            part.inertia = part.centred_inertia();
            part.update_bounds(self.velocity.linear);
            if i > 0 {
                totals.0 += part.area;
                totals.1 += part.mass;
                totals.2 += part.inertia;
            }
        }
        self.position_prev += self.position() - old_position;

        let (area, mass, inertia) = match &mut self.parts {
            Parts::Single(part) => (part.area, part.mass, part.inertia),
            Parts::Compound { self_part, .. } => {
                self_part.area = totals.0;
                self_part.mass = totals.1;
                self_part.inertia = totals.2;
                totals
            }
        };
        self.area = area;
        if self.is_static {
            self.store_dynamic_mass(Mass::from(mass), Mass::from(inertia), density);
        } else {
            self.set_mass(mass);
            self.set_inertia(inertia);
        }
    }

    /// Apply a force at a point in world space.
    /// Forces are cleared at the end of every engine update.
    pub fn apply_force(&mut self, position: Vec2, force: Vec2) {
        self.force += force;
        self.torque += m::cross(position - self.position(), force);
    }

    /// Advance the body by one step of position Verlet integration.
    pub(crate) fn integrate(&mut self, delta: f64, time_scale: f64, correction: f64) {
        let dt = delta * time_scale * self.time_scale;
        let dt_sq = dt * dt;
        let air = 1.0 - self.material.friction_air * time_scale * self.time_scale;

        let position = self.position();
        let linear = (position - self.position_prev) * (air * correction)
            + self.force * (self.mass.inv() * dt_sq);
        let angular = (self.angle - self.angle_prev) * air * correction
            + self.torque * self.inertia.inv() * dt_sq;

        self.position_prev = position;
        self.angle_prev = self.angle;
        self.angle += angular;
        self.velocity = Velocity { linear, angular };
        self.speed = linear.mag();
        self.angular_speed = angular.abs();

        self.parts.translate(linear, true);
        self.parts.rotate(angular, position + linear);
        self.parts.update_bounds(linear);
    }

    /// Move the geometry of every part by an impulse that was already applied
    /// to the body position.
    pub(crate) fn apply_position_correction(&mut self, offset: Vec2, angle: f64) {
        self.parts.translate(offset, false);
        let position = self.position();
        self.parts.rotate(angle, position);
        self.parts.update_bounds(self.velocity.linear);
    }

    /// Move the body and its geometry without touching its velocity.
    pub(crate) fn shift(&mut self, offset: Vec2) {
        self.parts.translate(offset, true);
        self.parts.update_bounds(self.velocity.linear);
        self.position_prev += offset;
    }

    /// Move the position of the body alone; geometry follows in
    /// [`apply_position_correction`][Self::apply_position_correction].
    #[inline]
    pub(crate) fn nudge_position(&mut self, offset: Vec2) {
        self.parts.self_part_mut().position += offset;
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::zero();
        self.torque = 0.0;
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < EPS * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn rectangle_is_centred_with_density_mass() {
        let body = Body::rectangle(Vec2::new(10.0, 20.0), 40.0, 20.0);
        assert!((body.position() - Vec2::new(10.0, 20.0)).mag() < EPS);
        assert!(approx(body.area(), 800.0));
        assert!(approx(body.mass().get(), 0.8));
        // 4 * m (w^2 + h^2) / 12
        assert!(approx(body.inertia().get(), 4.0 * 0.8 * 2000.0 / 12.0));
        let bounds = body.bounds();
        assert!((bounds.min - Vec2::new(-10.0, 10.0)).mag() < EPS);
        assert!((bounds.max - Vec2::new(30.0, 30.0)).mag() < EPS);
    }

    #[test]
    fn set_mass_keeps_inertia_ratio() {
        let mut body = Body::rectangle(Vec2::zero(), 20.0, 20.0);
        let ratio = body.inertia().get() / body.mass().get();
        for mass in [1.0, 0.25, 13.0] {
            body.set_mass(mass);
            assert!(approx(body.inertia().get() / body.mass().get(), ratio));
            assert!(approx(body.material().density, mass / 400.0));
        }
        body.set_density(0.01);
        assert!(approx(body.mass().get(), 4.0));
        assert!(approx(body.inertia().get() / body.mass().get(), ratio));
    }

    #[test]
    fn static_toggle_restores_material() {
        let material = Material {
            friction: 0.3,
            restitution: 0.5,
            ..Default::default()
        };
        let mut body = Body::rectangle(Vec2::zero(), 10.0, 10.0).with_material(material);
        let mass = body.mass();
        body.set_static(true);
        assert_eq!(body.mass(), Mass::Infinite);
        assert_eq!(body.mass().inv(), 0.0);
        assert_eq!(body.material().friction, 1.0);
        assert_eq!(body.material().restitution, 0.0);

        body.set_static(false);
        assert_eq!(body.mass(), mass);
        assert_eq!(body.material().friction, 0.3);
        assert_eq!(body.material().restitution, 0.5);
    }

    #[test]
    fn mass_set_while_static_applies_when_dynamic() {
        let dynamic = Body::rectangle(Vec2::zero(), 10.0, 10.0);
        let ratio = dynamic.inertia().get() / dynamic.mass().get();
        let mut body = dynamic.with_static(true);

        body.set_mass(5.0);
        assert!(body.is_static());
        assert_eq!(body.mass(), Mass::Infinite);
        assert_eq!(body.inertia(), Mass::Infinite);
        assert_eq!(body.material().density, f64::INFINITY);

        body.set_static(false);
        assert!(approx(body.mass().get(), 5.0));
        assert!(approx(body.inertia().get() / body.mass().get(), ratio));
        assert!(approx(body.material().density, 0.05));

        body.set_static(true);
        body.set_density(0.02);
        assert_eq!(body.mass(), Mass::Infinite);
        body.set_static(false);
        assert!(approx(body.mass().get(), 2.0));
        assert_eq!(body.material().density, 0.02);
    }

    #[test]
    fn setters_keep_verlet_state_consistent() {
        let mut body = Body::rectangle(Vec2::zero(), 10.0, 10.0);
        body.set_velocity(Vec2::new(2.0, 0.0));
        body.set_position(Vec2::new(50.0, 0.0));
        assert!((body.current_velocity().linear - Vec2::new(2.0, 0.0)).mag() < EPS);

        body.set_angular_velocity(0.1);
        body.set_angle(1.0);
        assert!(approx(body.current_velocity().angular, 0.1));
        assert!(body.bounds().contains_point(body.position()));
        assert!(body.bounds().min.x > 40.0);
    }

    #[test]
    fn rotating_about_a_point_moves_the_body() {
        let mut body = Body::rectangle(Vec2::new(10.0, 0.0), 2.0, 2.0);
        body.rotate(std::f64::consts::PI, Some(Vec2::zero()));
        assert!((body.position() - Vec2::new(-10.0, 0.0)).mag() < 1e-9);
        assert!(approx(body.angle(), std::f64::consts::PI));
        assert!(body.bounds().contains_point(Vec2::new(-10.0, 0.0)));
    }

    #[test]
    fn compound_takes_mass_weighted_centre() {
        let left = Body::rectangle(Vec2::new(0.0, 0.0), 20.0, 20.0);
        let right = Body::rectangle(Vec2::new(30.0, 0.0), 40.0, 20.0);
        let (m_left, m_right) = (left.mass().get(), right.mass().get());
        let body = Body::compound([left, right]);

        assert!(body.parts().is_compound());
        assert_eq!(body.parts().len(), 3);
        assert!(approx(body.mass().get(), m_left + m_right));
        let expected = Vec2::new(30.0 * m_right / (m_left + m_right), 0.0);
        assert!((body.position() - expected).mag() < 1e-9);
        // the hull spans both parts
        let bounds = body.bounds();
        assert!(approx(bounds.min.x, -10.0));
        assert!(approx(bounds.max.x, 50.0));
    }

    #[test]
    fn integration_applies_force_and_moves_parts() {
        let mut body = Body::compound([
            Body::rectangle(Vec2::new(-10.0, 0.0), 10.0, 10.0),
            Body::rectangle(Vec2::new(10.0, 0.0), 10.0, 10.0),
        ]);
        let mass = body.mass().get();
        body.apply_force(body.position(), Vec2::new(0.0, mass));
        body.integrate(1.0, 1.0, 1.0);

        assert!((body.velocity().linear - Vec2::new(0.0, 1.0)).mag() < EPS);
        assert!(approx(body.position().y, 1.0));
        for part in body.parts().iter() {
            assert!(approx(part.bounds().max.y, 6.0 + 1.0));
        }

        // off-centre force also spins the body
        body.clear_forces();
        body.apply_force(body.position() + Vec2::new(10.0, 0.0), Vec2::new(0.0, 1.0));
        assert!(approx(body.torque(), 10.0));
    }

    #[test]
    fn scaling_updates_mass_and_circle_radius() {
        let mut body = Body::circle(Vec2::zero(), 10.0);
        let mass = body.mass().get();
        body.scale(2.0, 2.0, None);
        assert_eq!(body.parts().self_part().shape().radius(), Some(20.0));
        assert!(approx(body.mass().get(), mass * 4.0));

        body.scale(1.0, 0.5, None);
        assert_eq!(body.parts().self_part().shape().radius(), None);
        assert!(approx(body.mass().get(), mass * 2.0));
    }

    #[test]
    fn collision_filter_rules() {
        let a = CollisionFilter::default();
        let mut b = CollisionFilter::default();
        assert!(a.can_collide(&b));

        b.mask = 0x0002;
        assert!(!a.can_collide(&b));

        let grouped = |group| CollisionFilter {
            group,
            mask: 0,
            ..Default::default()
        };
        assert!(grouped(3).can_collide(&grouped(3)));
        assert!(!grouped(-3).can_collide(&grouped(-3)));
        // different groups fall back to masks
        assert!(!grouped(3).can_collide(&grouped(4)));
    }
}
