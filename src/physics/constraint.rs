//! Distance constraints between bodies or between a body and the world.

use super::{map_pair, Body, BodyKey, PhysicsError};
use crate::math::{self as m, Vec2};

use thunderdome as td;

/// A constraint keeps two points at a fixed distance from each other.
///
/// Each point is either an anchor on a body, given as an offset from the body's position
/// that rotates with the body, or a fixed point in the world if the body is `None`.
///
/// [`ConstraintBuilder`][self::ConstraintBuilder] is the way to create these.
/// The tuning fields are public to allow in-place editing after creation.
#[derive(Clone, Copy, Debug)]
pub struct Constraint {
    pub(crate) bodies: [Option<BodyKey>; 2],
    /// Anchors relative to each body, or world points for missing bodies.
    pub(crate) points: [Vec2; 2],
    /// Body angles the anchors were last rotated to.
    pub(crate) reference_angles: [f64; 2],
    /// Rest length.
    pub length: f64,
    /// How strongly the rest length is enforced, from 0 to 1.
    /// Values below 1 behave like a spring.
    pub stiffness: f64,
    /// Damping of relative velocity along the constraint.
    pub damping: f64,
    /// How much the constraint resists rotating the bodies, from 0 to 1.
    pub angular_stiffness: f64,
}

impl Constraint {
    #[inline]
    pub fn bodies(&self) -> &[Option<BodyKey>; 2] {
        &self.bodies
    }

    #[inline]
    pub fn body_a(&self) -> Option<BodyKey> {
        self.bodies[0]
    }

    #[inline]
    pub fn body_b(&self) -> Option<BodyKey> {
        self.bodies[1]
    }

    /// Current anchor offsets (or world points).
    #[inline]
    pub fn points(&self) -> [Vec2; 2] {
        self.points
    }

    /// Whether the constraint involves the given body.
    #[inline]
    pub fn involves(&self, body: BodyKey) -> bool {
        self.bodies.contains(&Some(body))
    }

    /// Whether one end is anchored to something that can't move.
    /// These are solved before constraints between two free bodies.
    pub(crate) fn is_fixed(&self, bodies: &td::Arena<Body>) -> bool {
        self.bodies.iter().any(|body| match body {
            Some(key) => bodies.get(key.0).map_or(true, |b| b.is_static()),
            None => true,
        })
    }

    /// World positions of both ends of the constraint.
    pub fn world_points(&self, bodies: &td::Arena<Body>) -> [Vec2; 2] {
        let ends = [0, 1];
        map_pair(&ends, |&i| world_point(self.bodies[i], self.points[i], bodies))
    }

    /// Current distance between the ends.
    pub fn current_length(&self, bodies: &td::Arena<Body>) -> f64 {
        let [a, b] = self.world_points(bodies);
        (a - b).mag()
    }

    /// Rotate the anchor on a body to follow the body's rotation since the last call.
    pub(crate) fn update_reference_angle(&mut self, end: usize, body: &Body) {
        if body.is_static() {
            return;
        }
        let turned = body.angle() - self.reference_angles[end];
        if turned != 0.0 {
            self.points[end] = m::rotate(self.points[end], turned);
        }
        self.reference_angles[end] = body.angle();
    }
}

fn world_point(body: Option<BodyKey>, point: Vec2, bodies: &td::Arena<Body>) -> Vec2 {
    match body.and_then(|k| bodies.get(k.0)) {
        Some(body) => body.position() + point,
        None => point,
    }
}

/// A builder for [`Constraint`]s.
///
/// At least one of the bodies is required.
/// The rest length defaults to the distance between the ends at the time of creation,
/// and stiffness defaults to 1, or 0.7 for constraints of zero length.
///
/// ```ignore
/// let spring = ConstraintBuilder::new()
///     .with_body_a(a)
///     .with_body_b(b)
///     .with_stiffness(0.05)
///     .with_damping(0.1);
/// world.add_constraint(world.root(), spring)?;
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ConstraintBuilder {
    bodies: [Option<BodyKey>; 2],
    points: [Vec2; 2],
    length: Option<f64>,
    length_ratio: f64,
    stiffness: Option<f64>,
    damping: f64,
    angular_stiffness: f64,
}

impl Default for ConstraintBuilder {
    fn default() -> Self {
        Self {
            bodies: [None; 2],
            points: [Vec2::zero(); 2],
            length: None,
            length_ratio: 1.0,
            stiffness: None,
            damping: 0.0,
            angular_stiffness: 0.0,
        }
    }
}

impl ConstraintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body_a(mut self, body: BodyKey) -> Self {
        self.bodies[0] = Some(body);
        self
    }

    pub fn with_body_b(mut self, body: BodyKey) -> Self {
        self.bodies[1] = Some(body);
        self
    }

    /// Set the first end relative to body A's position,
    /// or in world space if there is no body A.
    pub fn with_point_a(mut self, point: Vec2) -> Self {
        self.points[0] = point;
        self
    }

    /// Set the second end relative to body B's position,
    /// or in world space if there is no body B.
    pub fn with_point_b(mut self, point: Vec2) -> Self {
        self.points[1] = point;
        self
    }

    /// Set the rest length explicitly instead of measuring it.
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = Some(length);
        self
    }

    /// Scale the measured rest length.
    /// Ignored if the length is set with [`with_length`][Self::with_length].
    pub fn with_length_ratio(mut self, ratio: f64) -> Self {
        self.length_ratio = ratio;
        self
    }

    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = Some(stiffness);
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_angular_stiffness(mut self, angular_stiffness: f64) -> Self {
        self.angular_stiffness = angular_stiffness;
        self
    }

    pub(crate) fn build(self, bodies: &td::Arena<Body>) -> Result<Constraint, PhysicsError> {
        match self.bodies {
            [None, None] => return Err(PhysicsError::ConstraintWithoutBodies),
            [Some(a), Some(b)] if a == b => return Err(PhysicsError::SelfConstraint),
            _ => {}
        }
        for key in self.bodies.iter().flatten() {
            if !bodies.contains(key.0) {
                return Err(PhysicsError::UnknownBody);
            }
        }

        let length = self.length.unwrap_or_else(|| {
            let [a, b] = map_pair(&[0, 1], |&i| {
                world_point(self.bodies[i], self.points[i], bodies)
            });
            (a - b).mag() * self.length_ratio
        });
        let stiffness = self
            .stiffness
            .unwrap_or(if length > 0.0 { 1.0 } else { 0.7 });
        let reference_angles = map_pair(&self.bodies, |body| {
            body.and_then(|k| bodies.get(k.0)).map_or(0.0, |b| b.angle())
        });

        Ok(Constraint {
            bodies: self.bodies,
            points: self.points,
            reference_angles,
            length,
            stiffness,
            damping: self.damping,
            angular_stiffness: self.angular_stiffness,
        })
    }
}

//
// tests
//
