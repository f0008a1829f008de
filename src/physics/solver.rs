//! Position and velocity resolution of contacts, and relaxation of constraints.
//!
//! Every pass works directly on the bodies' Verlet state: positions are nudged to resolve
//! penetration and joint violations, and velocities are changed by moving
//! `position_prev`/`angle_prev`.

use super::{
    collision::Pairs, constraint::Constraint, sleeping, Body, ConstraintKey,
};
use crate::math::{self as m, Vec2};

use thunderdome as td;

/// Tuning constants of the contact solver.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct ResolverParams {
    /// Squared normal speed (per time scale squared) above which a contact
    /// counts as an impact and its cached normal impulse is discarded.
    pub resting_thresh: f64,
    /// Same as `resting_thresh` for tangential speed.
    pub resting_thresh_tangent: f64,
    /// Fraction of the penetration corrected in one position iteration.
    pub position_dampen: f64,
    /// Fraction of the position impulse carried over to the next tick.
    pub position_warming: f64,
    pub friction_normal_multiplier: f64,
}

impl Default for ResolverParams {
    fn default() -> Self {
        Self {
            resting_thresh: 4.0,
            resting_thresh_tangent: 6.0,
            position_dampen: 0.9,
            position_warming: 0.8,
            friction_normal_multiplier: 5.0,
        }
    }
}

/// Tuning constants of the constraint solver.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct ConstraintParams {
    /// Fraction of the constraint impulse carried over to the next tick.
    pub warming: f64,
    pub torque_dampen: f64,
    /// Lengths are clamped to at least this to avoid dividing by zero.
    pub min_length: f64,
}

impl Default for ConstraintParams {
    fn default() -> Self {
        Self {
            warming: 0.5,
            torque_dampen: 1.0,
            min_length: 1e-6,
        }
    }
}

/// Mutable access to both bodies of a pair. `None` if either is missing.
#[inline]
fn body_pair_mut<'a>(
    bodies: &'a mut td::Arena<Body>,
    [a, b]: [super::BodyKey; 2],
) -> Option<(&'a mut Body, &'a mut Body)> {
    match bodies.get2_mut(a.0, b.0) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// Add an impulse to a body's previous pose, changing its implied velocity.
/// `sign` is 1 for the first body of a pair and -1 for the second.
#[inline]
fn apply_impulse(body: &mut Body, impulse: Vec2, offset: Vec2, sign: f64) {
    if !body.is_moving() {
        return;
    }
    body.position_prev += impulse * (sign * body.mass.inv());
    body.angle_prev += sign * body.inertia.inv() * m::cross(offset, impulse);
}

//
// Position
//

/// Count the contacts every body takes part in,
/// so position corrections can be shared between them.
pub(crate) fn pre_solve_position(pairs: &Pairs, bodies: &mut td::Arena<Body>) {
    for pair in pairs.list.iter().filter(|p| p.is_active) {
        let count = pair.active_slots.len();
        for key in pair.collision.bodies {
            if let Some(body) = bodies.get_mut(key.0) {
                body.total_contacts += count;
            }
        }
    }
}

/// One iteration of penetration resolution.
pub(crate) fn solve_position(
    pairs: &mut Pairs,
    bodies: &mut td::Arena<Body>,
    time_scale: f64,
    params: &ResolverParams,
) {
    let _span = tracy_span!("solve position", "solve_position");

    // measure separations before moving anything
    for pair in pairs.list.iter_mut().filter(|p| p.is_active && !p.is_sensor) {
        let [ka, kb] = pair.collision.bodies;
        let (Some(a), Some(b)) = (bodies.get(ka.0), bodies.get(kb.0)) else {
            continue;
        };
        pair.separation = pair.collision.depth
            + pair
                .collision
                .normal
                .dot(a.position_impulse - b.position_impulse);
    }

    for pair in pairs.list.iter().filter(|p| p.is_active && !p.is_sensor) {
        let Some((a, b)) = body_pair_mut(bodies, pair.collision.bodies) else {
            continue;
        };
        let normal = *pair.collision.normal;
        let mut impulse = (pair.separation - pair.slop) * time_scale;
        if a.is_static || b.is_static {
            impulse *= 2.0;
        }

        if a.is_moving() {
            let share = params.position_dampen / a.total_contacts as f64;
            a.position_impulse -= normal * (impulse * share);
        }
        if b.is_moving() {
            let share = params.position_dampen / b.total_contacts as f64;
            b.position_impulse += normal * (impulse * share);
        }
    }
}

/// Move bodies by their accumulated position impulses
/// and keep part of the impulse for the next tick.
pub(crate) fn post_solve_position(bodies: &mut td::Arena<Body>, params: &ResolverParams) {
    for (_, body) in bodies.iter_mut() {
        body.total_contacts = 0;

        let impulse = body.position_impulse;
        if impulse == Vec2::zero() {
            continue;
        }
        body.shift(impulse);

        if impulse.dot(body.velocity.linear) < 0.0 {
            body.position_impulse = Vec2::zero();
        } else {
            body.position_impulse *= params.position_warming;
        }
    }
}

//
// Velocity
//

/// Apply the impulses cached on contacts during the previous tick.
pub(crate) fn pre_solve_velocity(pairs: &Pairs, bodies: &mut td::Arena<Body>) {
    for pair in pairs.list.iter().filter(|p| p.is_active && !p.is_sensor) {
        let Some((a, b)) = body_pair_mut(bodies, pair.collision.bodies) else {
            continue;
        };
        let normal = *pair.collision.normal;
        let tangent = *pair.collision.tangent;

        for contact in pair.active_contacts() {
            if contact.normal_impulse == 0.0 && contact.tangent_impulse == 0.0 {
                continue;
            }
            let impulse = normal * contact.normal_impulse + tangent * contact.tangent_impulse;
            let point = contact.vertex.pos;
            apply_impulse(a, impulse, point - a.position(), 1.0);
            apply_impulse(b, impulse, point - b.position(), -1.0);
        }
    }
}

/// One iteration of sequential impulses on every contact.
pub(crate) fn solve_velocity(
    pairs: &mut Pairs,
    bodies: &mut td::Arena<Body>,
    time_scale: f64,
    params: &ResolverParams,
) {
    let _span = tracy_span!("solve velocity", "solve_velocity");

    let ts_sq = time_scale * time_scale;
    let resting_thresh = params.resting_thresh * ts_sq;
    let resting_thresh_tangent = params.resting_thresh_tangent * ts_sq;

    for pair in pairs.list.iter_mut().filter(|p| p.is_active && !p.is_sensor) {
        let Some((a, b)) = body_pair_mut(bodies, pair.collision.bodies) else {
            continue;
        };
        if pair.active_slots.is_empty() {
            continue;
        }

        let normal = *pair.collision.normal;
        let tangent = *pair.collision.tangent;
        let contact_share = 1.0 / pair.active_slots.len() as f64;
        let inv_mass_total = a.mass.inv() + b.mass.inv();
        let friction =
            pair.friction * pair.friction_static * params.friction_normal_multiplier * ts_sq;

        a.velocity = a.current_velocity();
        b.velocity = b.current_velocity();

        for &slot in &pair.active_slots {
            let Some(contact) = &mut pair.slots[slot] else {
                continue;
            };
            let point = contact.vertex.pos;
            let offset_a = point - a.position();
            let offset_b = point - b.position();

            let relative =
                a.velocity.point_velocity(offset_a) - b.velocity.point_velocity(offset_b);
            let normal_vel = normal.dot(relative);
            let tangent_vel = tangent.dot(relative);

            // coulomb friction
            let normal_force = (pair.separation - normal_vel).clamp(0.0, 1.0);
            let friction_limit = normal_force * friction;
            let (mut tangent_impulse, max_friction) = if tangent_vel.abs() > friction_limit {
                let max = tangent_vel.abs();
                let impulse = (pair.friction * tangent_vel.signum() * ts_sq).clamp(-max, max);
                (impulse, max)
            } else {
                (tangent_vel, f64::MAX)
            };

            let oa_cn = m::cross(offset_a, normal);
            let ob_cn = m::cross(offset_b, normal);
            let share = contact_share
                / (inv_mass_total
                    + a.inertia.inv() * oa_cn * oa_cn
                    + b.inertia.inv() * ob_cn * ob_cn);

            let mut normal_impulse = (1.0 + pair.restitution) * normal_vel * share;
            tangent_impulse *= share;

            if normal_vel * normal_vel > resting_thresh && normal_vel > 0.0 {
                // impact, don't build on the cached impulse
                contact.normal_impulse = 0.0;
            } else {
                let cached = contact.normal_impulse;
                contact.normal_impulse = (cached + normal_impulse).max(0.0);
                normal_impulse = contact.normal_impulse - cached;
            }

            if tangent_vel * tangent_vel > resting_thresh_tangent {
                contact.tangent_impulse = 0.0;
            } else {
                let cached = contact.tangent_impulse;
                contact.tangent_impulse =
                    (cached + tangent_impulse).clamp(-max_friction, max_friction);
                tangent_impulse = contact.tangent_impulse - cached;
            }

            let impulse = normal * normal_impulse + tangent * tangent_impulse;
            apply_impulse(a, impulse, offset_a, 1.0);
            apply_impulse(b, impulse, offset_b, -1.0);
        }
    }
}

//
// Constraints
//

/// Re-apply the constraint impulses kept from the previous tick.
pub(crate) fn pre_solve_constraints(bodies: &mut td::Arena<Body>) {
    for (_, body) in bodies.iter_mut() {
        if body.is_static || !has_constraint_impulse(body) {
            continue;
        }
        body.nudge_position(body.constraint_impulse);
        body.angle += body.constraint_impulse_angle;
    }
}

/// One relaxation pass over the given constraints.
/// Constraints anchored to the world or to a static body go first.
pub(crate) fn solve_constraints(
    constraints: &mut td::Arena<Constraint>,
    keys: &[ConstraintKey],
    bodies: &mut td::Arena<Body>,
    time_scale: f64,
    params: &ConstraintParams,
) {
    let _span = tracy_span!("solve constraints", "solve_constraints");

    for fixed_pass in [true, false] {
        for key in keys {
            let Some(constraint) = constraints.get_mut(key.0) else {
                continue;
            };
            if constraint.is_fixed(bodies) == fixed_pass {
                solve_constraint(constraint, bodies, time_scale, params);
            }
        }
    }
}

fn solve_constraint(
    constraint: &mut Constraint,
    bodies: &mut td::Arena<Body>,
    time_scale: f64,
    params: &ConstraintParams,
) {
    let [key_a, key_b] = constraint.bodies;
    for (end, key) in [key_a, key_b].into_iter().enumerate() {
        if let Some(body) = key.and_then(|k| bodies.get(k.0)) {
            constraint.update_reference_angle(end, body);
        }
    }

    let [world_a, world_b] = constraint.world_points(bodies);
    let delta = world_a - world_b;
    let current_length = delta.mag().max(params.min_length);
    let difference = (current_length - constraint.length) / current_length;
    let stiffness = if constraint.stiffness < 1.0 {
        constraint.stiffness * time_scale
    } else {
        constraint.stiffness
    };
    let force = delta * (difference * stiffness);

    let (body_a, body_b) = match (key_a, key_b) {
        (Some(a), Some(b)) => bodies.get2_mut(a.0, b.0),
        (Some(a), None) => (bodies.get_mut(a.0), None),
        (None, Some(b)) => (None, bodies.get_mut(b.0)),
        (None, None) => return,
    };

    let sum = |f: fn(&Body) -> f64| {
        body_a.as_deref().map_or(0.0, f) + body_b.as_deref().map_or(0.0, f)
    };
    let mass_total = sum(|b| b.mass.inv());
    if mass_total == 0.0 {
        return;
    }
    let resistance_total = mass_total + sum(|b| b.inertia.inv());

    let normal = delta / current_length;
    let normal_velocity = if constraint.damping != 0.0 {
        let vel = |b: &Option<&mut Body>| {
            b.as_deref()
                .map_or(Vec2::zero(), |b| b.current_velocity().linear)
        };
        normal.dot(vel(&body_b) - vel(&body_a))
    } else {
        0.0
    };

    let ends = [(body_a, -1.0), (body_b, 1.0)];
    for (end, (body, sign)) in ends.into_iter().enumerate() {
        let Some(body) = body.filter(|b| !b.is_static) else {
            continue;
        };
        let share = body.mass.inv() / mass_total;
        let offset = force * (sign * share);

        body.constraint_impulse += offset;
        body.nudge_position(offset);

        if constraint.damping != 0.0 {
            body.position_prev += normal * (sign * constraint.damping * normal_velocity * share);
        }

        let torque = m::cross(constraint.points[end], force) / resistance_total
            * params.torque_dampen
            * body.inertia.inv()
            * (1.0 - constraint.angular_stiffness);
        body.constraint_impulse_angle += sign * torque;
        body.angle += sign * torque;
    }
}

/// Move body geometry to follow the constraint corrections,
/// and keep part of the impulse for the next tick.
pub(crate) fn post_solve_constraints(bodies: &mut td::Arena<Body>, params: &ConstraintParams) {
    for (_, body) in bodies.iter_mut() {
        if body.is_static || !has_constraint_impulse(body) {
            continue;
        }
        sleeping::set_sleeping(body, false);

        body.apply_position_correction(body.constraint_impulse, body.constraint_impulse_angle);

        body.constraint_impulse *= params.warming;
        body.constraint_impulse_angle *= params.warming;
    }
}

#[inline]
fn has_constraint_impulse(body: &Body) -> bool {
    body.constraint_impulse != Vec2::zero() || body.constraint_impulse_angle != 0.0
}

//
// tests
//
