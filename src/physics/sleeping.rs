//! Putting resting bodies to sleep and waking them up again.

use super::{collision::Pairs, Body, Velocity};
use crate::math::Vec2;

use thunderdome as td;

/// Thresholds of the sleep heuristic.
///
/// Motion is the sum of squared linear and angular speed, smoothed over ticks.
/// Both thresholds are multiplied by the cube of the time scale.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct SleepingParams {
    /// Motion above which a body in contact wakes a sleeping partner.
    pub motion_wake_threshold: f64,
    /// Motion below which a body counts towards falling asleep.
    pub motion_sleep_threshold: f64,
    /// Weight of the smaller of the old and new motion in the smoothed average.
    pub min_bias: f64,
}

impl Default for SleepingParams {
    fn default() -> Self {
        Self {
            motion_wake_threshold: 0.18,
            motion_sleep_threshold: 0.08,
            min_bias: 0.9,
        }
    }
}

/// Put a body to sleep or wake it up.
///
/// A sleeping body is skipped by integration and by the solvers
/// until something wakes it. Falling asleep discards its velocity.
pub fn set_sleeping(body: &mut Body, is_sleeping: bool) {
    if is_sleeping {
        let was_sleeping = body.is_sleeping;
        body.is_sleeping = true;
        body.sleep_counter = body.sleep_threshold;
        body.position_impulse = Vec2::zero();
        body.position_prev = body.position();
        body.angle_prev = body.angle;
        body.velocity = Velocity::default();
        body.speed = 0.0;
        body.angular_speed = 0.0;
        body.motion = 0.0;
        if !was_sleeping {
            tracing::debug!(id = body.id().get(), "body fell asleep");
        }
    } else {
        if body.is_sleeping {
            tracing::debug!(id = body.id().get(), "body woke up");
        }
        body.is_sleeping = false;
        body.sleep_counter = 0;
    }
}

/// Track the motion of every body and put the ones that have been still long enough to sleep.
pub(crate) fn update(bodies: &mut td::Arena<Body>, time_scale: f64, params: &SleepingParams) {
    let time_factor = time_scale * time_scale * time_scale;

    for (_, body) in bodies.iter_mut() {
        if body.is_static {
            continue;
        }
        if body.force != Vec2::zero() {
            set_sleeping(body, false);
            continue;
        }

        let motion = body.speed * body.speed + body.angular_speed * body.angular_speed;
        let min_motion = body.motion.min(motion);
        let max_motion = body.motion.max(motion);
        body.motion = params.min_bias * min_motion + (1.0 - params.min_bias) * max_motion;

        if body.sleep_threshold > 0 && body.motion < params.motion_sleep_threshold * time_factor
        {
            body.sleep_counter += 1;
            if body.sleep_counter >= body.sleep_threshold {
                set_sleeping(body, true);
            }
        } else if body.sleep_counter > 0 {
            body.sleep_counter -= 1;
        }
    }
}

/// Wake sleeping bodies that are touched by a moving one.
pub(crate) fn after_collisions(
    pairs: &Pairs,
    bodies: &mut td::Arena<Body>,
    time_scale: f64,
    params: &SleepingParams,
) {
    let time_factor = time_scale * time_scale * time_scale;

    for pair in pairs.iter().filter(|p| p.is_active()) {
        let [ka, kb] = pair.collision().bodies;
        let (Some(a), Some(b)) = bodies.get2_mut(ka.0, kb.0) else {
            continue;
        };
        if (a.is_sleeping && b.is_sleeping) || a.is_static || b.is_static {
            continue;
        }
        let (sleeper, mover) = match (a.is_sleeping, b.is_sleeping) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            _ => continue,
        };
        if mover.motion > params.motion_wake_threshold * time_factor {
            set_sleeping(sleeper, false);
        }
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{collision::Detector, BodyKey, IdAllocator};

    fn arena(bodies: Vec<Body>) -> (td::Arena<Body>, Vec<BodyKey>) {
        let mut ids = IdAllocator::new();
        let mut arena = td::Arena::new();
        let keys = bodies
            .into_iter()
            .map(|mut b| {
                b.assign_ids(&mut ids);
                BodyKey(arena.insert(b))
            })
            .collect();
        (arena, keys)
    }

    #[test]
    fn still_bodies_fall_asleep() {
        let mut body = Body::rectangle(Vec2::zero(), 10.0, 10.0);
        body.set_sleep_threshold(3);
        let (mut bodies, keys) = arena(vec![body]);
        let params = SleepingParams::default();

        update(&mut bodies, 1.0, &params);
        update(&mut bodies, 1.0, &params);
        assert!(!bodies[keys[0].0].is_sleeping());
        update(&mut bodies, 1.0, &params);
        let body = &bodies[keys[0].0];
        assert!(body.is_sleeping());
        assert!(!body.is_moving());
        assert_eq!(body.velocity(), Velocity::default());
    }

    #[test]
    fn moving_bodies_and_forces_stay_awake() {
        let mut fast = Body::rectangle(Vec2::zero(), 10.0, 10.0);
        fast.set_sleep_threshold(1);
        fast.speed = 2.0;
        let mut never = Body::rectangle(Vec2::new(50.0, 0.0), 10.0, 10.0);
        never.set_sleep_threshold(0);
        let (mut bodies, keys) = arena(vec![fast, never]);
        let params = SleepingParams::default();

        for _ in 0..10 {
            update(&mut bodies, 1.0, &params);
        }
        assert!(!bodies[keys[0].0].is_sleeping());
        assert!(!bodies[keys[1].0].is_sleeping());

        let sleeper = &mut bodies[keys[1].0];
        set_sleeping(sleeper, true);
        sleeper.apply_force(sleeper.position(), Vec2::new(0.0, 1.0));
        update(&mut bodies, 1.0, &params);
        assert!(!bodies[keys[1].0].is_sleeping());
    }

    #[test]
    fn sleepers_are_woken_by_moving_partners() {
        let (mut bodies, keys) = arena(vec![
            Body::rectangle(Vec2::zero(), 20.0, 20.0),
            Body::rectangle(Vec2::new(15.0, 0.0), 20.0, 20.0),
        ]);
        let mut detector = Detector::new();
        detector.set_bodies(&keys);
        let mut pairs = Pairs::new();
        pairs.update(detector.detect(&bodies), &bodies, 0.0);
        let params = SleepingParams::default();

        set_sleeping(&mut bodies[keys[1].0], true);
        bodies[keys[0].0].motion = 0.01;
        after_collisions(&pairs, &mut bodies, 1.0, &params);
        assert!(bodies[keys[1].0].is_sleeping());

        bodies[keys[0].0].motion = 1.0;
        after_collisions(&pairs, &mut bodies, 1.0, &params);
        assert!(!bodies[keys[1].0].is_sleeping());

        // static bodies never wake anything
        set_sleeping(&mut bodies[keys[1].0], true);
        bodies[keys[0].0].set_static(true);
        after_collisions(&pairs, &mut bodies, 1.0, &params);
        assert!(bodies[keys[1].0].is_sleeping());
    }
}
