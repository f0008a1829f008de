//! The simulation loop.

use super::{
    sleeping::{self, SleepingParams},
    solver::{self, ConstraintParams, ResolverParams},
    timing::{TimestepParams, Timing},
    Body, ConstraintKey, World,
};
use crate::math::Vec2;

use thunderdome as td;

/// Parameters of an [`Engine`].
#[derive(Clone, Copy, Debug)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
pub struct EngineParams {
    /// Iterations of penetration resolution per tick.
    pub position_iterations: usize,
    /// Iterations of contact impulse resolution per tick.
    pub velocity_iterations: usize,
    /// Iterations of constraint relaxation, run twice per tick.
    pub constraint_iterations: usize,
    pub enable_sleeping: bool,
    pub gravity: Vec2,
    /// Gravity is multiplied by this before being applied as a force.
    pub gravity_scale: f64,
    pub timestep: TimestepParams,
    pub resolver: ResolverParams,
    pub constraints: ConstraintParams,
    pub sleeping: SleepingParams,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            position_iterations: 16,
            velocity_iterations: 4,
            constraint_iterations: 2,
            enable_sleeping: true,
            gravity: Vec2::new(0.0, 1.0),
            gravity_scale: 0.001,
            timestep: TimestepParams::default(),
            resolver: ResolverParams::default(),
            constraints: ConstraintParams::default(),
            sleeping: SleepingParams::default(),
        }
    }
}

/// Steps a [`World`] forward in time.
///
/// Deltas are in milliseconds. Velocities are in units of distance per tick,
/// so changing the delta between ticks is compensated with a correction factor.
pub struct Engine {
    pub params: EngineParams,
    pub world: World,
    timing: Timing,
    clock_start: instant::Instant,
}

impl Engine {
    pub fn new(params: EngineParams) -> Self {
        Self::with_world(World::new(), params)
    }

    pub fn with_world(world: World, params: EngineParams) -> Self {
        Self {
            timing: Timing::new(&params.timestep),
            params,
            world,
            clock_start: instant::Instant::now(),
        }
    }

    #[inline]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Access the timing state, e.g. to change the time scale.
    #[inline]
    pub fn timing_mut(&mut self) -> &mut Timing {
        &mut self.timing
    }

    /// Step forward by a delta chosen from the wall clock time since the engine was created.
    pub fn tick(&mut self) {
        let time = self.clock_start.elapsed().as_secs_f64() * 1000.0;
        self.tick_at(time);
    }

    /// Step forward by a delta chosen from the given clock reading in milliseconds.
    ///
    /// With a fixed timestep the clock only drives the fps counter.
    pub fn tick_at(&mut self, time: f64) {
        let (delta, correction) = self.timing.next_step(time, &self.params.timestep);
        self.update(delta, correction);
    }

    /// Step forward by exactly `delta` milliseconds.
    #[inline]
    pub fn step(&mut self, delta: f64) {
        self.update(delta, 1.0);
    }

    /// Step forward by `delta` milliseconds,
    /// with `correction` being the ratio of this delta to the previous one.
    pub fn update(&mut self, delta: f64, correction: f64) {
        let _span = tracy_span!("engine update", "update");
        let started = instant::Instant::now();

        let params = &self.params;
        let World {
            entities,
            composites,
            pairs,
            detector,
            ..
        } = &mut self.world;
        let bodies = &mut entities.bodies;
        let constraints = &mut entities.constraints;

        let timestamp = self.timing.advance(delta);
        let time_scale = self.timing.time_scale;

        let root = composites.root();
        if composites.get(root).map_or(false, |c| c.is_modified()) {
            detector.set_bodies(composites.all_bodies(root));
            composites.set_modified(root, false, false, true);
        }
        let constraint_keys = composites.all_constraints(root);

        if params.enable_sleeping {
            sleeping::update(bodies, time_scale, &params.sleeping);
        }

        apply_gravity(bodies, params.gravity, params.gravity_scale);

        for (_, body) in bodies.iter_mut() {
            if body.is_moving() {
                body.integrate(delta, time_scale, correction);
            }
        }

        relax_constraints(bodies, constraints, constraint_keys, time_scale, params);

        let collisions = detector.detect(bodies);
        pairs.update(collisions, bodies, timestamp);

        if params.enable_sleeping {
            sleeping::after_collisions(pairs, bodies, time_scale, &params.sleeping);
        }

        {
            let _span = tracy_span!("resolve positions", "update");
            solver::pre_solve_position(pairs, bodies);
            for _ in 0..params.position_iterations {
                solver::solve_position(pairs, bodies, time_scale, &params.resolver);
            }
            solver::post_solve_position(bodies, &params.resolver);
        }

        relax_constraints(bodies, constraints, constraint_keys, time_scale, params);

        {
            let _span = tracy_span!("resolve velocities", "update");
            solver::pre_solve_velocity(pairs, bodies);
            for _ in 0..params.velocity_iterations {
                solver::solve_velocity(pairs, bodies, time_scale, &params.resolver);
            }
        }

        for (_, body) in bodies.iter_mut() {
            body.clear_forces();
        }

        self.timing.last_elapsed = started.elapsed().as_secs_f64() * 1000.0;
    }
}

fn apply_gravity(bodies: &mut td::Arena<Body>, gravity: Vec2, scale: f64) {
    if gravity == Vec2::zero() || scale == 0.0 {
        return;
    }
    for (_, body) in bodies.iter_mut() {
        if body.is_moving() {
            body.force += gravity * (body.mass.get() * scale);
        }
    }
}

fn relax_constraints(
    bodies: &mut td::Arena<Body>,
    constraints: &mut td::Arena<super::Constraint>,
    keys: &[ConstraintKey],
    time_scale: f64,
    params: &EngineParams,
) {
    solver::pre_solve_constraints(bodies);
    for _ in 0..params.constraint_iterations {
        solver::solve_constraints(constraints, keys, bodies, time_scale, &params.constraints);
    }
    solver::post_solve_constraints(bodies, &params.constraints);
}

//
// tests
//
