//! End-to-end simulations through the public API.

use rigidframe::{Body, ConstraintBuilder, Engine, EngineParams, PairState, Vec2};

const DELTA: f64 = 1000.0 / 60.0;

fn weightless() -> EngineParams {
    EngineParams {
        gravity: Vec2::zero(),
        ..Default::default()
    }
}

#[test]
fn box_comes_to_rest_on_the_floor() {
    let mut engine = Engine::new(EngineParams::default());
    let root = engine.world.root();
    let floor = engine
        .world
        .add_body(
            root,
            Body::rectangle(Vec2::new(0.0, 100.0), 400.0, 20.0).with_static(true),
        )
        .unwrap();
    let mut crate_box = Body::rectangle(Vec2::new(0.0, 50.0), 20.0, 20.0);
    crate_box.set_mass(1.0);
    let slop = crate_box.material().slop;
    let key = engine.world.add_body(root, crate_box).unwrap();
    let ids = [floor, key].map(|k| engine.world.body(k).unwrap().id());

    for _ in 0..200 {
        engine.step(16.6);
    }

    // penetration settles within the allowed slop and stays there
    for tick in 200..600 {
        engine.step(16.6);
        let body = engine.world.body(key).unwrap();
        let sink = body.position().y - 80.0;
        assert!(sink.abs() <= slop + 1e-9, "tick {tick}: {:?}", body.position());
        assert!(body.position().x.abs() < 1e-6);
    }

    let body = engine.world.body(key).unwrap();
    assert!(body.is_sleeping());
    assert!(body.current_velocity().linear.y.abs() < 0.05);

    // a sleeping body keeps its contact pair, marked inactive
    let pair = engine.world.pair(ids[0], ids[1]).expect("pair kept while asleep");
    assert!(!pair.is_active());
    assert!(engine.world.pairs().collision_start().is_empty());
}

#[test]
fn separating_axis_depth_of_overlapping_squares() {
    let mut engine = Engine::new(weightless());
    let root = engine.world.root();
    let a = engine
        .world
        .add_body(root, Body::rectangle(Vec2::zero(), 20.0, 20.0))
        .unwrap();
    let b = engine
        .world
        .add_body(root, Body::rectangle(Vec2::new(15.0, 0.0), 20.0, 20.0))
        .unwrap();
    let ids = [a, b].map(|k| engine.world.body(k).unwrap().id());

    engine.step(DELTA);

    let pair = engine.world.pair(ids[0], ids[1]).expect("squares overlap");
    assert_eq!(pair.state(), PairState::Start);
    let collision = pair.collision();
    assert!((collision.depth - 5.0).abs() < 1e-9);
    assert!((collision.normal.x.abs() - 1.0).abs() < 1e-9);
    assert!(collision.normal.y.abs() < 1e-9);

    // and the solver pushes them apart
    let [pa, pb] = [a, b].map(|k| engine.world.body(k).unwrap().position());
    assert!(pb.x - pa.x > 15.0);
}

#[test]
fn distance_constraint_holds_its_length() {
    let mut engine = Engine::new(weightless());
    let root = engine.world.root();
    let a = engine
        .world
        .add_body(root, Body::rectangle(Vec2::zero(), 10.0, 10.0))
        .unwrap();
    let b = engine
        .world
        .add_body(root, Body::rectangle(Vec2::new(80.0, 0.0), 10.0, 10.0))
        .unwrap();
    let joint = engine
        .world
        .add_constraint(
            root,
            ConstraintBuilder::new()
                .with_body_a(a)
                .with_body_b(b)
                .with_length(50.0),
        )
        .unwrap();

    for _ in 0..60 {
        engine.step(DELTA);
    }

    let [pa, pb] = [a, b].map(|k| engine.world.body(k).unwrap().position());
    assert!(((pb - pa).mag() - 50.0).abs() < 1e-3, "{pa:?} {pb:?}");
    assert_eq!(engine.world.constraint(joint).unwrap().length, 50.0);
    assert!((engine.world.constraint_length(joint).unwrap() - 50.0).abs() < 1e-3);
}

#[test]
fn resting_body_falls_asleep_and_stays_put() {
    let mut engine = Engine::new(weightless());
    let root = engine.world.root();
    let key = engine
        .world
        .add_body(root, Body::rectangle(Vec2::new(10.0, 10.0), 10.0, 10.0))
        .unwrap();

    for _ in 0..60 {
        engine.step(DELTA);
    }
    assert!(engine.world.body(key).unwrap().is_sleeping());

    engine.params.gravity = Vec2::new(0.0, 1.0);
    for _ in 0..30 {
        engine.step(DELTA);
    }
    let body = engine.world.body(key).unwrap();
    assert!(body.is_sleeping());
    assert_eq!(body.position(), Vec2::new(10.0, 10.0));

    engine.world.set_sleeping(key, false).unwrap();
    engine.step(DELTA);
    assert!(engine.world.body(key).unwrap().position().y > 10.0);
}

#[test]
fn compound_mass_and_centroid() {
    let mut engine = Engine::new(weightless());
    let left = Body::rectangle(Vec2::new(0.0, 0.0), 20.0, 20.0);
    let right = Body::rectangle(Vec2::new(30.0, 0.0), 40.0, 20.0);
    let expected_mass = left.mass().get() + right.mass().get();
    let expected_centre = (left.position() * left.mass().get()
        + right.position() * right.mass().get())
        / expected_mass;

    let root = engine.world.root();
    let key = engine
        .world
        .add_body(root, Body::compound([left, right]))
        .unwrap();
    let body = engine.world.body(key).unwrap();
    assert!((body.mass().get() - expected_mass).abs() < 1e-9);
    assert!((body.position() - expected_centre).mag() < 1e-9);
    assert!((body.area() - 1200.0).abs() < 1e-9);
    assert!(body.parts().is_compound());
    assert_eq!(body.parts().colliding().len(), 2);
}

#[test]
fn sensors_report_contacts_without_blocking() {
    let mut engine = Engine::new(EngineParams {
        enable_sleeping: false,
        ..Default::default()
    });
    let root = engine.world.root();
    engine
        .world
        .add_body(
            root,
            Body::rectangle(Vec2::new(0.0, 100.0), 400.0, 20.0)
                .with_static(true)
                .with_sensor(true),
        )
        .unwrap();
    let key = engine
        .world
        .add_body(root, Body::rectangle(Vec2::new(0.0, 50.0), 20.0, 20.0))
        .unwrap();

    let mut starts = 0;
    let mut ends = 0;
    for _ in 0..120 {
        engine.step(DELTA);
        starts += engine.world.pairs().collision_start().len();
        ends += engine.world.pairs().collision_end().len();
    }
    assert_eq!(starts, 1);
    assert_eq!(ends, 1);
    assert!(engine.world.body(key).unwrap().position().y > 150.0);
}

#[test]
fn variable_timestep_stays_within_bounds() {
    let mut engine = Engine::new(EngineParams {
        timestep: rigidframe::TimestepParams {
            is_fixed: false,
            delta_sample_size: 1,
            ..Default::default()
        },
        ..Default::default()
    });
    let params = engine.params.timestep;
    let mut time = 0.0;
    for step in [5.0, 16.0, 100.0, 20.0] {
        time += step;
        engine.tick_at(time);
        let delta = engine.timing().delta();
        assert!(delta >= params.delta_min && delta <= params.delta_max);
    }
    assert!((engine.timing().delta() - 20.0).abs() < 1e-9);
    assert!(engine.timing().timestamp() > 0.0);

    // the wall clock drives the same path
    engine.tick();
    assert!(engine.timing().last_elapsed() >= 0.0);
}

#[cfg(feature = "serde-types")]
#[test]
fn parameters_load_from_ron() {
    let params: EngineParams = ron::from_str(
        "(
            position_iterations: 10,
            enable_sleeping: false,
            timestep: (is_fixed: false, delta_sample_size: 30),
            resolver: (position_warming: 0.5),
        )",
    )
    .unwrap();
    assert_eq!(params.position_iterations, 10);
    assert_eq!(params.velocity_iterations, 4);
    assert!(!params.enable_sleeping);
    assert!(!params.timestep.is_fixed);
    assert_eq!(params.timestep.delta_sample_size, 30);
    assert_eq!(params.timestep.fps, 60.0);
    assert_eq!(params.resolver.position_warming, 0.5);
    assert_eq!(params.resolver.position_dampen, 0.9);
    assert_eq!(params.gravity, Vec2::new(0.0, 1.0));

    let text = ron::to_string(&params).unwrap();
    let back: EngineParams = ron::from_str(&text).unwrap();
    assert_eq!(back.gravity, params.gravity);
    assert_eq!(back.timestep.delta_sample_size, 30);
}
