//! A 2D rigid-body physics engine with sort-and-sweep collision detection,
//! persistent contact pairs with warm starting, and a position-based
//! sequential impulse solver.

/// Open a profiler span that lasts until the returned value is dropped.
/// Does nothing unless the `tracy` feature is enabled and a profiler is connected.
macro_rules! tracy_span {
    ($name:expr, $fn_name:expr) => {
        ::tracy_client::Client::running()
            .map(|client| client.span_alloc(Some($name), $fn_name, file!(), line!(), 0))
    };
}

pub mod math;
pub use math::{uv, Angle, Unit, Vec2};

pub mod physics;
pub use physics::{
    body::{Body, CollisionFilter, Mass, Material, Part, Parts},
    collision::{
        Collision, Contact, Detector, Pair, PairKey, PairState, Pairs, Supports,
    },
    composite::{Composite, CompositeKey, Composites},
    constraint::{Constraint, ConstraintBuilder},
    engine::{Engine, EngineParams},
    entity_set::{BodyKey, ConstraintKey},
    geometry::{Vertex, AABB},
    ids::{BodyId, IdAllocator},
    shape::{Circle, Polygon, Shape},
    sleeping::SleepingParams,
    solver::{ConstraintParams, ResolverParams},
    timing::{Timing, TimestepParams},
    world::World,
    PhysicsError, Velocity,
};
