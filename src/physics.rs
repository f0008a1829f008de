use crate::math as m;

//

pub mod geometry;
pub use geometry::{Vertex, AABB};

pub mod shape;
pub use shape::Shape;

pub mod ids;
pub use ids::{BodyId, IdAllocator};

pub mod body;
pub use body::{Body, Mass};

pub mod entity_set;
pub use entity_set::{BodyKey, ConstraintKey, EntitySet};

pub mod composite;
pub use composite::{CompositeKey, Composites};

pub mod collision;
pub use collision::{Collision, Pair, PairKey, Pairs};

pub mod constraint;
pub use constraint::{Constraint, ConstraintBuilder};

pub mod solver;

pub mod sleeping;

pub mod timing;

pub mod world;
pub use world::World;

pub mod engine;
pub use engine::{Engine, EngineParams};

//

/// Velocity of an object.
///
/// Both parts are expressed per tick, as displacement between the previous
/// and current pose, because bodies are integrated with position Verlet.
// Equivalent to a Vec3 but with names for the translational and rotational part.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Velocity {
    /// Linear velocity.
    pub linear: m::Vec2,
    /// Angular velocity in radians.
    pub angular: f64,
}

impl Default for Velocity {
    fn default() -> Self {
        Velocity {
            linear: m::Vec2::zero(),
            angular: 0.0,
        }
    }
}

impl Velocity {
    /// Get the linear velocity of a point offset from the center of mass.
    pub fn point_velocity(&self, offset: m::Vec2) -> m::Vec2 {
        let tangent = m::left_normal(offset) * self.angular;
        self.linear + tangent
    }
}

/// Errors from structural operations on a [`World`][self::World].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsError {
    #[error("The composite does not exist in this world")]
    UnknownComposite,
    #[error("The body does not exist in this world")]
    UnknownBody,
    #[error("The constraint does not exist in this world")]
    UnknownConstraint,
    #[error("The root composite of a world cannot be removed")]
    RootRemoval,
    #[error("Adding this composite would make it its own ancestor")]
    CompositeCycle,
    #[error("A constraint must be attached to at least one body")]
    ConstraintWithoutBodies,
    #[error("A constraint cannot attach a body to itself")]
    SelfConstraint,
}

/// Map a function over both elements of a pair.
#[inline]
pub(crate) fn map_pair<T, U>(pair: &[T; 2], f: impl Fn(&T) -> U) -> [U; 2] {
    [f(&pair[0]), f(&pair[1])]
}
