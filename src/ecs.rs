pub mod physics;
pub mod systems;
pub mod types;
pub mod world;

pub use physics::{Aabb, PhysicsParams, SpatialHash, SpatialMetrics};
pub use systems::TimeDelta;
pub use types::*;
pub use world::SimWorld;
