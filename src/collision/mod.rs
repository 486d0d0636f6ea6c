//! Collision detection modules: geometry, broad-phase, narrow-phase, and contact manifolds.

pub mod broadphase;
pub mod clipping;
pub mod contact;
pub mod geometry;
pub mod narrowphase;

pub use broadphase::{BroadPhase, SpatialGrid};
pub use contact::{ContactManifold, ContactResultCallback, ManifoldPoint};
pub use geometry::{CollisionGeometry, ConvexGeometry};
pub use narrowphase::NarrowPhase;
