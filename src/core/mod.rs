//! Core types describing simulated bodies and shared data.

pub mod body;
pub mod types;

pub use body::Body;
pub use types::{MassProperties, Material, MaterialPairProperties, Transform, Velocity};
