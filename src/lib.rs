//! Hymn physics core: rigid bodies, shapes, and trigger volumes.
//!
//! [`PhysicsManager`] owns the simulation. Entities live in a caller-owned
//! [`World`]; the manager attaches rigid bodies and shapes to them, steps a
//! fixed-step [`DynamicsWorld`], and runs trigger volumes that report each
//! observed body's Enter / Retain / Leave transitions exactly once.
//! Triggers are addressed through revocable [`TriggerLease`] handles.

pub mod collision;
pub mod component;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod entity;
pub mod error;
pub mod events;
pub mod gameplay;
pub mod manager;
pub mod shape;
pub mod trigger;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Mat4, Quat, Vec3};

pub use collision::{ContactManifold, ContactResultCallback, ManifoldPoint};
pub use component::{RigidBody, RigidBodyDocument, ShapeComponent};
pub use config::PhysicsConfig;
pub use crate::core::{
    body::Body,
    types::{MassProperties, Material, Transform, Velocity},
};
pub use entity::{Component, ComponentContainer, Entity, World};
pub use error::{PhysicsError, Result};
pub use events::{
    register_trigger, register_trigger_event, register_trigger_leave, register_trigger_retain,
    TriggerEvent, TriggerEventQueue,
};
pub use gameplay::{EventBinding, EventKind, FiredEvent, TriggerRepeat, TriggerRepeatConfig};
pub use manager::{CommandQueue, PhysicsManager, RigidBodyView, TriggerCommand};
pub use shape::{Cone, Cuboid, Cylinder, Plane, Shape, ShapeKind, ShapeParams, Sphere};
pub use trigger::{
    IntersectionPhase, Trigger, TriggerCallback, TriggerContact, TriggerHandler, TriggerObserver,
};
pub use utils::{
    allocator::{Arena, BodyHandle, EntityId, GenerationalId, TriggerLease},
    logging::StepProfile,
};
pub use world::DynamicsWorld;
