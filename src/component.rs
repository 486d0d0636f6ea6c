use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING, DEFAULT_MASS},
    core::{body::Body, types::Material},
    entity::Component,
    shape::Shape,
    utils::allocator::{BodyHandle, EntityId},
};

/// Links an entity to its simulated body. Motion state, including the
/// kinematic flag, lives on the [`Body`] itself.
#[derive(Debug, Clone)]
pub struct RigidBody {
    entity: EntityId,
    handle: BodyHandle,
    /// One-shot request to copy the entity transform onto a dynamic body.
    force_transform_sync: bool,
    killed: bool,
}

impl RigidBody {
    pub(crate) fn new(entity: EntityId, handle: BodyHandle) -> Self {
        Self {
            entity,
            handle,
            force_transform_sync: false,
            killed: false,
        }
    }

    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    pub fn wants_transform_sync(&self) -> bool {
        self.force_transform_sync
    }

    pub(crate) fn request_transform_sync(&mut self) {
        self.force_transform_sync = true;
    }

    /// Consumes the sync request, returning whether one was pending.
    pub(crate) fn take_transform_sync(&mut self) -> bool {
        std::mem::take(&mut self.force_transform_sync)
    }
}

impl Component for RigidBody {
    fn entity(&self) -> EntityId {
        self.entity
    }

    fn is_killed(&self) -> bool {
        self.killed
    }

    fn kill(&mut self) {
        self.killed = true;
    }
}

/// Holds the shared collision shape of an entity. `None` means unset.
#[derive(Debug, Clone)]
pub struct ShapeComponent {
    entity: EntityId,
    shape: Option<Arc<Shape>>,
    killed: bool,
}

impl ShapeComponent {
    pub(crate) fn new(entity: EntityId, shape: Option<Arc<Shape>>) -> Self {
        Self {
            entity,
            shape,
            killed: false,
        }
    }

    pub fn shape(&self) -> Option<&Arc<Shape>> {
        self.shape.as_ref()
    }

    pub(crate) fn set_shape(&mut self, shape: Option<Arc<Shape>>) {
        self.shape = shape;
    }
}

impl Component for ShapeComponent {
    fn entity(&self) -> EntityId {
        self.entity
    }

    fn is_killed(&self) -> bool {
        self.killed
    }

    fn kill(&mut self) {
        self.killed = true;
    }
}

/// Persisted form of a rigid body. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RigidBodyDocument {
    pub mass: f32,
    pub friction: f32,
    pub rolling_friction: f32,
    pub spinning_friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub kinematic: bool,
}

impl Default for RigidBodyDocument {
    fn default() -> Self {
        let material = Material::default();
        Self {
            mass: DEFAULT_MASS,
            friction: material.friction,
            rolling_friction: material.rolling_friction,
            spinning_friction: material.spinning_friction,
            restitution: material.restitution,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            kinematic: false,
        }
    }
}

impl RigidBodyDocument {
    pub fn capture(body: &Body) -> Self {
        Self {
            mass: body.mass(),
            friction: body.material.friction,
            rolling_friction: body.material.rolling_friction,
            spinning_friction: body.material.spinning_friction,
            restitution: body.material.restitution,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            kinematic: body.is_kinematic(),
        }
    }

    /// Writes every persisted property onto `body`.
    pub fn apply(&self, body: &mut Body) {
        body.set_mass(self.mass);
        body.material = Material {
            friction: self.friction,
            rolling_friction: self.rolling_friction,
            spinning_friction: self.spinning_friction,
            restitution: self.restitution,
        };
        body.linear_damping = self.linear_damping;
        body.angular_damping = self.angular_damping;
        if self.kinematic {
            body.make_kinematic();
        } else if body.is_kinematic() {
            body.make_dynamic();
        }
    }
}
