//! [`PhysicsManager`]: the single owner of simulation state.
//!
//! Entities are identified by [`EntityId`] and live in a caller-owned
//! [`World`]; the manager keeps the rigid body and shape components, the
//! dynamics world, and the trigger lease table. Trigger handlers cannot call
//! back into the manager, so they talk to it through a [`CommandQueue`] that
//! is applied at the start of the next [`PhysicsManager::update`].

use std::{fmt, sync::Arc, time::Instant};

use glam::{Quat, Vec3};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    component::{RigidBody, RigidBodyDocument, ShapeComponent},
    config::{PhysicsConfig, DEFAULT_MASS},
    core::{
        body::Body,
        types::{Transform, Velocity},
    },
    entity::{Component, ComponentContainer, World},
    error::{PhysicsError, Result},
    shape::Shape,
    trigger::{IntersectionPhase, Trigger, TriggerCallback, TriggerContact, TriggerHandler},
    utils::{
        allocator::{Arena, BodyHandle, EntityId, TriggerLease},
        logging::{warn_if_frame_budget_exceeded, ScopedTimer, StepProfile},
    },
    world::DynamicsWorld,
};

/// Request queued from inside a trigger handler or another thread.
pub enum TriggerCommand {
    Register {
        lease: TriggerLease,
        entity: EntityId,
        callback: TriggerCallback,
        handler: TriggerHandler,
    },
    Forget {
        lease: TriggerLease,
        entity: EntityId,
        callback: TriggerCallback,
    },
    Release {
        lease: TriggerLease,
    },
}

impl fmt::Debug for TriggerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerCommand::Register {
                lease,
                entity,
                callback,
                ..
            } => f
                .debug_struct("Register")
                .field("lease", lease)
                .field("entity", entity)
                .field("callback", callback)
                .finish_non_exhaustive(),
            TriggerCommand::Forget {
                lease,
                entity,
                callback,
            } => f
                .debug_struct("Forget")
                .field("lease", lease)
                .field("entity", entity)
                .field("callback", callback)
                .finish(),
            TriggerCommand::Release { lease } => {
                f.debug_struct("Release").field("lease", lease).finish()
            }
        }
    }
}

/// Cloneable handle for deferring trigger changes to the next update.
#[derive(Clone, Default)]
pub struct CommandQueue {
    pending: Arc<Mutex<Vec<TriggerCommand>>>,
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("pending", &self.len())
            .finish()
    }
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: TriggerCommand) {
        self.pending.lock().push(command);
    }

    pub fn on_trigger_enter(
        &self,
        lease: TriggerLease,
        entity: EntityId,
        handler: impl FnMut(&TriggerContact) + Send + 'static,
    ) {
        self.register(lease, entity, TriggerCallback::Enter, Box::new(handler));
    }

    pub fn on_trigger_retain(
        &self,
        lease: TriggerLease,
        entity: EntityId,
        handler: impl FnMut(&TriggerContact) + Send + 'static,
    ) {
        self.register(lease, entity, TriggerCallback::Retain, Box::new(handler));
    }

    pub fn on_trigger_leave(
        &self,
        lease: TriggerLease,
        entity: EntityId,
        handler: impl FnMut(&TriggerContact) + Send + 'static,
    ) {
        self.register(lease, entity, TriggerCallback::Leave, Box::new(handler));
    }

    pub fn register(
        &self,
        lease: TriggerLease,
        entity: EntityId,
        callback: TriggerCallback,
        handler: TriggerHandler,
    ) {
        self.push(TriggerCommand::Register {
            lease,
            entity,
            callback,
            handler,
        });
    }

    pub fn forget(&self, lease: TriggerLease, entity: EntityId, callback: TriggerCallback) {
        self.push(TriggerCommand::Forget {
            lease,
            entity,
            callback,
        });
    }

    pub fn release_trigger_volume(&self, lease: TriggerLease) {
        self.push(TriggerCommand::Release { lease });
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn drain(&self) -> Vec<TriggerCommand> {
        std::mem::take(&mut *self.pending.lock())
    }
}

/// Read-only view of a rigid body component and its simulated state.
#[derive(Debug, Clone, Copy)]
pub struct RigidBodyView<'a> {
    component: &'a RigidBody,
    body: &'a Body,
}

impl RigidBodyView<'_> {
    pub fn entity(&self) -> EntityId {
        self.component.entity()
    }

    pub fn handle(&self) -> BodyHandle {
        self.component.handle()
    }

    pub fn mass(&self) -> f32 {
        self.body.mass()
    }

    pub fn friction(&self) -> f32 {
        self.body.material.friction
    }

    pub fn rolling_friction(&self) -> f32 {
        self.body.material.rolling_friction
    }

    pub fn spinning_friction(&self) -> f32 {
        self.body.material.spinning_friction
    }

    pub fn restitution(&self) -> f32 {
        self.body.material.restitution
    }

    pub fn linear_damping(&self) -> f32 {
        self.body.linear_damping
    }

    pub fn angular_damping(&self) -> f32 {
        self.body.angular_damping
    }

    pub fn is_kinematic(&self) -> bool {
        self.body.is_kinematic()
    }

    /// False while the entity is disabled or the component awaits removal.
    pub fn is_enabled(&self) -> bool {
        self.body.is_enabled()
    }

    pub fn gravity_enabled(&self) -> bool {
        self.body.gravity_enabled
    }

    pub fn is_awake(&self) -> bool {
        self.body.is_awake
    }

    pub fn position(&self) -> Vec3 {
        self.body.transform.position
    }

    pub fn rotation(&self) -> Quat {
        self.body.transform.rotation
    }

    pub fn velocity(&self) -> Velocity {
        self.body.velocity
    }

    pub fn shape(&self) -> Option<&Arc<Shape>> {
        self.body.shape()
    }
}

/// Persisted form of a trigger volume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct TriggerDocument {
    transform: Transform,
    shape: Value,
}

/// Owns the dynamics world, physics components, and trigger volumes.
pub struct PhysicsManager {
    config: PhysicsConfig,
    world: DynamicsWorld,
    rigid_bodies: ComponentContainer<RigidBody>,
    shapes: ComponentContainer<ShapeComponent>,
    triggers: Arena<Trigger, TriggerLease>,
    commands: CommandQueue,
    profile: StepProfile,
}

impl Default for PhysicsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsManager {
    pub fn new() -> Self {
        Self::with_config(PhysicsConfig::default())
    }

    pub fn with_config(config: PhysicsConfig) -> Self {
        let config = config.sanitized();
        Self {
            world: DynamicsWorld::new(&config),
            config,
            rigid_bodies: ComponentContainer::new(),
            shapes: ComponentContainer::new(),
            triggers: Arena::new(),
            commands: CommandQueue::new(),
            profile: StepProfile::default(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
        self.world.set_gravity(gravity);
    }

    pub fn dynamics_world(&self) -> &DynamicsWorld {
        &self.world
    }

    /// Toggles the rayon narrowphase. Ignored without the `parallel` feature.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.world.set_parallel_enabled(enabled);
    }

    /// Handle for queueing trigger changes, usable from inside handlers.
    pub fn commands(&self) -> CommandQueue {
        self.commands.clone()
    }

    /// Timings of the latest [`PhysicsManager::update`].
    pub fn profile(&self) -> &StepProfile {
        &self.profile
    }

    /// Synchronises kinematic bodies from their entities, steps the
    /// simulation, then runs every trigger. Queued commands are applied first.
    pub fn update(&mut self, world: &World, dt: f32) {
        let started = Instant::now();
        let mut profile = StepProfile::default();

        self.apply_commands();

        {
            let _timer = ScopedTimer::accumulate("physics::sync", &mut profile.sync_time);
            self.sync_bodies_from_entities(world);
        }

        {
            let _timer = ScopedTimer::accumulate("physics::step", &mut profile.simulation_time);
            profile.sub_steps = self.world.step_simulation(
                dt,
                self.config.max_sub_steps,
                self.config.fixed_time_step,
            );
        }

        {
            let _timer = ScopedTimer::accumulate("physics::triggers", &mut profile.trigger_time);
            for trigger in self.triggers.values_mut() {
                trigger.process(&self.world);
            }
        }

        profile.body_count = self.world.len();
        profile.trigger_count = self.triggers.len();
        profile.observer_count = self
            .triggers
            .values()
            .map(|trigger| trigger.observers().len())
            .sum();
        profile.report();
        self.profile = profile;

        if let Some(budget) = self.config.frame_budget_ms {
            warn_if_frame_budget_exceeded(started.elapsed(), budget);
        }
    }

    /// Copies simulated dynamic transforms back onto their entities.
    pub fn update_entity_transforms(&self, world: &mut World) {
        for component in self.rigid_bodies.iter() {
            if component.is_killed() {
                continue;
            }
            let Some(body) = self.world.body(component.handle()) else {
                continue;
            };
            if !body.is_dynamic() {
                continue;
            }
            let Some(entity) = world.get_mut(component.entity()) else {
                continue;
            };
            if !entity.is_active() {
                continue;
            }
            entity.transform.position = body.transform.position;
            entity.transform.rotation = body.transform.rotation;
        }
    }

    /// Enables only bodies of live components on active entities, then copies
    /// entity transforms onto kinematic bodies and pending forced syncs.
    fn sync_bodies_from_entities(&mut self, world: &World) {
        for component in self.rigid_bodies.iter_mut() {
            let Some(body) = self.world.body_mut(component.handle()) else {
                continue;
            };
            let entity = world
                .get(component.entity())
                .filter(|entity| entity.is_active());
            let entity = match entity {
                Some(entity) if !component.is_killed() => entity,
                _ => {
                    body.set_enabled(false);
                    continue;
                }
            };
            body.set_enabled(true);

            let forced = component.take_transform_sync();
            if !body.is_kinematic() && !forced {
                continue;
            }
            let target = entity.transform.rigid();
            if forced || body.transform != target {
                body.set_world_transform(&target);
            }
        }
    }

    fn apply_commands(&mut self) {
        for command in self.commands.drain() {
            let outcome = match command {
                TriggerCommand::Register {
                    lease,
                    entity,
                    callback,
                    handler,
                } => self.register(lease, entity, callback, handler),
                TriggerCommand::Forget {
                    lease,
                    entity,
                    callback,
                } => self.forget(lease, entity, callback),
                TriggerCommand::Release { lease } => self.release_trigger_volume(lease),
            };
            if let Err(error) = outcome {
                log::debug!("dropped queued trigger command: {error}");
            }
        }
    }

    // Rigid bodies

    pub fn create_rigid_body(&mut self, world: &World, owner: EntityId) -> BodyHandle {
        self.create_rigid_body_with_mass(world, owner, DEFAULT_MASS)
    }

    /// Creates the body at the entity's transform, using the entity's shape
    /// if it has one. Replaces any previous body of the same owner.
    pub fn create_rigid_body_with_mass(&mut self, world: &World, owner: EntityId, mass: f32) -> BodyHandle {
        let transform = match world.get(owner) {
            Some(entity) => entity.transform,
            None => {
                log::warn!("creating rigid body for unknown entity {owner:?}");
                Transform::default()
            }
        };
        let shape = self
            .shapes
            .get_by_owner(owner)
            .and_then(|component| component.shape().cloned());

        let handle = self.world.add_body(
            Body::new(owner, mass)
                .with_shape(shape)
                .with_transform(transform),
        );

        if let Some(previous) = self.rigid_bodies.create(RigidBody::new(owner, handle)) {
            self.world.remove_body(previous.handle());
        }
        for trigger in self.triggers.values_mut() {
            if let Some(observer) = trigger.observer_mut(owner) {
                observer.rebind(handle);
            }
        }
        handle
    }

    /// Creates a rigid body from its persisted node. A malformed node logs a
    /// warning and yields a default body.
    pub fn create_rigid_body_from_json(&mut self, world: &World, owner: EntityId, node: &Value) -> BodyHandle {
        let document = match RigidBodyDocument::deserialize(node) {
            Ok(document) => document,
            Err(error) => {
                log::warn!("invalid rigid body node for {owner:?}: {error}");
                RigidBodyDocument::default()
            }
        };

        let handle = self.create_rigid_body_with_mass(world, owner, document.mass);
        if let Some(body) = self.world.body_mut(handle) {
            document.apply(body);
        }
        handle
    }

    /// `Ok(None)` when the owner has no rigid body.
    pub fn save_rigid_body(&self, owner: EntityId) -> Result<Option<Value>> {
        let Some(body) = self
            .rigid_bodies
            .get_by_owner(owner)
            .and_then(|component| self.world.body(component.handle()))
        else {
            return Ok(None);
        };
        Ok(Some(serde_json::to_value(RigidBodyDocument::capture(body))?))
    }

    pub fn rigid_body(&self, owner: EntityId) -> Option<RigidBodyView<'_>> {
        let component = self.rigid_bodies.get_by_owner(owner)?;
        let body = self.world.body(component.handle())?;
        Some(RigidBodyView { component, body })
    }

    pub fn rigid_body_components(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.rigid_bodies.iter()
    }

    fn with_body(&mut self, owner: EntityId, operation: &str, apply: impl FnOnce(&mut Body)) {
        let body = self
            .rigid_bodies
            .get_by_owner(owner)
            .and_then(|component| self.world.body_mut(component.handle()));
        match body {
            Some(body) => apply(body),
            None => log::warn!("{operation}: {owner:?} has no rigid body"),
        }
    }

    pub fn set_mass(&mut self, owner: EntityId, mass: f32) {
        self.with_body(owner, "set_mass", |body| body.set_mass(mass));
    }

    pub fn set_friction(&mut self, owner: EntityId, friction: f32) {
        self.with_body(owner, "set_friction", |body| body.material.friction = friction);
    }

    pub fn set_rolling_friction(&mut self, owner: EntityId, friction: f32) {
        self.with_body(owner, "set_rolling_friction", |body| {
            body.material.rolling_friction = friction
        });
    }

    pub fn set_spinning_friction(&mut self, owner: EntityId, friction: f32) {
        self.with_body(owner, "set_spinning_friction", |body| {
            body.material.spinning_friction = friction
        });
    }

    pub fn set_restitution(&mut self, owner: EntityId, restitution: f32) {
        self.with_body(owner, "set_restitution", |body| {
            body.material.restitution = restitution
        });
    }

    pub fn set_linear_damping(&mut self, owner: EntityId, damping: f32) {
        self.with_body(owner, "set_linear_damping", |body| body.linear_damping = damping);
    }

    pub fn set_angular_damping(&mut self, owner: EntityId, damping: f32) {
        self.with_body(owner, "set_angular_damping", |body| body.angular_damping = damping);
    }

    /// Hands the body's motion to its entity transform. Velocity and forces
    /// are cleared and gravity stops acting on it.
    pub fn make_kinematic(&mut self, owner: EntityId) {
        self.with_body(owner, "make_kinematic", Body::make_kinematic);
    }

    /// Returns the body to the integrator with gravity enabled.
    pub fn make_dynamic(&mut self, owner: EntityId) {
        self.with_body(owner, "make_dynamic", Body::make_dynamic);
    }

    /// Copies the entity transform onto the body at the next update, once.
    pub fn force_transform_sync(&mut self, owner: EntityId) {
        match self.rigid_bodies.get_by_owner_mut(owner) {
            Some(component) => component.request_transform_sync(),
            None => log::warn!("force_transform_sync: {owner:?} has no rigid body"),
        }
    }

    /// Zeroes the body's velocity immediately.
    pub fn halt_movement(&mut self, owner: EntityId) {
        self.with_body(owner, "halt_movement", Body::halt);
    }

    // Shapes

    /// Gives `owner` a shape component, updating its body's geometry if it
    /// already has one.
    pub fn create_shape(&mut self, owner: EntityId, shape: Shape) -> Arc<Shape> {
        let shape = Arc::new(shape);
        self.install_shape(owner, Some(Arc::clone(&shape)));
        shape
    }

    /// Loads a shape component from its persisted node. An unknown or absent
    /// variant leaves the shape unset and logs a warning.
    pub fn create_shape_from_json(&mut self, owner: EntityId, node: &Value) -> Option<Arc<Shape>> {
        let shape = match Shape::from_json(node) {
            Ok(shape) => Some(Arc::new(shape)),
            Err(error) => {
                log::warn!("shape of {owner:?} left unset: {error}");
                None
            }
        };
        self.install_shape(owner, shape.clone());
        shape
    }

    /// Replaces the shape of an existing component and its body's geometry.
    /// Mass and body identity are kept.
    pub fn set_shape(&mut self, owner: EntityId, shape: Shape) -> Arc<Shape> {
        if self.shapes.get_by_owner(owner).is_none() {
            log::debug!("set_shape: creating shape component for {owner:?}");
        }
        self.create_shape(owner, shape)
    }

    fn install_shape(&mut self, owner: EntityId, shape: Option<Arc<Shape>>) {
        match self.shapes.get_by_owner_mut(owner) {
            Some(component) => component.set_shape(shape.clone()),
            None => {
                self.shapes.create(ShapeComponent::new(owner, shape.clone()));
            }
        }
        if let Some(component) = self.rigid_bodies.get_by_owner(owner) {
            if let Some(body) = self.world.body_mut(component.handle()) {
                body.set_shape(shape);
            }
        }
    }

    pub fn shape(&self, owner: EntityId) -> Option<Arc<Shape>> {
        self.shapes
            .get_by_owner(owner)
            .and_then(|component| component.shape().cloned())
    }

    /// `None` without a component; an unset shape saves as `null`.
    pub fn save_shape(&self, owner: EntityId) -> Option<Value> {
        let component = self.shapes.get_by_owner(owner)?;
        Some(component.shape().map(|shape| shape.to_json()).unwrap_or(Value::Null))
    }

    pub fn shape_components(&self) -> impl Iterator<Item = &ShapeComponent> + '_ {
        self.shapes.iter()
    }

    // Component lifetime

    /// Marks the owner's physics components for removal.
    pub fn kill_components(&mut self, owner: EntityId) {
        self.rigid_bodies.kill(owner);
        self.shapes.kill(owner);
    }

    /// Frees killed components, and those of killed or missing entities.
    /// Bodies leave the dynamics world before their component is dropped, and
    /// observers of removed bodies are discarded without a leave callback.
    pub fn clear_killed_components(&mut self, world: &World) {
        let doomed = |owner: EntityId| world.get(owner).map_or(true, |entity| entity.is_killed());

        let mut removed = Vec::new();
        let dynamics = &mut self.world;
        self.rigid_bodies.reap(
            |component| doomed(component.entity()),
            |component| {
                dynamics.remove_body(component.handle());
                removed.push(component.entity());
            },
        );
        self.shapes.reap(|component| doomed(component.entity()), |_| {});

        if removed.is_empty() {
            return;
        }
        for trigger in self.triggers.values_mut() {
            let purged = trigger.purge_observers(|observer| removed.contains(&observer.entity()));
            if purged > 0 {
                log::debug!("purged {purged} observers from {:?}", trigger.lease());
            }
        }
    }

    // Triggers

    /// Creates a trigger volume at the origin. Without a shape it stays inert
    /// until [`PhysicsManager::set_trigger_shape`] gives it one.
    pub fn create_trigger(&mut self, shape: Option<Arc<Shape>>) -> TriggerLease {
        let lease = self
            .triggers
            .insert_with(|lease| Trigger::new(lease, shape));
        log::debug!("created trigger {lease:?}");
        lease
    }

    /// Loads a trigger from `{ "transform": .., "shape": .. }`. A bad shape
    /// node leaves the trigger inert.
    pub fn create_trigger_from_json(&mut self, node: &Value) -> TriggerLease {
        let document = match TriggerDocument::deserialize(node) {
            Ok(document) => document,
            Err(error) => {
                log::warn!("invalid trigger node: {error}");
                TriggerDocument::default()
            }
        };
        let shape = match Shape::from_json(&document.shape) {
            Ok(shape) => Some(Arc::new(shape)),
            Err(error) => {
                log::warn!("trigger shape left unset: {error}");
                None
            }
        };
        let lease = self.create_trigger(shape);
        if let Some(trigger) = self.triggers.get_mut(lease) {
            trigger.set_transform(document.transform);
        }
        lease
    }

    pub fn save_trigger(&self, lease: TriggerLease) -> Result<Value> {
        let trigger = self.trigger(lease)?;
        let document = TriggerDocument {
            transform: *trigger.transform(),
            shape: trigger
                .shape()
                .map(|shape| shape.to_json())
                .unwrap_or(Value::Null),
        };
        Ok(serde_json::to_value(document)?)
    }

    pub fn trigger(&self, lease: TriggerLease) -> Result<&Trigger> {
        self.triggers
            .get(lease)
            .ok_or(PhysicsError::RevokedLease(lease))
    }

    fn trigger_mut(&mut self, lease: TriggerLease) -> Result<&mut Trigger> {
        match self.triggers.get_mut(lease) {
            Some(trigger) => Ok(trigger),
            None => {
                log::warn!("{lease:?} used after release");
                Err(PhysicsError::RevokedLease(lease))
            }
        }
    }

    pub fn is_trigger_live(&self, lease: TriggerLease) -> bool {
        self.triggers.contains(lease)
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn set_position(&mut self, lease: TriggerLease, position: Vec3) -> Result<()> {
        self.trigger_mut(lease)?.set_position(position);
        Ok(())
    }

    pub fn set_trigger_transform(&mut self, lease: TriggerLease, transform: Transform) -> Result<()> {
        self.trigger_mut(lease)?.set_transform(transform);
        Ok(())
    }

    pub fn set_trigger_shape(&mut self, lease: TriggerLease, shape: Option<Arc<Shape>>) -> Result<()> {
        self.trigger_mut(lease)?.set_shape(shape);
        Ok(())
    }

    pub fn on_trigger_enter(
        &mut self,
        lease: TriggerLease,
        entity: EntityId,
        handler: impl FnMut(&TriggerContact) + Send + 'static,
    ) -> Result<()> {
        self.register(lease, entity, TriggerCallback::Enter, Box::new(handler))
    }

    pub fn on_trigger_retain(
        &mut self,
        lease: TriggerLease,
        entity: EntityId,
        handler: impl FnMut(&TriggerContact) + Send + 'static,
    ) -> Result<()> {
        self.register(lease, entity, TriggerCallback::Retain, Box::new(handler))
    }

    pub fn on_trigger_leave(
        &mut self,
        lease: TriggerLease,
        entity: EntityId,
        handler: impl FnMut(&TriggerContact) + Send + 'static,
    ) -> Result<()> {
        self.register(lease, entity, TriggerCallback::Leave, Box::new(handler))
    }

    /// Installs `handler` in one slot of the observer for `entity`, creating
    /// the observer on first use. A handler already in the slot is replaced.
    pub fn register(
        &mut self,
        lease: TriggerLease,
        entity: EntityId,
        callback: TriggerCallback,
        handler: TriggerHandler,
    ) -> Result<()> {
        if !self.triggers.contains(lease) {
            log::warn!("registering on released {lease:?}");
            return Err(PhysicsError::RevokedLease(lease));
        }
        let body = self.live_body_of(entity)?;

        self.trigger_mut(lease)?
            .observer_or_insert(entity, body)
            .set_handler(callback, handler);
        Ok(())
    }

    /// Tracks `entity` against the trigger without installing a handler, so
    /// its phase can be polled through [`PhysicsManager::observer_phase`].
    pub fn observe_trigger(&mut self, lease: TriggerLease, entity: EntityId) -> Result<()> {
        self.trigger(lease)?;
        let body = self.live_body_of(entity)?;
        self.trigger_mut(lease)?.observer_or_insert(entity, body);
        Ok(())
    }

    fn live_body_of(&self, entity: EntityId) -> Result<BodyHandle> {
        self.rigid_bodies
            .get_by_owner(entity)
            .filter(|component| !component.is_killed())
            .map(RigidBody::handle)
            .ok_or(PhysicsError::MissingBody(entity))
    }

    pub fn forget_trigger_enter(&mut self, lease: TriggerLease, entity: EntityId) -> Result<()> {
        self.forget(lease, entity, TriggerCallback::Enter)
    }

    pub fn forget_trigger_retain(&mut self, lease: TriggerLease, entity: EntityId) -> Result<()> {
        self.forget(lease, entity, TriggerCallback::Retain)
    }

    pub fn forget_trigger_leave(&mut self, lease: TriggerLease, entity: EntityId) -> Result<()> {
        self.forget(lease, entity, TriggerCallback::Leave)
    }

    /// Empties one handler slot. The observer itself keeps tracking its phase.
    pub fn forget(&mut self, lease: TriggerLease, entity: EntityId, callback: TriggerCallback) -> Result<()> {
        if let Some(observer) = self.trigger_mut(lease)?.observer_mut(entity) {
            observer.clear_handler(callback);
        }
        Ok(())
    }

    /// Phase of `entity` relative to the trigger; `None` when unobserved.
    pub fn observer_phase(&self, lease: TriggerLease, entity: EntityId) -> Result<IntersectionPhase> {
        Ok(self
            .trigger(lease)?
            .observer(entity)
            .map_or(IntersectionPhase::None, |observer| observer.phase()))
    }

    /// Destroys the trigger. Every copy of `lease` is dead afterwards and a
    /// second release reports [`PhysicsError::RevokedLease`].
    pub fn release_trigger_volume(&mut self, lease: TriggerLease) -> Result<()> {
        match self.triggers.remove(lease) {
            Some(_) => {
                log::debug!("released trigger {lease:?}");
                Ok(())
            }
            None => {
                log::warn!("{lease:?} released twice");
                Err(PhysicsError::RevokedLease(lease))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scene() -> (World, PhysicsManager, EntityId) {
        let mut world = World::new();
        let entity = world.create_entity_at("ball", Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
        let mut manager = PhysicsManager::new();
        manager.create_shape(entity, Shape::sphere(0.5));
        manager.create_rigid_body(&world, entity);
        (world, manager, entity)
    }

    #[test]
    fn body_starts_at_entity_transform_with_shape() {
        let (_world, manager, entity) = scene();
        let view = manager.rigid_body(entity).expect("body created");
        assert_eq!(view.position(), Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(view.mass(), DEFAULT_MASS);
        assert!(view.shape().is_some());
    }

    #[test]
    fn recreating_body_replaces_old_one() {
        let (world, mut manager, entity) = scene();
        let first = manager.rigid_body(entity).map(|view| view.handle());
        manager.create_rigid_body_with_mass(&world, entity, 4.0);
        assert_eq!(manager.dynamics_world().len(), 1);
        assert_ne!(manager.rigid_body(entity).map(|view| view.handle()), first);
        assert_eq!(manager.rigid_body(entity).map(|view| view.mass()), Some(4.0));
    }

    #[test]
    fn queued_registration_waits_for_next_update() {
        let (world, mut manager, entity) = scene();
        let lease = manager.create_trigger(Some(Arc::new(Shape::sphere(5.0))));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        manager
            .commands()
            .on_trigger_enter(lease, entity, move |_contact: &TriggerContact| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        assert_eq!(manager.commands().len(), 1);

        manager.update(&world, 1.0 / 60.0);
        assert!(manager.commands().is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queued_release_revokes_lease() {
        let (world, mut manager, _entity) = scene();
        let lease = manager.create_trigger(None);
        manager.commands().release_trigger_volume(lease);
        assert!(manager.is_trigger_live(lease));
        manager.update(&world, 1.0 / 60.0);
        assert!(!manager.is_trigger_live(lease));
    }

    #[test]
    fn setters_without_body_are_ignored() {
        let mut manager = PhysicsManager::new();
        let stranger = EntityId::from_index(42);
        manager.set_mass(stranger, 3.0);
        manager.make_kinematic(stranger);
        assert!(manager.rigid_body(stranger).is_none());
    }

    #[test]
    fn profile_counts_population() {
        let (world, mut manager, _entity) = scene();
        manager.create_trigger(None);
        manager.update(&world, 1.0 / 60.0);
        let profile = manager.profile();
        assert_eq!(profile.sub_steps, 1);
        assert_eq!(profile.body_count, 1);
        assert_eq!(profile.trigger_count, 1);
    }
}
