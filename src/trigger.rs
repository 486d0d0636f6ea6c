//! Trigger volumes and the per-body intersection state machine.

use std::{collections::HashMap, fmt, ops::ControlFlow, sync::Arc};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    collision::contact::{ContactResultCallback, ManifoldPoint},
    core::types::Transform,
    shape::Shape,
    utils::allocator::{BodyHandle, EntityId, TriggerLease},
    world::DynamicsWorld,
};

/// Relation of an observed body to a trigger volume for the latest step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntersectionPhase {
    /// Started intersecting this step.
    Enter,
    /// Still intersecting after a previous enter.
    Retained,
    /// Stopped intersecting this step.
    Leave,
    #[default]
    None,
}

impl IntersectionPhase {
    /// Phase after a step in which the body did or did not touch the trigger.
    /// `Leave` always decays to `None`, even when touching again.
    pub fn next(self, contact: bool) -> Self {
        match (self, contact) {
            (IntersectionPhase::None, true) => IntersectionPhase::Enter,
            (IntersectionPhase::None, false) => IntersectionPhase::None,
            (IntersectionPhase::Enter | IntersectionPhase::Retained, true) => {
                IntersectionPhase::Retained
            }
            (IntersectionPhase::Enter | IntersectionPhase::Retained, false) => {
                IntersectionPhase::Leave
            }
            (IntersectionPhase::Leave, _) => IntersectionPhase::None,
        }
    }

    /// Callback slot fired on arriving in this phase, if any.
    pub fn callback(self) -> Option<TriggerCallback> {
        match self {
            IntersectionPhase::Enter => Some(TriggerCallback::Enter),
            IntersectionPhase::Retained => Some(TriggerCallback::Retain),
            IntersectionPhase::Leave => Some(TriggerCallback::Leave),
            IntersectionPhase::None => None,
        }
    }
}

/// Which handler slot of an observer is addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerCallback {
    Enter,
    Retain,
    Leave,
}

/// Passed to trigger handlers when they fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerContact {
    pub trigger: TriggerLease,
    pub entity: EntityId,
    pub body: BodyHandle,
    pub phase: IntersectionPhase,
}

/// Handler run synchronously inside the trigger pass. It cannot reach the
/// manager; changes are requested through a [`crate::manager::CommandQueue`].
pub type TriggerHandler = Box<dyn FnMut(&TriggerContact) + Send>;

/// Tracks one body against one trigger and holds its three handler slots.
pub struct TriggerObserver {
    entity: EntityId,
    body: BodyHandle,
    phase: IntersectionPhase,
    did_contact: bool,
    on_enter: Option<TriggerHandler>,
    on_retain: Option<TriggerHandler>,
    on_leave: Option<TriggerHandler>,
}

impl fmt::Debug for TriggerObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerObserver")
            .field("entity", &self.entity)
            .field("body", &self.body)
            .field("phase", &self.phase)
            .field("did_contact", &self.did_contact)
            .field("on_enter", &self.on_enter.is_some())
            .field("on_retain", &self.on_retain.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .finish()
    }
}

impl TriggerObserver {
    pub fn new(entity: EntityId, body: BodyHandle) -> Self {
        Self {
            entity,
            body,
            phase: IntersectionPhase::None,
            did_contact: false,
            on_enter: None,
            on_retain: None,
            on_leave: None,
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub(crate) fn rebind(&mut self, body: BodyHandle) {
        self.body = body;
    }

    pub fn phase(&self) -> IntersectionPhase {
        self.phase
    }

    fn slot(&mut self, callback: TriggerCallback) -> &mut Option<TriggerHandler> {
        match callback {
            TriggerCallback::Enter => &mut self.on_enter,
            TriggerCallback::Retain => &mut self.on_retain,
            TriggerCallback::Leave => &mut self.on_leave,
        }
    }

    /// Installs `handler`, replacing whatever occupied the slot.
    pub fn set_handler(&mut self, callback: TriggerCallback, handler: TriggerHandler) {
        *self.slot(callback) = Some(handler);
    }

    pub fn clear_handler(&mut self, callback: TriggerCallback) -> bool {
        self.slot(callback).take().is_some()
    }

    pub fn has_handler(&self, callback: TriggerCallback) -> bool {
        match callback {
            TriggerCallback::Enter => self.on_enter.is_some(),
            TriggerCallback::Retain => self.on_retain.is_some(),
            TriggerCallback::Leave => self.on_leave.is_some(),
        }
    }

    pub fn handler_count(&self) -> usize {
        [&self.on_enter, &self.on_retain, &self.on_leave]
            .into_iter()
            .filter(|slot| slot.is_some())
            .count()
    }

    pub(crate) fn mark_contact(&mut self) {
        self.did_contact = true;
    }

    /// Turns this step's contact flag into the next phase and runs the
    /// matching handler.
    pub fn post_intersection_test(&mut self, trigger: TriggerLease) -> IntersectionPhase {
        self.phase = self.phase.next(std::mem::take(&mut self.did_contact));

        if let Some(callback) = self.phase.callback() {
            let contact = TriggerContact {
                trigger,
                entity: self.entity,
                body: self.body,
                phase: self.phase,
            };
            if let Some(handler) = self.slot(callback) {
                handler(&contact);
            }
        }
        self.phase
    }
}

/// Collects which observed bodies touched the trigger during one test.
struct ObserverContacts<'a> {
    observers: &'a mut [TriggerObserver],
    by_body: HashMap<BodyHandle, usize>,
}

impl ContactResultCallback for ObserverContacts<'_> {
    fn needs_collision(&self, body: BodyHandle) -> bool {
        self.by_body
            .get(&body)
            .is_some_and(|&index| !self.observers[index].did_contact)
    }

    fn add_single_result(&mut self, body: BodyHandle, _point: &ManifoldPoint) -> ControlFlow<()> {
        if let Some(&index) = self.by_body.get(&body) {
            self.observers[index].mark_contact();
        }
        ControlFlow::Break(())
    }
}

/// Non-colliding volume reporting bodies that overlap it.
#[derive(Debug)]
pub struct Trigger {
    lease: TriggerLease,
    transform: Transform,
    shape: Option<Arc<Shape>>,
    observers: Vec<TriggerObserver>,
}

impl Trigger {
    /// Starts at the origin. Without a shape the trigger never reports contact.
    pub fn new(lease: TriggerLease, shape: Option<Arc<Shape>>) -> Self {
        Self {
            lease,
            transform: Transform::default(),
            shape,
            observers: Vec::new(),
        }
    }

    pub fn lease(&self) -> TriggerLease {
        self.lease
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn shape(&self) -> Option<&Arc<Shape>> {
        self.shape.as_ref()
    }

    pub fn set_shape(&mut self, shape: Option<Arc<Shape>>) {
        self.shape = shape;
    }

    pub fn observer(&self, entity: EntityId) -> Option<&TriggerObserver> {
        self.observers.iter().find(|observer| observer.entity == entity)
    }

    pub fn observer_mut(&mut self, entity: EntityId) -> Option<&mut TriggerObserver> {
        self.observers
            .iter_mut()
            .find(|observer| observer.entity == entity)
    }

    /// Observer for `entity`, created on first use. An existing observer is
    /// pointed at `body` in case the entity's body was replaced.
    pub fn observer_or_insert(&mut self, entity: EntityId, body: BodyHandle) -> &mut TriggerObserver {
        let index = match self.observers.iter().position(|o| o.entity == entity) {
            Some(index) => index,
            None => {
                self.observers.push(TriggerObserver::new(entity, body));
                self.observers.len() - 1
            }
        };
        let observer = &mut self.observers[index];
        observer.rebind(body);
        observer
    }

    pub fn observers(&self) -> &[TriggerObserver] {
        &self.observers
    }

    pub fn observers_mut(&mut self) -> impl Iterator<Item = &mut TriggerObserver> + '_ {
        self.observers.iter_mut()
    }

    /// Drops observers without running any handler. Returns how many went.
    pub fn purge_observers(&mut self, mut doomed: impl FnMut(&TriggerObserver) -> bool) -> usize {
        let before = self.observers.len();
        self.observers.retain(|observer| !doomed(observer));
        before - self.observers.len()
    }

    /// Tests the volume against the world and advances every observer.
    /// Handlers fire in registration order.
    pub fn process(&mut self, world: &DynamicsWorld) {
        if self.observers.is_empty() {
            return;
        }

        if let Some(shape) = self.shape.as_deref() {
            let by_body = self
                .observers
                .iter()
                .enumerate()
                .map(|(index, observer)| (observer.body, index))
                .collect();
            let mut collector = ObserverContacts {
                observers: &mut self.observers,
                by_body,
            };
            world.contact_pair_test(shape.geometry(), &self.transform, &mut collector);
        }

        let lease = self.lease;
        for observer in &mut self.observers {
            observer.post_intersection_test(lease);
        }
    }
}
