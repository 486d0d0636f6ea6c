//! Bridges trigger handlers to script code that polls once per frame.

use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::{
    error::Result,
    manager::PhysicsManager,
    trigger::{TriggerCallback, TriggerContact},
    utils::allocator::{EntityId, TriggerLease},
};

/// An intersection waiting to be dispatched to a script method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub trigger: TriggerLease,
    /// Which transition produced the event.
    pub callback: TriggerCallback,
    pub collided_entity: EntityId,
    pub script_entity: EntityId,
    pub method_name: String,
}

/// Shared queue filled during the trigger pass and drained by the consumer.
#[derive(Clone, Default)]
pub struct TriggerEventQueue {
    events: Arc<Mutex<Vec<TriggerEvent>>>,
}

impl fmt::Debug for TriggerEventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerEventQueue")
            .field("queued", &self.len())
            .finish()
    }
}

impl TriggerEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: TriggerEvent) {
        self.events.lock().push(event);
    }

    /// Takes every queued event, leaving the queue empty.
    pub fn drain(&self) -> Vec<TriggerEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Makes `observed` entering `lease` enqueue a call to `method_name` on
/// `script_entity`.
pub fn register_trigger(
    manager: &mut PhysicsManager,
    queue: &TriggerEventQueue,
    lease: TriggerLease,
    observed: EntityId,
    script_entity: EntityId,
    method_name: impl Into<String>,
) -> Result<()> {
    register_trigger_event(
        manager,
        queue,
        lease,
        TriggerCallback::Enter,
        observed,
        script_entity,
        method_name,
    )
}

pub fn register_trigger_retain(
    manager: &mut PhysicsManager,
    queue: &TriggerEventQueue,
    lease: TriggerLease,
    observed: EntityId,
    script_entity: EntityId,
    method_name: impl Into<String>,
) -> Result<()> {
    register_trigger_event(
        manager,
        queue,
        lease,
        TriggerCallback::Retain,
        observed,
        script_entity,
        method_name,
    )
}

pub fn register_trigger_leave(
    manager: &mut PhysicsManager,
    queue: &TriggerEventQueue,
    lease: TriggerLease,
    observed: EntityId,
    script_entity: EntityId,
    method_name: impl Into<String>,
) -> Result<()> {
    register_trigger_event(
        manager,
        queue,
        lease,
        TriggerCallback::Leave,
        observed,
        script_entity,
        method_name,
    )
}

/// Installs the `callback` slot of the observer so each firing enqueues a
/// [`TriggerEvent`]. Replaces any handler already in that slot.
pub fn register_trigger_event(
    manager: &mut PhysicsManager,
    queue: &TriggerEventQueue,
    lease: TriggerLease,
    callback: TriggerCallback,
    observed: EntityId,
    script_entity: EntityId,
    method_name: impl Into<String>,
) -> Result<()> {
    let queue = queue.clone();
    let method_name = method_name.into();
    let handler = move |contact: &TriggerContact| {
        queue.push(TriggerEvent {
            trigger: contact.trigger,
            callback,
            collided_entity: contact.entity,
            script_entity,
            method_name: method_name.clone(),
        });
    };
    manager.register(lease, observed, callback, Box::new(handler))
}
