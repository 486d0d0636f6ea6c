use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::Result,
    manager::PhysicsManager,
    trigger::IntersectionPhase,
    utils::allocator::{EntityId, TriggerLease},
};

/// Slack allowed when comparing elapsed time against delays and cooldowns.
const TIME_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    OnEnter,
    OnRetain,
    OnLeave,
}

impl EventKind {
    pub fn from_phase(phase: IntersectionPhase) -> Option<Self> {
        match phase {
            IntersectionPhase::Enter => Some(EventKind::OnEnter),
            IntersectionPhase::Retained => Some(EventKind::OnRetain),
            IntersectionPhase::Leave => Some(EventKind::OnLeave),
            IntersectionPhase::None => None,
        }
    }

    fn bit(self) -> u8 {
        match self {
            EventKind::OnEnter => 1,
            EventKind::OnRetain => 2,
            EventKind::OnLeave => 4,
        }
    }
}

/// Script method to call on `target_entity` when `kind` happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBinding {
    pub kind: EventKind,
    pub target_entity: EntityId,
    pub method: String,
}

/// Editor-authored settings of a repeating trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerRepeatConfig {
    pub name: String,
    /// Seconds between the trigger going off and its events firing.
    pub delay: f32,
    /// Seconds after firing during which new triggers wait.
    pub cooldown: f32,
    /// How many times it may fire; zero means without limit.
    pub charges: u32,
    pub start_active: bool,
    pub bindings: Vec<EventBinding>,
}

impl Default for TriggerRepeatConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            delay: 0.0,
            cooldown: 0.0,
            charges: 0,
            start_active: true,
            bindings: Vec::new(),
        }
    }
}

/// A binding whose event went off.
#[derive(Debug, Clone, PartialEq)]
pub struct FiredEvent {
    pub kind: EventKind,
    pub target_entity: EntityId,
    pub method: String,
    pub collided_entity: Option<EntityId>,
}

#[derive(Debug, Clone, Copy)]
struct PendingFire {
    remaining: f32,
    kinds: u8,
}

/// Trigger that keeps firing its bindings while charges last.
///
/// Each update it reads the observed body's phase, raises the `triggered`
/// flag when a bound transition happened, and turns the flag into fired
/// events once delay and cooldown allow. Repeated transitions while waiting
/// collapse into one pending fire.
#[derive(Debug, Clone)]
pub struct TriggerRepeat {
    config: TriggerRepeatConfig,
    lease: Option<TriggerLease>,
    collided_entity: Option<EntityId>,
    active: bool,
    triggered: bool,
    triggered_kinds: u8,
    pending: Option<PendingFire>,
    cooldown_remaining: f32,
    charges_used: u32,
}

impl Default for TriggerRepeat {
    fn default() -> Self {
        Self::new(TriggerRepeatConfig::default())
    }
}

impl TriggerRepeat {
    pub fn new(config: TriggerRepeatConfig) -> Self {
        Self {
            active: config.start_active,
            config,
            lease: None,
            collided_entity: None,
            triggered: false,
            triggered_kinds: 0,
            pending: None,
            cooldown_remaining: 0.0,
            charges_used: 0,
        }
    }

    pub fn from_json(node: &Value) -> Result<Self> {
        Ok(Self::new(TriggerRepeatConfig::deserialize(node)?))
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.config)?)
    }

    pub fn config(&self) -> &TriggerRepeatConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn lease(&self) -> Option<TriggerLease> {
        self.lease
    }

    pub fn collided_entity(&self) -> Option<EntityId> {
        self.collided_entity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if !active {
            self.triggered = false;
            self.triggered_kinds = 0;
            self.pending = None;
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn charges_used(&self) -> u32 {
        self.charges_used
    }

    /// Charges left, or `None` when unlimited.
    pub fn charges_remaining(&self) -> Option<u32> {
        (self.config.charges > 0).then(|| self.config.charges.saturating_sub(self.charges_used))
    }

    pub fn is_exhausted(&self) -> bool {
        self.config.charges > 0 && self.charges_used >= self.config.charges
    }

    /// Starts watching `collided_entity` against the trigger volume.
    pub fn attach(
        &mut self,
        manager: &mut PhysicsManager,
        lease: TriggerLease,
        collided_entity: EntityId,
    ) -> Result<()> {
        manager.observe_trigger(lease, collided_entity)?;
        self.lease = Some(lease);
        self.collided_entity = Some(collided_entity);
        Ok(())
    }

    /// Feeds one step's phase. Phases without a binding are ignored.
    pub fn observe(&mut self, phase: IntersectionPhase) {
        if !self.active {
            return;
        }
        let Some(kind) = EventKind::from_phase(phase) else {
            return;
        };
        if self.config.bindings.iter().any(|binding| binding.kind == kind) {
            self.triggered = true;
            self.triggered_kinds |= kind.bit();
        }
    }

    /// Reads the attached observer's phase after a manager update, then
    /// advances by `dt`.
    pub fn sync(&mut self, manager: &PhysicsManager, dt: f32) -> Result<Vec<FiredEvent>> {
        if let (Some(lease), Some(entity)) = (self.lease, self.collided_entity) {
            let phase = manager.observer_phase(lease, entity)?;
            self.observe(phase);
        }
        Ok(self.update(dt))
    }

    /// Advances timers and consumes the `triggered` flag when allowed.
    pub fn update(&mut self, dt: f32) -> Vec<FiredEvent> {
        let mut fired = Vec::new();
        self.cooldown_remaining = (self.cooldown_remaining - dt).max(0.0);

        if let Some(mut pending) = self.pending.take() {
            pending.remaining -= dt;
            if pending.remaining <= TIME_EPSILON {
                self.fire(pending.kinds, &mut fired);
            } else {
                self.pending = Some(pending);
            }
        }

        if !self.triggered || self.pending.is_some() {
            return fired;
        }
        if self.is_exhausted() {
            self.triggered = false;
            self.triggered_kinds = 0;
            return fired;
        }
        if self.cooldown_remaining > TIME_EPSILON {
            return fired;
        }

        let kinds = std::mem::take(&mut self.triggered_kinds);
        self.triggered = false;
        if self.config.delay > TIME_EPSILON {
            self.pending = Some(PendingFire {
                remaining: self.config.delay,
                kinds,
            });
        } else {
            self.fire(kinds, &mut fired);
        }
        fired
    }

    fn fire(&mut self, kinds: u8, fired: &mut Vec<FiredEvent>) {
        if self.is_exhausted() {
            return;
        }
        self.charges_used += 1;
        self.cooldown_remaining = self.config.cooldown;
        log::debug!(
            "trigger '{}' fired ({} of {})",
            self.config.name,
            self.charges_used,
            self.config.charges
        );

        fired.extend(
            self.config
                .bindings
                .iter()
                .filter(|binding| kinds & binding.kind.bit() != 0)
                .map(|binding| FiredEvent {
                    kind: binding.kind,
                    target_entity: binding.target_entity,
                    method: binding.method.clone(),
                    collided_entity: self.collided_entity,
                }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_enter(charges: u32, cooldown: f32, delay: f32) -> TriggerRepeat {
        TriggerRepeat::new(TriggerRepeatConfig {
            name: "door".into(),
            delay,
            cooldown,
            charges,
            start_active: true,
            bindings: vec![EventBinding {
                kind: EventKind::OnEnter,
                target_entity: EntityId::from_index(9),
                method: "Open".into(),
            }],
        })
    }

    #[test]
    fn charges_cap_fires_and_cooldown_defers() {
        let mut repeat = on_enter(2, 1.0, 0.0);
        let dt = 0.1;
        let mut fire_times = Vec::new();

        for frame in 0..30 {
            let t = frame as f32 * dt;
            if frame <= 2 || frame == 20 {
                repeat.observe(IntersectionPhase::Enter);
            }
            if !repeat.update(dt).is_empty() {
                fire_times.push(t);
            }
        }

        assert_eq!(fire_times.len(), 2, "fired at {fire_times:?}");
        assert_eq!(fire_times[0], 0.0);
        assert!(fire_times[1] > 0.85 && fire_times[1] < 1.15, "second fire at {}", fire_times[1]);
        assert!(repeat.is_exhausted());
        assert_eq!(repeat.charges_remaining(), Some(0));
    }

    #[test]
    fn delay_postpones_fire() {
        let mut repeat = on_enter(0, 0.0, 0.5);
        repeat.observe(IntersectionPhase::Enter);
        let mut fired_at = None;
        for frame in 0..10 {
            if !repeat.update(0.1).is_empty() {
                fired_at = Some(frame);
                break;
            }
        }
        assert_eq!(fired_at, Some(5));
    }

    #[test]
    fn unbound_phases_and_inactive_triggers_are_ignored() {
        let mut repeat = on_enter(0, 0.0, 0.0);
        repeat.observe(IntersectionPhase::Retained);
        repeat.observe(IntersectionPhase::Leave);
        assert!(!repeat.is_triggered());

        repeat.set_active(false);
        repeat.observe(IntersectionPhase::Enter);
        assert!(repeat.update(0.1).is_empty());
    }

    #[test]
    fn fired_event_carries_binding() {
        let mut repeat = on_enter(0, 0.0, 0.0);
        repeat.observe(IntersectionPhase::Enter);
        let fired = repeat.update(0.016);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].method, "Open");
        assert_eq!(fired[0].target_entity, EntityId::from_index(9));
        assert_eq!(repeat.charges_remaining(), None);
    }
}
