//! Gameplay-facing trigger behaviours built on the physics manager.

pub mod repeat;

pub use repeat::{EventBinding, EventKind, FiredEvent, TriggerRepeat, TriggerRepeatConfig};
