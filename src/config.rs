//! Global configuration constants and the injectable [`PhysicsConfig`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.82, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Upper bound on fixed sub-steps taken by a single update.
pub const DEFAULT_MAX_SUB_STEPS: u32 = 10;

/// Number of constraint solver iterations performed per step.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 10;

/// Mass given to rigid bodies created without an explicit one.
pub const DEFAULT_MASS: f32 = 1.0;

/// Default damping applied to linear velocity.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.0;

/// Default damping applied to angular velocity.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.0;

/// Default cell size for the broad-phase uniform grid.
pub const DEFAULT_BROADPHASE_CELL_SIZE: f32 = 5.0;

/// Squared speed under which an island is put to sleep.
pub const DEFAULT_SLEEP_THRESHOLD: f32 = 0.0025;

/// Tunables for a [`crate::PhysicsManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    pub fixed_time_step: f32,
    pub max_sub_steps: u32,
    pub solver_iterations: u32,
    pub broadphase_cell_size: f32,
    pub sleep_threshold: f32,
    /// Soft per-update budget; exceeding it logs a warning. `None` disables the check.
    pub frame_budget_ms: Option<f32>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::from_array(DEFAULT_GRAVITY),
            fixed_time_step: DEFAULT_TIME_STEP,
            max_sub_steps: DEFAULT_MAX_SUB_STEPS,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            broadphase_cell_size: DEFAULT_BROADPHASE_CELL_SIZE,
            sleep_threshold: DEFAULT_SLEEP_THRESHOLD,
            frame_budget_ms: None,
        }
    }
}

impl PhysicsConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    /// Replaces non-positive step parameters with their defaults.
    pub fn sanitized(mut self) -> Self {
        if !(self.fixed_time_step > 0.0) {
            log::warn!(
                "fixed time step {} is not positive, using {}",
                self.fixed_time_step,
                DEFAULT_TIME_STEP
            );
            self.fixed_time_step = DEFAULT_TIME_STEP;
        }
        if self.max_sub_steps == 0 {
            self.max_sub_steps = 1;
        }
        if self.solver_iterations == 0 {
            self.solver_iterations = 1;
        }
        if !(self.broadphase_cell_size > 0.0) {
            self.broadphase_cell_size = DEFAULT_BROADPHASE_CELL_SIZE;
        }
        self
    }
}
