use log::{log_enabled, Level};
use std::time::{Duration, Instant};

/// Scoped timer for the phases of a physics update.
///
/// Emits trace records on entry and exit, and adds the elapsed time to an
/// optional accumulator slot when dropped.
pub struct ScopedTimer<'a> {
    label: &'static str,
    start: Instant,
    output: Option<&'a mut Duration>,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'static str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
            output: None,
        }
    }

    pub fn accumulate(label: &'static str, output: &'a mut Duration) -> Self {
        let mut timer = Self::new(label);
        timer.output = Some(output);
        timer
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Some(slot) = self.output.as_deref_mut() {
            *slot += elapsed;
        }
        if log_enabled!(Level::Trace) {
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Timing and population counters gathered by one `PhysicsManager::update`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StepProfile {
    pub sync_time: Duration,
    pub simulation_time: Duration,
    pub trigger_time: Duration,
    pub sub_steps: u32,
    pub body_count: usize,
    pub trigger_count: usize,
    pub observer_count: usize,
}

impl StepProfile {
    pub fn total(&self) -> Duration {
        self.sync_time + self.simulation_time + self.trigger_time
    }

    pub fn report(&self) {
        if !log_enabled!(Level::Debug) {
            return;
        }
        log::debug!(
            "physics update: {:.3} ms total (sync {:.3}, simulate {:.3} over {} sub-steps, triggers {:.3}); {} bodies, {} triggers, {} observers",
            self.total().as_secs_f32() * 1000.0,
            self.sync_time.as_secs_f32() * 1000.0,
            self.simulation_time.as_secs_f32() * 1000.0,
            self.sub_steps,
            self.trigger_time.as_secs_f32() * 1000.0,
            self.body_count,
            self.trigger_count,
            self.observer_count,
        );
    }
}

/// Registers a warning when frame budget is exceeded.
pub fn warn_if_frame_budget_exceeded(duration: Duration, budget_ms: f32) {
    if duration.as_secs_f32() * 1000.0 > budget_ms {
        log::warn!(
            "Physics update exceeded budget: {:.2} ms > {:.2} ms",
            duration.as_secs_f32() * 1000.0,
            budget_ms
        );
    }
}
