use glam::Vec3;

use crate::{
    core::body::Body,
    utils::{
        allocator::{Arena, BodyHandle},
        math,
    },
};

/// Semi-implicit Euler integrator for awake dynamic bodies.
#[derive(Debug, Clone, Default)]
pub struct Integrator;

impl Integrator {
    pub fn new() -> Self {
        Self
    }

    /// Applies gravity and accumulated forces, then damping, and clears the
    /// force accumulators.
    pub fn integrate_velocity(&self, body: &mut Body, gravity: Vec3, dt: f32) {
        if !body.is_active() {
            body.clear_forces();
            return;
        }

        if body.gravity_enabled {
            body.force += gravity * body.mass();
        }

        body.velocity.linear += body.force * body.inverse_mass() * dt;
        body.velocity.angular += body.world_inverse_inertia() * body.torque * dt;

        body.velocity.linear *= (1.0 - body.linear_damping).clamp(0.0, 1.0).powf(dt);
        body.velocity.angular *= (1.0 - body.angular_damping).clamp(0.0, 1.0).powf(dt);

        body.clear_forces();
    }

    pub fn integrate_position(&self, body: &mut Body, dt: f32) {
        if !body.is_active() {
            return;
        }

        body.transform.position += body.velocity.linear * dt;

        let delta = math::angular_velocity_to_quat(body.velocity.angular, dt);
        body.transform.rotation = (delta * body.transform.rotation).normalize();
    }

    pub fn integrate_velocities(&self, bodies: &mut Arena<Body, BodyHandle>, gravity: Vec3, dt: f32) {
        for body in bodies.values_mut() {
            self.integrate_velocity(body, gravity, dt);
        }
    }

    pub fn integrate_positions(&self, bodies: &mut Arena<Body, BodyHandle>, dt: f32) {
        for body in bodies.values_mut() {
            self.integrate_position(body, dt);
        }
    }
}
