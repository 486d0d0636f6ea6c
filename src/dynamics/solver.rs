use glam::Vec3;

use crate::{
    core::{body::Body, types::MaterialPairProperties},
    utils::allocator::{Arena, BodyHandle},
};

use super::friction::apply_friction;

/// Contact info shared between narrow phase and solver.
#[derive(Debug, Clone)]
pub struct Contact {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub point: Vec3,
    /// Points from `body_a` towards `body_b`.
    pub normal: Vec3,
    pub depth: f32,
    /// Separating speed requested by restitution, fixed before iterating.
    pub target_velocity: f32,
    pub accumulated_normal_impulse: f32,
    pub accumulated_tangent_impulse: Vec3,
    pub accumulated_rolling_impulse: Vec3,
    pub accumulated_torsional_impulse: f32,
    pub material: MaterialPairProperties,
}

impl Contact {
    pub fn new(
        body_a: BodyHandle,
        body_b: BodyHandle,
        point: Vec3,
        normal: Vec3,
        depth: f32,
        material: MaterialPairProperties,
    ) -> Self {
        Self {
            body_a,
            body_b,
            point,
            normal,
            depth,
            target_velocity: 0.0,
            accumulated_normal_impulse: 0.0,
            accumulated_tangent_impulse: Vec3::ZERO,
            accumulated_rolling_impulse: Vec3::ZERO,
            accumulated_torsional_impulse: 0.0,
            material,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SolverStepMetrics {
    pub contacts_solved: usize,
    pub normal_impulse_sum: f32,
    pub tangent_impulse_sum: f32,
    pub rolling_impulse_sum: f32,
    pub torsional_impulse_sum: f32,
}

impl SolverStepMetrics {
    pub fn record(&mut self, contacts: &[Contact]) {
        self.contacts_solved += contacts.len();
        for contact in contacts {
            self.normal_impulse_sum += contact.accumulated_normal_impulse.abs();
            self.tangent_impulse_sum += contact.accumulated_tangent_impulse.length();
            self.rolling_impulse_sum += contact.accumulated_rolling_impulse.length();
            self.torsional_impulse_sum += contact.accumulated_torsional_impulse.abs();
        }
    }
}

/// Projected Gauss-Seidel contact solver with sequential impulses.
#[derive(Debug, Clone)]
pub struct PGSSolver {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub bias_factor: f32,
    pub slop: f32,
    /// Approach speed under which restitution is ignored.
    pub restitution_threshold: f32,
}

impl Default for PGSSolver {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SOLVER_ITERATIONS)
    }
}

impl PGSSolver {
    pub fn new(velocity_iterations: u32) -> Self {
        Self {
            velocity_iterations: velocity_iterations.max(1),
            position_iterations: 1,
            bias_factor: 0.2,
            slop: 0.01,
            restitution_threshold: 1.0,
        }
    }

    pub fn solve(&self, bodies: &mut Arena<Body, BodyHandle>, contacts: &mut [Contact]) -> SolverStepMetrics {
        for contact in contacts.iter_mut() {
            if let Some((body_a, body_b)) = bodies.get2_mut(contact.body_a, contact.body_b) {
                self.prepare_contact(body_a, body_b, contact);
            }
        }

        for _ in 0..self.velocity_iterations {
            for contact in contacts.iter_mut() {
                if let Some((body_a, body_b)) = bodies.get2_mut(contact.body_a, contact.body_b) {
                    Self::resolve_contact(body_a, body_b, contact);
                }
            }
        }

        for _ in 0..self.position_iterations {
            for contact in contacts.iter() {
                if let Some((body_a, body_b)) = bodies.get2_mut(contact.body_a, contact.body_b) {
                    Self::correct_position(body_a, body_b, contact, self.bias_factor, self.slop);
                }
            }
        }

        let mut metrics = SolverStepMetrics::default();
        metrics.record(contacts);
        metrics
    }

    fn prepare_contact(&self, body_a: &Body, body_b: &Body, contact: &mut Contact) {
        let relative_vel = body_b.point_velocity(contact.point) - body_a.point_velocity(contact.point);
        let approach = relative_vel.dot(contact.normal);
        contact.target_velocity = if approach < -self.restitution_threshold {
            -contact.material.restitution * approach
        } else {
            0.0
        };
    }

    /// Inverse effective mass of the pair along `direction` at the contact point.
    pub(crate) fn effective_inverse_mass(body_a: &Body, body_b: &Body, point: Vec3, direction: Vec3) -> f32 {
        let r_a = point - body_a.transform.position;
        let r_b = point - body_b.transform.position;
        let angular_a = (body_a.world_inverse_inertia() * r_a.cross(direction)).cross(r_a);
        let angular_b = (body_b.world_inverse_inertia() * r_b.cross(direction)).cross(r_b);
        body_a.inverse_mass() + body_b.inverse_mass() + direction.dot(angular_a + angular_b)
    }

    fn resolve_contact(body_a: &mut Body, body_b: &mut Body, contact: &mut Contact) {
        if !body_a.is_dynamic() && !body_b.is_dynamic() {
            return;
        }

        let relative_vel = body_b.point_velocity(contact.point) - body_a.point_velocity(contact.point);
        let vel_along_normal = relative_vel.dot(contact.normal);

        let inverse_mass =
            Self::effective_inverse_mass(body_a, body_b, contact.point, contact.normal);
        if inverse_mass <= 1e-9 {
            return;
        }

        let impulse_mag = (contact.target_velocity - vel_along_normal) / inverse_mass;
        let accumulated = (contact.accumulated_normal_impulse + impulse_mag).max(0.0);
        let impulse_delta = accumulated - contact.accumulated_normal_impulse;
        contact.accumulated_normal_impulse = accumulated;

        let impulse = contact.normal * impulse_delta;
        body_a.apply_impulse(-impulse, contact.point);
        body_b.apply_impulse(impulse, contact.point);

        apply_friction(body_a, body_b, contact, contact.accumulated_normal_impulse);
    }

    fn correct_position(body_a: &mut Body, body_b: &mut Body, contact: &Contact, bias_factor: f32, slop: f32) {
        let total_inv_mass = body_a.inverse_mass() + body_b.inverse_mass();
        if total_inv_mass <= 1e-6 {
            return;
        }

        let correction = (contact.depth - slop).max(0.0) * bias_factor;
        let impulse = contact.normal * (correction / total_inv_mass);

        if body_a.is_dynamic() {
            body_a.transform.position -= impulse * body_a.inverse_mass();
        }
        if body_b.is_dynamic() {
            body_b.transform.position += impulse * body_b.inverse_mass();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::types::Transform, utils::allocator::EntityId};

    fn body_at(y: f32, mass: f32) -> Body {
        Body::new(EntityId::from_index(0), mass)
            .with_transform(Transform::from_position(Vec3::new(0.0, y, 0.0)))
    }

    #[test]
    fn falling_body_stops_on_static_ground() {
        let mut bodies: Arena<Body, BodyHandle> = Arena::new();
        let ground = bodies.insert(body_at(0.0, 0.0));
        let mut falling = body_at(1.0, 1.0);
        falling.velocity.linear = Vec3::new(0.0, -0.5, 0.0);
        let ball = bodies.insert(falling);

        let mut contacts = vec![Contact::new(
            ground,
            ball,
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::Y,
            0.02,
            MaterialPairProperties::default(),
        )];
        let metrics = PGSSolver::default().solve(&mut bodies, &mut contacts);

        let velocity = bodies.get(ball).map(|b| b.velocity.linear).unwrap_or_default();
        assert!(velocity.y.abs() < 1e-4, "velocity was {velocity:?}");
        assert!(metrics.normal_impulse_sum > 0.0);
        assert_eq!(bodies.get(ground).map(|b| b.transform.position), Some(Vec3::ZERO));
    }

    #[test]
    fn separating_contact_applies_no_impulse() {
        let mut bodies: Arena<Body, BodyHandle> = Arena::new();
        let ground = bodies.insert(body_at(0.0, 0.0));
        let mut rising = body_at(1.0, 1.0);
        rising.velocity.linear = Vec3::new(0.0, 2.0, 0.0);
        let ball = bodies.insert(rising);

        let mut contacts = vec![Contact::new(
            ground,
            ball,
            Vec3::new(0.0, 0.5, 0.0),
            Vec3::Y,
            0.0,
            MaterialPairProperties::default(),
        )];
        PGSSolver::default().solve(&mut bodies, &mut contacts);
        assert_eq!(contacts[0].accumulated_normal_impulse, 0.0);
    }

    #[test]
    fn restitution_bounces_fast_impacts() {
        let mut bodies: Arena<Body, BodyHandle> = Arena::new();
        let ground = bodies.insert(body_at(0.0, 0.0));
        let mut falling = body_at(1.0, 1.0);
        falling.velocity.linear = Vec3::new(0.0, -4.0, 0.0);
        let ball = bodies.insert(falling);

        let material = MaterialPairProperties {
            restitution: 0.5,
            ..MaterialPairProperties::default()
        };
        let mut contacts = vec![Contact::new(ground, ball, Vec3::new(0.0, 0.5, 0.0), Vec3::Y, 0.0, material)];
        PGSSolver::default().solve(&mut bodies, &mut contacts);

        let velocity = bodies.get(ball).map(|b| b.velocity.linear.y).unwrap_or_default();
        assert!((velocity - 2.0).abs() < 1e-3, "velocity was {velocity}");
    }
}
