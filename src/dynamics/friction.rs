use glam::Vec3;

use crate::{core::body::Body, dynamics::solver::Contact};

use super::solver::PGSSolver;

/// Applies friction to the contacting bodies.
/// Includes support for Coulomb friction and rolling/torsional resistance.
pub fn apply_friction(body_a: &mut Body, body_b: &mut Body, contact: &mut Contact, normal_impulse: f32) {
    apply_tangential_friction(body_a, body_b, contact, normal_impulse);
    apply_rolling_friction(body_a, body_b, contact, normal_impulse);
    apply_torsional_friction(body_a, body_b, contact, normal_impulse);
}

fn apply_tangential_friction(body_a: &mut Body, body_b: &mut Body, contact: &mut Contact, normal_impulse: f32) {
    let normal_impulse = normal_impulse.max(0.0);
    if normal_impulse <= f32::EPSILON || contact.material.friction <= 0.0 {
        contact.accumulated_tangent_impulse = Vec3::ZERO;
        return;
    }

    let relative_vel = body_b.point_velocity(contact.point) - body_a.point_velocity(contact.point);
    let tangent_velocity = relative_vel - contact.normal * relative_vel.dot(contact.normal);
    let speed = tangent_velocity.length();
    if speed <= 1e-7 {
        return;
    }
    let tangent = tangent_velocity / speed;

    let inverse_mass = PGSSolver::effective_inverse_mass(body_a, body_b, contact.point, tangent);
    if inverse_mass <= 1e-9 {
        return;
    }

    let mut new_impulse = contact.accumulated_tangent_impulse - tangent * (speed / inverse_mass);
    // Remove any numerical drift along the normal axis.
    new_impulse -= contact.normal * new_impulse.dot(contact.normal);

    let max_impulse = contact.material.friction * normal_impulse;
    if new_impulse.length() > max_impulse {
        new_impulse = new_impulse.normalize_or_zero() * max_impulse;
    }

    let impulse_delta = new_impulse - contact.accumulated_tangent_impulse;
    contact.accumulated_tangent_impulse = new_impulse;
    if impulse_delta.length_squared() <= 1e-12 {
        return;
    }

    body_a.apply_impulse(-impulse_delta, contact.point);
    body_b.apply_impulse(impulse_delta, contact.point);
}

fn apply_rolling_friction(body_a: &mut Body, body_b: &mut Body, contact: &mut Contact, normal_impulse: f32) {
    let limit = contact.material.rolling_friction.max(0.0) * normal_impulse.max(0.0);
    if limit <= f32::EPSILON {
        contact.accumulated_rolling_impulse = Vec3::ZERO;
        return;
    }

    let relative_ang = body_b.velocity.angular - body_a.velocity.angular;
    let rolling = relative_ang - contact.normal * relative_ang.dot(contact.normal);
    let speed = rolling.length();
    if speed <= 1e-7 {
        return;
    }
    let axis = rolling / speed;

    let inverse_inertia =
        axis.dot(body_a.world_inverse_inertia() * axis) + axis.dot(body_b.world_inverse_inertia() * axis);
    if inverse_inertia <= 1e-9 {
        return;
    }

    let mut new_impulse = contact.accumulated_rolling_impulse - axis * (speed / inverse_inertia);
    if new_impulse.length() > limit {
        new_impulse = new_impulse.normalize_or_zero() * limit;
    }

    let impulse_delta = new_impulse - contact.accumulated_rolling_impulse;
    contact.accumulated_rolling_impulse = new_impulse;
    body_a.apply_angular_impulse(-impulse_delta);
    body_b.apply_angular_impulse(impulse_delta);
}

fn apply_torsional_friction(body_a: &mut Body, body_b: &mut Body, contact: &mut Contact, normal_impulse: f32) {
    let limit = contact.material.spinning_friction.max(0.0) * normal_impulse.max(0.0);
    if limit <= f32::EPSILON {
        contact.accumulated_torsional_impulse = 0.0;
        return;
    }

    let normal = contact.normal;
    let spin = (body_b.velocity.angular - body_a.velocity.angular).dot(normal);
    let inverse_inertia =
        normal.dot(body_a.world_inverse_inertia() * normal) + normal.dot(body_b.world_inverse_inertia() * normal);
    if inverse_inertia <= 1e-9 {
        return;
    }

    let new_impulse =
        (contact.accumulated_torsional_impulse - spin / inverse_inertia).clamp(-limit, limit);
    let impulse_delta = new_impulse - contact.accumulated_torsional_impulse;
    contact.accumulated_torsional_impulse = new_impulse;
    body_a.apply_angular_impulse(-normal * impulse_delta);
    body_b.apply_angular_impulse(normal * impulse_delta);
}
