//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

/// Solid sphere about its centre.
pub fn inertia_sphere(radius: f32, mass: f32) -> Mat3 {
    Mat3::from_diagonal(Vec3::splat(0.4 * mass * radius * radius))
}

/// Solid box from its full edge lengths.
pub fn inertia_box(size: Vec3, mass: f32) -> Mat3 {
    let factor = mass / 12.0;
    Mat3::from_diagonal(Vec3::new(
        factor * (size.y * size.y + size.z * size.z),
        factor * (size.x * size.x + size.z * size.z),
        factor * (size.x * size.x + size.y * size.y),
    ))
}

/// Solid cylinder aligned along Y.
pub fn inertia_cylinder(radius: f32, length: f32, mass: f32) -> Mat3 {
    let lateral = mass * (3.0 * radius * radius + length * length) / 12.0;
    Mat3::from_diagonal(Vec3::new(lateral, 0.5 * mass * radius * radius, lateral))
}

/// Solid cone aligned along Y, about its centre of mass.
pub fn inertia_cone(radius: f32, height: f32, mass: f32) -> Mat3 {
    let axial = 0.3 * mass * radius * radius;
    let lateral = mass * (3.0 / 20.0 * radius * radius + 3.0 / 80.0 * height * height);
    Mat3::from_diagonal(Vec3::new(lateral, axial, lateral))
}

/// Inverse of a diagonal-dominant inertia tensor, falling back to identity
/// when the tensor is singular.
pub fn safe_inverse(inertia: Mat3) -> Mat3 {
    if inertia.determinant().abs() < f32::EPSILON {
        Mat3::IDENTITY
    } else {
        inertia.inverse()
    }
}
