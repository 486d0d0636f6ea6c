use std::sync::Arc;

use glam::{Mat3, Vec3};

use crate::{
    collision::geometry::CollisionGeometry,
    config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING, DEFAULT_MASS},
    shape::Shape,
    utils::{
        allocator::{BodyHandle, EntityId},
        math,
    },
};

use super::types::{MassProperties, Material, Transform, Velocity};

/// Simulated rigid body stored in the [`crate::world::DynamicsWorld`].
///
/// Bodies with zero mass or unbounded geometry are static. Kinematic bodies
/// are positioned from outside and act as infinitely heavy in contacts.
/// Disabled bodies are skipped by integration, contacts, and trigger tests.
#[derive(Debug, Clone)]
pub struct Body {
    pub handle: BodyHandle,
    pub owner: EntityId,
    pub transform: Transform,
    pub velocity: Velocity,
    pub force: Vec3,
    pub torque: Vec3,
    pub material: Material,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub gravity_enabled: bool,
    pub is_awake: bool,
    /// Seconds spent under the sleep threshold.
    pub sleep_timer: f32,
    mass_properties: MassProperties,
    inverse_mass: f32,
    inverse_inertia_local: Mat3,
    is_kinematic: bool,
    enabled: bool,
    shape: Option<Arc<Shape>>,
}

impl Default for Body {
    fn default() -> Self {
        Self::new(EntityId::default(), DEFAULT_MASS)
    }
}

impl Body {
    pub fn new(owner: EntityId, mass: f32) -> Self {
        let mut body = Self {
            handle: BodyHandle::default(),
            owner,
            transform: Transform::default(),
            velocity: Velocity::ZERO,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
            material: Material::default(),
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            gravity_enabled: true,
            is_awake: true,
            sleep_timer: 0.0,
            mass_properties: MassProperties {
                mass,
                inertia: Mat3::IDENTITY,
            },
            inverse_mass: 0.0,
            inverse_inertia_local: Mat3::ZERO,
            is_kinematic: false,
            enabled: true,
            shape: None,
        };
        body.recompute_mass_properties();
        body
    }

    pub fn with_shape(mut self, shape: Option<Arc<Shape>>) -> Self {
        self.set_shape(shape);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform.rigid();
        self
    }

    pub fn shape(&self) -> Option<&Arc<Shape>> {
        self.shape.as_ref()
    }

    pub fn geometry(&self) -> Option<&CollisionGeometry> {
        self.shape.as_deref().map(Shape::geometry)
    }

    /// Swaps the collision geometry; mass and identity are kept.
    pub fn set_shape(&mut self, shape: Option<Arc<Shape>>) {
        self.shape = shape;
        self.recompute_mass_properties();
        self.wake();
    }

    pub fn mass(&self) -> f32 {
        self.mass_properties.mass
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass_properties.mass = mass;
        self.recompute_mass_properties();
        self.wake();
    }

    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    pub fn is_static(&self) -> bool {
        self.mass_properties.mass.abs() < f32::EPSILON
            || self
                .geometry()
                .map(CollisionGeometry::is_unbounded)
                .unwrap_or(false)
    }

    pub fn is_kinematic(&self) -> bool {
        self.is_kinematic
    }

    /// Driven by the integrator and the contact solver.
    pub fn is_dynamic(&self) -> bool {
        !self.is_kinematic && !self.is_static()
    }

    /// Dynamic, enabled, and not asleep.
    pub fn is_active(&self) -> bool {
        self.is_dynamic() && self.is_awake && self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Re-enabling wakes the body.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.wake();
        }
        self.enabled = enabled;
    }

    pub fn inverse_mass(&self) -> f32 {
        if self.is_dynamic() {
            self.inverse_mass
        } else {
            0.0
        }
    }

    /// Inverse inertia tensor rotated into world space.
    pub fn world_inverse_inertia(&self) -> Mat3 {
        if !self.is_dynamic() {
            return Mat3::ZERO;
        }
        let rotation = Mat3::from_quat(self.transform.rotation);
        rotation * self.inverse_inertia_local * rotation.transpose()
    }

    pub fn make_kinematic(&mut self) {
        self.is_kinematic = true;
        self.gravity_enabled = false;
        self.velocity = Velocity::ZERO;
        self.clear_forces();
        self.is_awake = true;
        self.sleep_timer = 0.0;
    }

    pub fn make_dynamic(&mut self) {
        self.is_kinematic = false;
        self.gravity_enabled = true;
        self.wake();
    }

    pub fn halt(&mut self) {
        self.velocity = Velocity::ZERO;
    }

    pub fn wake(&mut self) {
        self.is_awake = true;
        self.sleep_timer = 0.0;
    }

    pub fn put_to_sleep(&mut self) {
        self.is_awake = false;
        self.velocity = Velocity::ZERO;
        self.clear_forces();
    }

    pub fn set_world_transform(&mut self, transform: &Transform) {
        self.transform = transform.rigid();
        self.wake();
    }

    pub fn apply_force(&mut self, force: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.force += force;
    }

    pub fn apply_impulse(&mut self, impulse: Vec3, position: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity.linear += impulse * self.inverse_mass;
        let torque = (position - self.transform.position).cross(impulse);
        self.velocity.angular += self.world_inverse_inertia() * torque;
    }

    pub fn apply_angular_impulse(&mut self, impulse: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.velocity.angular += self.world_inverse_inertia() * impulse;
    }

    pub fn clear_forces(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Velocity of the material point at `point`.
    pub fn point_velocity(&self, point: Vec3) -> Vec3 {
        self.velocity.linear + self.velocity.angular.cross(point - self.transform.position)
    }

    fn recompute_mass_properties(&mut self) {
        let mass = self.mass_properties.mass;
        self.inverse_mass = if mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / mass
        };
        let inertia = match self.geometry() {
            Some(geometry) => geometry.inertia(mass),
            None => Mat3::IDENTITY * mass,
        };
        self.mass_properties.inertia = inertia;
        self.inverse_inertia_local = if inertia.determinant().abs() < f32::EPSILON {
            Mat3::ZERO
        } else {
            math::safe_inverse(inertia)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mass_body_is_static() {
        let body = Body::new(EntityId::from_index(0), 0.0);
        assert!(body.is_static());
        assert_eq!(body.inverse_mass(), 0.0);
    }

    #[test]
    fn plane_body_is_static_regardless_of_mass() {
        let body = Body::new(EntityId::from_index(0), 5.0)
            .with_shape(Some(Arc::new(Shape::plane(Vec3::Y, 0.0))));
        assert!(body.is_static());
        assert!(!body.is_dynamic());
    }

    #[test]
    fn kinematic_switch_clears_motion() {
        let mut body = Body::new(EntityId::from_index(0), 2.0);
        body.velocity.linear = Vec3::new(1.0, 2.0, 3.0);
        body.apply_force(Vec3::X);
        body.make_kinematic();
        assert!(body.is_kinematic());
        assert!(!body.gravity_enabled);
        assert_eq!(body.velocity, Velocity::ZERO);
        assert_eq!(body.force, Vec3::ZERO);
        assert_eq!(body.inverse_mass(), 0.0);

        body.make_dynamic();
        assert!(body.gravity_enabled);
        assert!((body.inverse_mass() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn shape_swap_keeps_mass() {
        let mut body = Body::new(EntityId::from_index(0), 3.0);
        body.set_shape(Some(Arc::new(Shape::sphere(1.0))));
        assert_eq!(body.mass(), 3.0);
        let expected = 0.4 * 3.0;
        assert!((body.mass_properties().inertia.x_axis.x - expected).abs() < 1e-5);
    }
}
