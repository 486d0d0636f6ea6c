use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, orientation, and non-uniform scale of an entity or body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Self::default()
        }
    }

    /// Builds a homogeneous matrix representation of the transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Applies another transform on top of this one, returning the composition.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale * other.position),
            rotation: (self.rotation * other.rotation).normalize(),
            scale: self.scale * other.scale,
        }
    }

    /// Rigid part of the transform; simulated bodies never carry scale.
    pub fn rigid(&self) -> Transform {
        Transform::from_position_rotation(self.position, self.rotation)
    }
}

/// Linear and angular velocity of a body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity {
        linear: Vec3::ZERO,
        angular: Vec3::ZERO,
    };
}

/// Mass and inertia tensor data.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f32,
    pub inertia: Mat3,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Mat3::IDENTITY,
        }
    }
}

/// Surface coefficients that affect contact response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Material {
    pub friction: f32,
    /// Resistance to rolling about an axis in the contact plane.
    pub rolling_friction: f32,
    /// Resistance to spinning about the contact normal.
    pub spinning_friction: f32,
    pub restitution: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            rolling_friction: 0.0,
            spinning_friction: 0.0,
            restitution: 0.0,
        }
    }
}

impl Material {
    pub fn rubber() -> Self {
        Self {
            friction: 1.0,
            rolling_friction: 0.04,
            spinning_friction: 0.03,
            restitution: 0.8,
        }
    }

    pub fn ice() -> Self {
        Self {
            friction: 0.03,
            rolling_friction: 0.005,
            spinning_friction: 0.003,
            restitution: 0.05,
        }
    }

    /// Coefficients for a touching pair. Friction terms multiply, restitution
    /// multiplies as well, so a zero on either side wins.
    pub fn combine_pair(a: &Self, b: &Self) -> MaterialPairProperties {
        MaterialPairProperties {
            friction: (a.friction * b.friction).clamp(0.0, 10.0),
            rolling_friction: (a.rolling_friction * b.friction
                + b.rolling_friction * a.friction)
                .clamp(0.0, 10.0),
            spinning_friction: (a.spinning_friction * b.friction
                + b.spinning_friction * a.friction)
                .clamp(0.0, 10.0),
            restitution: a.restitution * b.restitution,
        }
    }
}

/// Combined coefficients used by the solver for one contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialPairProperties {
    pub friction: f32,
    pub rolling_friction: f32,
    pub spinning_friction: f32,
    pub restitution: f32,
}

impl Default for MaterialPairProperties {
    fn default() -> Self {
        Material::combine_pair(&Material::default(), &Material::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_friction_multiplies() {
        let a = Material {
            friction: 0.6,
            ..Material::default()
        };
        let b = Material {
            friction: 0.5,
            ..Material::default()
        };
        let pair = Material::combine_pair(&a, &b);
        assert!((pair.friction - 0.3).abs() < 1e-6);
        assert_eq!(pair.restitution, 0.0);
    }

    #[test]
    fn rolling_friction_needs_a_sliding_partner() {
        let ball = Material {
            rolling_friction: 0.1,
            ..Material::default()
        };
        let frictionless = Material {
            friction: 0.0,
            ..Material::default()
        };
        let pair = Material::combine_pair(&ball, &frictionless);
        assert_eq!(pair.rolling_friction, 0.0);
    }

    #[test]
    fn combine_applies_parent_rotation() {
        let parent = Transform::from_position_rotation(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.combine(&child);
        assert!((world.position - Vec3::new(1.0, 0.0, -1.0)).length() < 1e-5);
    }
}
