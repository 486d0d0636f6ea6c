use glam::{Mat3, Vec3};

use crate::{core::types::Transform, utils::math};

/// Convex solids in their local frame. Round shapes are aligned with the Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvexGeometry {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
    /// Apex at `+half_height`, base disc at `-half_height`.
    Cone { radius: f32, half_height: f32 },
    Cylinder { radius: f32, half_height: f32 },
}

/// Concrete collision resource owned by a [`crate::Shape`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CollisionGeometry {
    Convex(ConvexGeometry),
    /// Solid half-space `{ x | normal · x <= offset }` in the local frame.
    HalfSpace { normal: Vec3, offset: f32 },
}

impl ConvexGeometry {
    /// Furthest local point along `direction`.
    pub fn local_support(&self, direction: Vec3) -> Vec3 {
        match *self {
            ConvexGeometry::Sphere { radius } => direction.normalize_or_zero() * radius,
            ConvexGeometry::Cuboid { half_extents } => Vec3::new(
                half_extents.x.copysign(direction.x),
                half_extents.y.copysign(direction.y),
                half_extents.z.copysign(direction.z),
            ),
            ConvexGeometry::Cone {
                radius,
                half_height,
            } => {
                let height = 2.0 * half_height;
                let sin_angle = radius / (radius * radius + height * height).sqrt();
                if direction.y > direction.length() * sin_angle {
                    return Vec3::new(0.0, half_height, 0.0);
                }
                let lateral = (direction.x * direction.x + direction.z * direction.z).sqrt();
                if lateral > 1e-6 {
                    Vec3::new(
                        radius * direction.x / lateral,
                        -half_height,
                        radius * direction.z / lateral,
                    )
                } else {
                    Vec3::new(0.0, -half_height, 0.0)
                }
            }
            ConvexGeometry::Cylinder {
                radius,
                half_height,
            } => {
                let lateral = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
                lateral * radius + Vec3::Y * half_height.copysign(direction.y)
            }
        }
    }

    pub fn bounding_radius(&self) -> f32 {
        match *self {
            ConvexGeometry::Sphere { radius } => radius,
            ConvexGeometry::Cuboid { half_extents } => half_extents.length(),
            ConvexGeometry::Cone {
                radius,
                half_height,
            }
            | ConvexGeometry::Cylinder {
                radius,
                half_height,
            } => (radius * radius + half_height * half_height).sqrt(),
        }
    }
}

impl CollisionGeometry {
    /// World-space support point, or `None` for unbounded geometry.
    pub fn support(&self, transform: &Transform, direction: Vec3) -> Option<Vec3> {
        match self {
            CollisionGeometry::Convex(convex) => {
                let local_dir = transform.rotation.conjugate() * direction;
                Some(transform.position + transform.rotation * convex.local_support(local_dir))
            }
            CollisionGeometry::HalfSpace { .. } => None,
        }
    }

    /// Bounding sphere radius around the body origin; `None` means unbounded.
    pub fn bounding_radius(&self) -> Option<f32> {
        match self {
            CollisionGeometry::Convex(convex) => Some(convex.bounding_radius()),
            CollisionGeometry::HalfSpace { .. } => None,
        }
    }

    /// World-space plane of a half-space as `(normal, offset)`.
    pub fn world_plane(&self, transform: &Transform) -> Option<(Vec3, f32)> {
        match *self {
            CollisionGeometry::HalfSpace { normal, offset } => {
                let world_normal = (transform.rotation * normal).normalize_or_zero();
                Some((world_normal, offset + world_normal.dot(transform.position)))
            }
            CollisionGeometry::Convex(_) => None,
        }
    }

    /// Local inertia tensor for `mass`. Half-spaces only make sense as static
    /// geometry and report a zero tensor.
    pub fn inertia(&self, mass: f32) -> Mat3 {
        match *self {
            CollisionGeometry::Convex(ConvexGeometry::Sphere { radius }) => {
                math::inertia_sphere(radius, mass)
            }
            CollisionGeometry::Convex(ConvexGeometry::Cuboid { half_extents }) => {
                math::inertia_box(half_extents * 2.0, mass)
            }
            CollisionGeometry::Convex(ConvexGeometry::Cone {
                radius,
                half_height,
            }) => math::inertia_cone(radius, half_height * 2.0, mass),
            CollisionGeometry::Convex(ConvexGeometry::Cylinder {
                radius,
                half_height,
            }) => math::inertia_cylinder(radius, half_height * 2.0, mass),
            CollisionGeometry::HalfSpace { .. } => Mat3::ZERO,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, CollisionGeometry::HalfSpace { .. })
    }
}
