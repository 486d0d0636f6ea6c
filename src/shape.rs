//! Immutable collision shapes shared between bodies and trigger volumes.
//!
//! A [`Shape`] is built from exactly one parameter struct and owns the
//! matching [`CollisionGeometry`] for its whole lifetime. Replacing the shape
//! of a body or trigger means building a new `Shape` and swapping the
//! `Arc<Shape>` that refers to it.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    collision::geometry::{CollisionGeometry, ConvexGeometry},
    error::{PhysicsError, Result},
};

/// Parameters used to create a sphere shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub radius: f32,
}

/// Parameters used to create a plane shape: `normal · x = plane_coeff`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plane {
    pub normal: Vec3,
    pub plane_coeff: f32,
}

/// Parameters used to create a box shape from its full dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cuboid {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

/// Parameters used to create a cone shape aligned with the Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    pub radius: f32,
    pub height: f32,
}

/// Parameters used to create a cylinder shape aligned with the Y axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cylinder {
    pub radius: f32,
    pub length: f32,
}

/// The various kinds of shapes that are wrapped by [`Shape`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Sphere,
    Plane,
    Box,
    Cone,
    Cylinder,
}

/// Tagged shape parameters. This is also the persisted form: a single-key
/// object such as `{ "sphere": { "radius": 1.0 } }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeParams {
    Sphere(Sphere),
    Plane(Plane),
    Box(Cuboid),
    Cone(Cone),
    Cylinder(Cylinder),
}

impl ShapeParams {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeParams::Sphere(_) => ShapeKind::Sphere,
            ShapeParams::Plane(_) => ShapeKind::Plane,
            ShapeParams::Box(_) => ShapeKind::Box,
            ShapeParams::Cone(_) => ShapeKind::Cone,
            ShapeParams::Cylinder(_) => ShapeKind::Cylinder,
        }
    }

    fn build_geometry(&self) -> CollisionGeometry {
        match *self {
            ShapeParams::Sphere(Sphere { radius }) => {
                CollisionGeometry::Convex(ConvexGeometry::Sphere { radius })
            }
            ShapeParams::Plane(Plane {
                normal,
                plane_coeff,
            }) => CollisionGeometry::HalfSpace {
                normal: normal.normalize_or(Vec3::Y),
                offset: plane_coeff,
            },
            ShapeParams::Box(Cuboid {
                width,
                height,
                depth,
            }) => CollisionGeometry::Convex(ConvexGeometry::Cuboid {
                half_extents: Vec3::new(width, height, depth) * 0.5,
            }),
            ShapeParams::Cone(Cone { radius, height }) => {
                CollisionGeometry::Convex(ConvexGeometry::Cone {
                    radius,
                    half_height: height * 0.5,
                })
            }
            ShapeParams::Cylinder(Cylinder { radius, length }) => {
                CollisionGeometry::Convex(ConvexGeometry::Cylinder {
                    radius,
                    half_height: length * 0.5,
                })
            }
        }
    }
}

/// Represents a shape for physics objects and owns its collision geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    params: ShapeParams,
    geometry: CollisionGeometry,
}

impl Shape {
    pub fn new(params: ShapeParams) -> Self {
        Self {
            geometry: params.build_geometry(),
            params,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ShapeParams::Sphere(Sphere { radius }))
    }

    pub fn plane(normal: Vec3, plane_coeff: f32) -> Self {
        Self::new(ShapeParams::Plane(Plane {
            normal,
            plane_coeff,
        }))
    }

    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        Self::new(ShapeParams::Box(Cuboid {
            width,
            height,
            depth,
        }))
    }

    pub fn cone(radius: f32, height: f32) -> Self {
        Self::new(ShapeParams::Cone(Cone { radius, height }))
    }

    pub fn cylinder(radius: f32, length: f32) -> Self {
        Self::new(ShapeParams::Cylinder(Cylinder { radius, length }))
    }

    pub fn kind(&self) -> ShapeKind {
        self.params.kind()
    }

    pub fn params(&self) -> &ShapeParams {
        &self.params
    }

    pub fn geometry(&self) -> &CollisionGeometry {
        &self.geometry
    }

    /// Sphere data, or `None` if the shape is not a sphere.
    pub fn sphere_data(&self) -> Option<&Sphere> {
        match &self.params {
            ShapeParams::Sphere(data) => Some(data),
            _ => None,
        }
    }

    pub fn plane_data(&self) -> Option<&Plane> {
        match &self.params {
            ShapeParams::Plane(data) => Some(data),
            _ => None,
        }
    }

    pub fn box_data(&self) -> Option<&Cuboid> {
        match &self.params {
            ShapeParams::Box(data) => Some(data),
            _ => None,
        }
    }

    pub fn cone_data(&self) -> Option<&Cone> {
        match &self.params {
            ShapeParams::Cone(data) => Some(data),
            _ => None,
        }
    }

    pub fn cylinder_data(&self) -> Option<&Cylinder> {
        match &self.params {
            ShapeParams::Cylinder(data) => Some(data),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.params).unwrap_or(Value::Null)
    }

    /// Loads a shape from its persisted node.
    ///
    /// The node must be an object with exactly one recognised variant key.
    pub fn from_json(node: &Value) -> Result<Self> {
        let object = node
            .as_object()
            .ok_or_else(|| PhysicsError::InvalidDocument("shape node is not an object".into()))?;
        let variant = match object.keys().next() {
            Some(key) if object.len() == 1 => key.as_str(),
            Some(_) => {
                return Err(PhysicsError::InvalidDocument(
                    "shape node must have a single variant".into(),
                ))
            }
            None => return Err(PhysicsError::UnknownShape(String::new())),
        };
        if !matches!(variant, "sphere" | "plane" | "box" | "cone" | "cylinder") {
            return Err(PhysicsError::UnknownShape(variant.to_owned()));
        }
        let params: ShapeParams = serde_json::from_value(node.clone())?;
        Ok(Self::new(params))
    }
}

impl From<ShapeParams> for Shape {
    fn from(params: ShapeParams) -> Self {
        Self::new(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accessors_follow_active_variant() {
        let shape = Shape::sphere(2.0);
        assert_eq!(shape.kind(), ShapeKind::Sphere);
        assert_eq!(shape.sphere_data().map(|s| s.radius), Some(2.0));
        assert!(shape.plane_data().is_none());
        assert!(shape.box_data().is_none());
        assert!(shape.cone_data().is_none());
        assert!(shape.cylinder_data().is_none());
    }

    #[test]
    fn box_geometry_uses_half_extents() {
        let shape = Shape::cuboid(2.0, 4.0, 6.0);
        assert_eq!(
            shape.geometry(),
            &CollisionGeometry::Convex(ConvexGeometry::Cuboid {
                half_extents: Vec3::new(1.0, 2.0, 3.0)
            })
        );
    }

    #[test]
    fn loads_plane_node() {
        let shape = Shape::from_json(&json!({
            "plane": { "normal": [0.0, 1.0, 0.0], "planeCoeff": 0.5 }
        }))
        .expect("plane node");
        let plane = shape.plane_data().expect("plane variant");
        assert_eq!(plane.normal, Vec3::Y);
        assert_eq!(plane.plane_coeff, 0.5);
    }

    #[test]
    fn persisted_form_reloads() {
        let shape = Shape::cylinder(0.5, 3.0);
        let reloaded = Shape::from_json(&shape.to_json()).expect("cylinder node");
        assert_eq!(reloaded, shape);
    }

    #[test]
    fn unknown_variant_is_reported() {
        let err = Shape::from_json(&json!({ "torus": { "radius": 1.0 } }))
            .expect_err("torus is not supported");
        assert!(matches!(err, PhysicsError::UnknownShape(name) if name == "torus"));
    }

    #[test]
    fn empty_node_is_reported() {
        assert!(matches!(
            Shape::from_json(&json!({})),
            Err(PhysicsError::UnknownShape(_))
        ));
        assert!(Shape::from_json(&Value::Null).is_err());
    }
}
