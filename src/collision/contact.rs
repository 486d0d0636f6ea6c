use std::ops::ControlFlow;

use glam::Vec3;

use crate::utils::allocator::BodyHandle;

/// Most points kept for one pair.
pub const MAX_MANIFOLD_POINTS: usize = 4;

/// Single point of overlap between two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    /// World-space point, halfway between the two surfaces.
    pub point: Vec3,
    /// Unit normal pointing from the first shape towards the second.
    pub normal: Vec3,
    /// Penetration depth; zero when touching.
    pub depth: f32,
}

/// Contact manifold storing the overlap points of a pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactManifold {
    pub points: Vec<ManifoldPoint>,
}

impl ContactManifold {
    pub fn single(point: Vec3, normal: Vec3, depth: f32) -> Self {
        Self {
            points: vec![ManifoldPoint {
                point,
                normal,
                depth,
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Swaps the roles of the two shapes.
    pub fn flipped(mut self) -> Self {
        for point in &mut self.points {
            point.normal = -point.normal;
        }
        self
    }

    /// Keeps the deepest [`MAX_MANIFOLD_POINTS`] points.
    pub fn reduce(&mut self) {
        if self.points.len() <= MAX_MANIFOLD_POINTS {
            return;
        }
        self.points.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        self.points.truncate(MAX_MANIFOLD_POINTS);
    }

    pub fn deepest(&self) -> Option<&ManifoldPoint> {
        self.points.iter().max_by(|a, b| a.depth.total_cmp(&b.depth))
    }
}

/// Receives the points found by [`crate::world::DynamicsWorld::contact_pair_test`].
pub trait ContactResultCallback {
    /// Filters bodies before any narrow-phase work is done for them.
    fn needs_collision(&self, _body: BodyHandle) -> bool {
        true
    }

    /// Called once per manifold point. `Break` skips the remaining points of
    /// the current body.
    fn add_single_result(&mut self, body: BodyHandle, point: &ManifoldPoint) -> ControlFlow<()>;
}

impl<F> ContactResultCallback for F
where
    F: FnMut(BodyHandle, &ManifoldPoint) -> ControlFlow<()>,
{
    fn add_single_result(&mut self, body: BodyHandle, point: &ManifoldPoint) -> ControlFlow<()> {
        self(body, point)
    }
}
