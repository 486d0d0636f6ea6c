use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::{
    core::body::Body,
    utils::allocator::{Arena, BodyHandle},
};

/// Uniform grid spatial partitioning used by the broad-phase.
pub struct SpatialGrid {
    cell_size: f32,
    grid: HashMap<(i32, i32, i32), Vec<BodyHandle>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            grid: HashMap::new(),
        }
    }

    fn world_to_grid(&self, pos: Vec3) -> (i32, i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    pub fn insert(&mut self, handle: BodyHandle, position: Vec3, radius: f32) {
        let min_cell = self.world_to_grid(position - Vec3::splat(radius));
        let max_cell = self.world_to_grid(position + Vec3::splat(radius));

        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                for z in min_cell.2..=max_cell.2 {
                    self.grid.entry((x, y, z)).or_default().push(handle);
                }
            }
        }
    }

    pub fn query(&self, position: Vec3, radius: f32) -> Vec<BodyHandle> {
        let mut results = Vec::new();
        let min_cell = self.world_to_grid(position - Vec3::splat(radius));
        let max_cell = self.world_to_grid(position + Vec3::splat(radius));

        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                for z in min_cell.2..=max_cell.2 {
                    if let Some(handles) = self.grid.get(&(x, y, z)) {
                        results.extend(handles);
                    }
                }
            }
        }

        results.sort();
        results.dedup();
        results
    }
}

/// Broad phase driver returning potential body pairs.
///
/// Bounded shapes go through the grid; unbounded ones (planes) are paired
/// with every bounded body.
pub struct BroadPhase {
    grid: SpatialGrid,
}

impl BroadPhase {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: SpatialGrid::new(cell_size),
        }
    }

    /// Candidate pairs ordered by index, each reported once. Bodies without a
    /// shape never take part.
    pub fn find_pairs(&mut self, bodies: &Arena<Body, BodyHandle>) -> Vec<(BodyHandle, BodyHandle)> {
        self.grid.clear();

        let mut bounded = Vec::new();
        let mut unbounded = Vec::new();
        for (handle, body) in bodies.iter() {
            let Some(geometry) = body.geometry() else {
                continue;
            };
            match geometry.bounding_radius() {
                Some(radius) => {
                    self.grid.insert(handle, body.transform.position, radius);
                    bounded.push((handle, body.transform.position, radius));
                }
                None => unbounded.push(handle),
            }
        }

        let mut pairs = Vec::new();
        let mut checked = HashSet::new();

        for &(handle, position, radius) in &bounded {
            for other in self.grid.query(position, radius) {
                if other == handle {
                    continue;
                }
                let pair = ordered(handle, other);
                if checked.insert(pair) {
                    pairs.push(pair);
                }
            }
            for &plane in &unbounded {
                pairs.push(ordered(handle, plane));
            }
        }

        pairs
    }
}

fn ordered(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
    if a.index() < b.index() {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::types::Transform, shape::Shape, utils::allocator::EntityId};
    use std::sync::Arc;

    fn sphere_at(x: f32) -> Body {
        Body::new(EntityId::from_index(0), 1.0)
            .with_shape(Some(Arc::new(Shape::sphere(0.5))))
            .with_transform(Transform::from_position(Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn nearby_bodies_pair_and_far_ones_do_not() {
        let mut bodies = Arena::new();
        let a = bodies.insert(sphere_at(0.0));
        let b = bodies.insert(sphere_at(0.8));
        let far = bodies.insert(sphere_at(100.0));

        let pairs = BroadPhase::new(5.0).find_pairs(&bodies);
        assert_eq!(pairs, vec![(a, b)]);
        assert!(pairs.iter().all(|&(x, y)| x != far && y != far));
    }

    #[test]
    fn planes_pair_with_everything() {
        let mut bodies = Arena::new();
        let ground = bodies.insert(
            Body::new(EntityId::from_index(0), 0.0).with_shape(Some(Arc::new(Shape::plane(Vec3::Y, 0.0)))),
        );
        let far = bodies.insert(sphere_at(100.0));
        let unshaped = bodies.insert(Body::new(EntityId::from_index(1), 1.0));

        let pairs = BroadPhase::new(5.0).find_pairs(&bodies);
        assert_eq!(pairs, vec![(ground, far)]);
        assert!(pairs.iter().all(|&(x, y)| x != unshaped && y != unshaped));
    }
}
