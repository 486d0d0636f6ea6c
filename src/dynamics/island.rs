use std::collections::{HashMap, HashSet};

use crate::{
    core::body::Body,
    dynamics::solver::Contact,
    utils::allocator::{Arena, BodyHandle},
};

/// Seconds a whole island must stay slow before it is put to sleep.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// Connected set of dynamic bodies touching each other.
#[derive(Debug, Clone)]
pub struct Island {
    pub bodies: Vec<BodyHandle>,
    pub is_awake: bool,
}

/// Builds islands each step and manages sleeping state.
#[derive(Debug, Default)]
pub struct IslandManager {
    islands: Vec<Island>,
    adjacency: HashMap<BodyHandle, Vec<BodyHandle>>,
}

impl IslandManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups dynamic bodies linked by contacts. Static and kinematic bodies
    /// never join two islands together. An island with one awake member is
    /// woken entirely.
    pub fn build_islands(&mut self, bodies: &mut Arena<Body, BodyHandle>, contacts: &[Contact]) {
        self.islands.clear();
        self.adjacency.clear();

        for contact in contacts {
            let linked = matches!(
                (bodies.get(contact.body_a), bodies.get(contact.body_b)),
                (Some(a), Some(b)) if a.is_dynamic() && b.is_dynamic()
            );
            if linked {
                self.adjacency
                    .entry(contact.body_a)
                    .or_default()
                    .push(contact.body_b);
                self.adjacency
                    .entry(contact.body_b)
                    .or_default()
                    .push(contact.body_a);
            }
        }

        let dynamic: Vec<BodyHandle> = bodies
            .iter()
            .filter(|(_, body)| body.is_dynamic())
            .map(|(handle, _)| handle)
            .collect();

        let mut visited = HashSet::new();
        for handle in dynamic {
            if visited.contains(&handle) {
                continue;
            }
            let members = self.depth_first_collect(handle, &mut visited);
            let is_awake = members
                .iter()
                .any(|id| bodies.get(*id).map(|body| body.is_awake).unwrap_or(false));
            if is_awake {
                for id in &members {
                    if let Some(body) = bodies.get_mut(*id) {
                        body.is_awake = true;
                    }
                }
            }
            self.islands.push(Island {
                bodies: members,
                is_awake,
            });
        }
    }

    fn depth_first_collect(&self, start: BodyHandle, visited: &mut HashSet<BodyHandle>) -> Vec<BodyHandle> {
        let mut stack = vec![start];
        let mut result = Vec::new();

        while let Some(node) = stack.pop() {
            if visited.insert(node) {
                result.push(node);
                if let Some(neighbors) = self.adjacency.get(&node) {
                    stack.extend(neighbors.iter().copied());
                }
            }
        }

        result
    }

    /// Advances sleep timers; islands whose members all stayed under
    /// `threshold` (squared speed) for [`TIME_TO_SLEEP`] go to sleep together.
    pub fn update_sleeping(&mut self, bodies: &mut Arena<Body, BodyHandle>, threshold: f32, dt: f32) {
        for island in &mut self.islands {
            if !island.is_awake {
                continue;
            }

            let mut all_tired = true;
            for handle in &island.bodies {
                if let Some(body) = bodies.get_mut(*handle) {
                    let energy = body.velocity.linear.length_squared()
                        + body.velocity.angular.length_squared();
                    if energy < threshold {
                        body.sleep_timer += dt;
                    } else {
                        body.sleep_timer = 0.0;
                    }
                    all_tired &= body.sleep_timer >= TIME_TO_SLEEP;
                }
            }

            if all_tired && threshold > 0.0 {
                island.is_awake = false;
                for handle in &island.bodies {
                    if let Some(body) = bodies.get_mut(*handle) {
                        body.put_to_sleep();
                    }
                }
            }
        }
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::types::MaterialPairProperties, utils::allocator::EntityId};
    use glam::Vec3;

    fn contact(a: BodyHandle, b: BodyHandle) -> Contact {
        Contact::new(a, b, Vec3::ZERO, Vec3::Y, 0.0, MaterialPairProperties::default())
    }

    #[test]
    fn static_ground_does_not_merge_islands() {
        let mut bodies: Arena<Body, BodyHandle> = Arena::new();
        let ground = bodies.insert(Body::new(EntityId::from_index(0), 0.0));
        let a = bodies.insert(Body::new(EntityId::from_index(1), 1.0));
        let b = bodies.insert(Body::new(EntityId::from_index(2), 1.0));

        let mut islands = IslandManager::new();
        islands.build_islands(&mut bodies, &[contact(ground, a), contact(ground, b)]);
        assert_eq!(islands.islands().len(), 2);
    }

    #[test]
    fn touching_sleeper_is_woken() {
        let mut bodies: Arena<Body, BodyHandle> = Arena::new();
        let a = bodies.insert(Body::new(EntityId::from_index(1), 1.0));
        let b = bodies.insert(Body::new(EntityId::from_index(2), 1.0));
        if let Some(body) = bodies.get_mut(b) {
            body.put_to_sleep();
        }

        let mut islands = IslandManager::new();
        islands.build_islands(&mut bodies, &[contact(a, b)]);
        assert_eq!(islands.islands().len(), 1);
        assert_eq!(bodies.get(b).map(|body| body.is_awake), Some(true));
    }

    #[test]
    fn resting_island_falls_asleep_after_delay() {
        let mut bodies: Arena<Body, BodyHandle> = Arena::new();
        let a = bodies.insert(Body::new(EntityId::from_index(1), 1.0));

        let mut islands = IslandManager::new();
        for _ in 0..10 {
            islands.build_islands(&mut bodies, &[]);
            islands.update_sleeping(&mut bodies, 0.01, 1.0 / 60.0);
        }
        assert_eq!(bodies.get(a).map(|body| body.is_awake), Some(true));

        for _ in 0..30 {
            islands.build_islands(&mut bodies, &[]);
            islands.update_sleeping(&mut bodies, 0.01, 1.0 / 60.0);
        }
        assert_eq!(bodies.get(a).map(|body| body.is_awake), Some(false));
    }
}
