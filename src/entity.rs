//! Minimal entity and component storage the physics layer plugs into.
//!
//! Entities carry the authored [`Transform`] and an `enabled` flag. Components
//! live in a [`ComponentContainer`] keyed by their owner and are removed in
//! two phases: first marked killed, then reaped by the owning manager once it
//! has released any simulation state they reference.

use std::collections::HashMap;

use crate::{
    core::types::Transform,
    utils::allocator::{Arena, EntityId},
};

#[derive(Debug, Clone)]
pub struct Entity {
    pub name: String,
    pub transform: Transform,
    pub enabled: bool,
    killed: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            enabled: true,
            killed: false,
        }
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Disabled and killed entities are left out of simulation.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.killed
    }
}

/// Entity storage for a scene.
#[derive(Debug, Default)]
pub struct World {
    entities: Arena<Entity, EntityId>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.entities.insert(Entity::new(name))
    }

    pub fn create_entity_at(&mut self, name: impl Into<String>, transform: Transform) -> EntityId {
        let mut entity = Entity::new(name);
        entity.transform = transform;
        self.entities.insert(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Marks the entity for removal; it stays readable until [`World::clear_killed`].
    pub fn kill(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(id) {
            entity.killed = true;
        }
    }

    /// Frees killed entities. Call after the managers have reaped their components.
    pub fn clear_killed(&mut self) -> usize {
        let killed: Vec<EntityId> = self
            .entities
            .iter()
            .filter(|(_, entity)| entity.killed)
            .map(|(id, _)| id)
            .collect();
        for id in &killed {
            self.entities.remove(*id);
        }
        killed.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Behaviour shared by every component stored in a [`ComponentContainer`].
pub trait Component {
    fn entity(&self) -> EntityId;
    fn is_killed(&self) -> bool;
    fn kill(&mut self);
}

/// Dense component storage with at most one component per owner.
#[derive(Debug)]
pub struct ComponentContainer<T: Component> {
    components: Vec<T>,
    by_owner: HashMap<EntityId, usize>,
}

impl<T: Component> Default for ComponentContainer<T> {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            by_owner: HashMap::new(),
        }
    }
}

impl<T: Component> ComponentContainer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `component`, replacing any existing one of the same owner.
    /// Returns the replaced component.
    pub fn create(&mut self, component: T) -> Option<T> {
        let owner = component.entity();
        match self.by_owner.get(&owner) {
            Some(&index) => Some(std::mem::replace(&mut self.components[index], component)),
            None => {
                self.by_owner.insert(owner, self.components.len());
                self.components.push(component);
                None
            }
        }
    }

    pub fn get_by_owner(&self, owner: EntityId) -> Option<&T> {
        self.by_owner
            .get(&owner)
            .and_then(|&index| self.components.get(index))
    }

    pub fn get_by_owner_mut(&mut self, owner: EntityId) -> Option<&mut T> {
        self.by_owner
            .get(&owner)
            .and_then(|&index| self.components.get_mut(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.components.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.components.iter_mut()
    }

    /// Marks the owner's component killed; it is freed by [`ComponentContainer::reap`].
    pub fn kill(&mut self, owner: EntityId) -> bool {
        match self.get_by_owner_mut(owner) {
            Some(component) => {
                component.kill();
                true
            }
            None => false,
        }
    }

    /// Removes every component matching `doomed` (plus those already killed)
    /// and hands each one to `on_remove` before it is dropped.
    pub fn reap(&mut self, mut doomed: impl FnMut(&T) -> bool, mut on_remove: impl FnMut(T)) -> usize {
        let (removed, kept): (Vec<T>, Vec<T>) = std::mem::take(&mut self.components)
            .into_iter()
            .partition(|component| component.is_killed() || doomed(component));

        self.components = kept;
        self.by_owner = self
            .components
            .iter()
            .enumerate()
            .map(|(index, component)| (component.entity(), index))
            .collect();

        let count = removed.len();
        for component in removed {
            on_remove(component);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Tag {
        owner: EntityId,
        value: u32,
        killed: bool,
    }

    impl Component for Tag {
        fn entity(&self) -> EntityId {
            self.owner
        }

        fn is_killed(&self) -> bool {
            self.killed
        }

        fn kill(&mut self) {
            self.killed = true;
        }
    }

    fn tag(owner: EntityId, value: u32) -> Tag {
        Tag {
            owner,
            value,
            killed: false,
        }
    }

    #[test]
    fn one_component_per_owner() {
        let mut world = World::new();
        let owner = world.create_entity("crate");
        let mut tags = ComponentContainer::new();
        assert!(tags.create(tag(owner, 1)).is_none());
        assert_eq!(tags.create(tag(owner, 2)).map(|old| old.value), Some(1));
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get_by_owner(owner).map(|t| t.value), Some(2));
    }

    #[test]
    fn reap_keeps_lookup_consistent() {
        let mut world = World::new();
        let a = world.create_entity("a");
        let b = world.create_entity("b");
        let c = world.create_entity("c");
        let mut tags = ComponentContainer::new();
        tags.create(tag(a, 1));
        tags.create(tag(b, 2));
        tags.create(tag(c, 3));

        tags.kill(a);
        let mut reaped = Vec::new();
        let count = tags.reap(|t| t.owner == c, |t| reaped.push(t.value));

        assert_eq!(count, 2);
        reaped.sort_unstable();
        assert_eq!(reaped, vec![1, 3]);
        assert_eq!(tags.get_by_owner(b).map(|t| t.value), Some(2));
        assert!(tags.get_by_owner(a).is_none());
    }

    #[test]
    fn killed_entities_linger_until_cleared() {
        let mut world = World::new();
        let id = world.create_entity("doomed");
        world.kill(id);
        assert!(world.get(id).map(Entity::is_killed).unwrap_or(false));
        assert_eq!(world.clear_killed(), 1);
        assert!(world.get(id).is_none());
    }
}
