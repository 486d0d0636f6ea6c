use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    pub const fn null() -> Self {
        Self {
            index: usize::MAX,
            generation: 0,
        }
    }
}

/// Typed key stored by an [`Arena`].
pub trait ArenaKey: Copy + Eq {
    fn from_raw(raw: GenerationalId) -> Self;
    fn raw(&self) -> GenerationalId;

    fn index(&self) -> usize {
        self.raw().index
    }

    fn generation(&self) -> u32 {
        self.raw().generation
    }
}

impl ArenaKey for GenerationalId {
    fn from_raw(raw: GenerationalId) -> Self {
        raw
    }

    fn raw(&self) -> GenerationalId {
        *self
    }
}

macro_rules! generational_key {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
        pub struct $name(pub GenerationalId);

        impl $name {
            pub fn new(index: usize, generation: u32) -> Self {
                Self(GenerationalId::new(index, generation))
            }

            pub fn from_index(index: u32) -> Self {
                Self::new(index as usize, 0)
            }

            pub fn index(&self) -> usize {
                self.0.index
            }

            pub fn generation(&self) -> u32 {
                self.0.generation
            }

            pub fn is_null(&self) -> bool {
                self.0.index == usize::MAX
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self(GenerationalId::null())
            }
        }

        impl ArenaKey for $name {
            fn from_raw(raw: GenerationalId) -> Self {
                Self(raw)
            }

            fn raw(&self) -> GenerationalId {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", $label, self.0.index, self.0.generation)
            }
        }
    };
}

generational_key!(
    /// Entity identifier wrapper used across the engine.
    EntityId,
    "Entity"
);

generational_key!(
    /// Handle to a body owned by the dynamics world.
    BodyHandle,
    "Body"
);

generational_key!(
    /// Revocable reference to a trigger volume owned by the physics manager.
    ///
    /// Every copy of a lease goes stale at once when the trigger is released,
    /// since the slot generation is bumped on removal.
    TriggerLease,
    "Trigger"
);

/// Generational arena that hands out stable IDs while preventing use-after-free.
pub struct Arena<T, K: ArenaKey = GenerationalId> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    _key: PhantomData<fn() -> K>,
}

impl<T: fmt::Debug, K: ArenaKey + fmt::Debug> fmt::Debug for Arena<T, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T, K: ArenaKey> Default for Arena<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, K: ArenaKey> Arena<T, K> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            _key: PhantomData,
        }
    }

    pub fn insert(&mut self, item: T) -> K {
        self.insert_with(|_| item)
    }

    /// Inserts a value built from its own key, for items that store their id.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        if let Some(index) = self.free_list.pop_front() {
            let key = K::from_raw(GenerationalId::new(index, self.generations[index]));
            self.items[index] = Some(build(key));
            return key;
        }

        let index = self.items.len();
        let key = K::from_raw(GenerationalId::new(index, 0));
        self.items.push(Some(build(key)));
        self.generations.push(0);
        key
    }

    pub fn get(&self, id: K) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn get2_mut(&mut self, id_a: K, id_b: K) -> Option<(&mut T, &mut T)> {
        if id_a.index() == id_b.index() {
            return None;
        }

        if !self.is_valid(id_a) || !self.is_valid(id_b) {
            return None;
        }

        let (first, second, flipped) = if id_a.index() < id_b.index() {
            (id_a, id_b, false)
        } else {
            (id_b, id_a, true)
        };

        let second_index = second.index();
        if second_index >= self.items.len() {
            return None;
        }

        let (left, right) = self.items.split_at_mut(second_index);
        let first_slot = left
            .get_mut(first.index())
            .and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    /// Removes the item and bumps the slot generation so that every outstanding
    /// key for it stops resolving.
    pub fn remove(&mut self, id: K) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let index = id.index();
        let item = self.items.get_mut(index)?.take()?;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_list.push_back(index);
        Some(item)
    }

    pub fn contains(&self, id: K) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.items.iter().enumerate().filter_map(|(index, slot)| {
            slot.as_ref().map(|item| {
                (
                    K::from_raw(GenerationalId::new(index, self.generations[index])),
                    item,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        let generations = &self.generations;
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(move |(index, slot)| {
                slot.as_mut().map(|item| {
                    (
                        K::from_raw(GenerationalId::new(index, generations[index])),
                        item,
                    )
                })
            })
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter().filter_map(|slot| slot.as_ref())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.items.iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.items.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_valid(&self, id: K) -> bool {
        self.generations
            .get(id.index())
            .copied()
            .map(|gen| gen == id.generation())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_slot_rejects_stale_keys() {
        let mut arena: Arena<&str, TriggerLease> = Arena::new();
        let first = arena.insert("first");
        let copy = first;

        assert_eq!(arena.remove(first), Some("first"));
        assert!(arena.get(copy).is_none());
        assert!(arena.remove(copy).is_none(), "second removal is a no-op");

        let second = arena.insert("second");
        assert_eq!(second.index(), first.index(), "slot is recycled");
        assert_ne!(second.generation(), first.generation());
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"second"));
    }

    #[test]
    fn insert_with_sees_own_key() {
        let mut arena: Arena<BodyHandle, BodyHandle> = Arena::new();
        let id = arena.insert_with(|key| key);
        assert_eq!(arena.get(id), Some(&id));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn get2_mut_rejects_aliasing() {
        let mut arena: Arena<i32, EntityId> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        assert!(arena.get2_mut(a, a).is_none());
        let (x, y) = arena.get2_mut(b, a).expect("distinct live keys");
        std::mem::swap(x, y);
        assert_eq!(arena.get(a), Some(&2));
    }
}
