//! Name-indexed pool of live entities
//!
//! Entities live in a generational arena. Callers only ever hold
//! [`EntityHandle`]s, which name a slot, the generation that slot had when the
//! handle was minted, and the pool that minted it. Every access re-validates
//! all three, so a handle to a destroyed entity (or one from another
//! dispatcher) yields an `EntityFault` instead of reaching a reused slot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::entity::Entity;
use super::error::{DispatchError, DispatchResult};

/// Opaque, non-owning reference to a pooled entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pool: Uuid,
    index: u32,
    generation: u32,
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entity: Option<Entity>,
}

/// Registry of live entities keyed by unique instance name.
#[derive(Debug)]
pub struct EntityPool {
    id: Uuid,
    slots: Vec<Slot>,
    free: Vec<u32>,
    names: HashMap<String, EntityHandle>,
    order: Vec<EntityHandle>,
}

impl Default for EntityPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityPool {
    /// Create an empty pool with a fresh identity.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            slots: Vec::new(),
            free: Vec::new(),
            names: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Look up a live entity by exact instance name.
    pub fn find(&self, name: &str) -> Option<EntityHandle> {
        self.names.get(name).copied()
    }

    /// Register `entity` under its instance name.
    pub fn insert(&mut self, entity: Entity) -> DispatchResult<EntityHandle> {
        if self.names.contains_key(entity.name()) {
            return Err(DispatchError::ConstructionFailed {
                class: entity.class_name().to_string(),
                instance: entity.name().to_string(),
                reason: "an entity with this name is already registered".to_string(),
            });
        }

        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        let handle = EntityHandle {
            pool: self.id,
            index,
            generation: slot.generation,
        };
        self.names.insert(entity.name().to_string(), handle);
        self.order.push(handle);
        slot.entity = Some(entity);
        Ok(handle)
    }

    /// Resolve a handle to its entity.
    pub fn get(&self, handle: EntityHandle) -> DispatchResult<&Entity> {
        self.slot(handle)
            .and_then(|slot| slot.entity.as_ref())
            .ok_or_else(|| stale(handle))
    }

    /// Resolve a handle to its entity for mutation.
    pub fn get_mut(&mut self, handle: EntityHandle) -> DispatchResult<&mut Entity> {
        if self.slot(handle).is_none() {
            return Err(stale(handle));
        }
        self.slots[handle.index as usize]
            .entity
            .as_mut()
            .ok_or_else(|| stale(handle))
    }

    /// Remove an entity, invalidating every outstanding handle to it.
    pub fn remove(&mut self, handle: EntityHandle) -> DispatchResult<Entity> {
        if self.slot(handle).is_none() {
            return Err(stale(handle));
        }
        let slot = &mut self.slots[handle.index as usize];
        let entity = slot.entity.take().ok_or_else(|| stale(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.names.remove(entity.name());
        self.order.retain(|live| *live != handle);
        Ok(entity)
    }

    /// Handles of live entities, oldest first.
    pub fn handles(&self) -> &[EntityHandle] {
        &self.order
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn slot(&self, handle: EntityHandle) -> Option<&Slot> {
        if handle.pool != self.id {
            return None;
        }
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation && slot.entity.is_some())
    }
}

fn stale(handle: EntityHandle) -> DispatchError {
    DispatchError::EntityFault(format!("{handle} does not refer to a live entity"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::entity::EntityBuilder;

    struct Blank;

    fn blank(name: &str) -> Entity {
        EntityBuilder::<Blank>::new("Blank", name)
            .build(Blank)
            .unwrap()
    }

    impl crate::graph::entity::EntityClass for Blank {
        const CLASS_NAME: &'static str = "Blank";

        fn construct(_name: &str) -> anyhow::Result<Self> {
            Ok(Blank)
        }
    }

    #[test]
    fn insert_then_find_by_name() {
        let mut pool = EntityPool::new();
        let handle = pool.insert(blank("b1")).unwrap();
        assert_eq!(pool.find("b1"), Some(handle));
        assert_eq!(pool.find("B1"), None);
        assert_eq!(pool.get(handle).unwrap().name(), "b1");
    }

    #[test]
    fn duplicate_names_are_refused() {
        let mut pool = EntityPool::new();
        pool.insert(blank("b1")).unwrap();
        let err = pool.insert(blank("b1")).unwrap_err();
        assert_eq!(err.code(), "construction_failed");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn removed_slots_invalidate_old_handles() {
        let mut pool = EntityPool::new();
        let old = pool.insert(blank("b1")).unwrap();
        pool.remove(old).unwrap();
        assert!(pool.is_empty());
        assert!(pool.find("b1").is_none());

        let new = pool.insert(blank("b2")).unwrap();
        assert_ne!(old, new);
        assert!(matches!(pool.get(old), Err(DispatchError::EntityFault(_))));
        assert!(pool.remove(old).is_err());
        assert_eq!(pool.get(new).unwrap().name(), "b2");
    }

    #[test]
    fn handles_from_another_pool_are_rejected() {
        let mut first = EntityPool::new();
        let mut second = EntityPool::new();
        let handle = first.insert(blank("b1")).unwrap();
        second.insert(blank("b1")).unwrap();
        assert!(second.get(handle).is_err());
    }

    #[test]
    fn handles_keep_creation_order() {
        let mut pool = EntityPool::new();
        let a = pool.insert(blank("zeta")).unwrap();
        let b = pool.insert(blank("alpha")).unwrap();
        assert_eq!(pool.handles(), &[a, b]);
    }
}
