//! Entity class catalog and factory
//!
//! Classes are registered into a [`ClassCatalog`], either a private one built
//! per dispatcher or the process-wide catalog used by module registration
//! glue. Each dispatcher works from an immutable [`EntityFactory`] snapshot of
//! a catalog, so registrations made later never change a running dispatcher.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::entity::{Entity, EntityClass};
use super::error::{DispatchError, DispatchResult};
use super::pool::{EntityHandle, EntityPool};

/// Constructor producing a new entity for a given instance name.
pub type EntityConstructor = Arc<dyn Fn(&str) -> anyhow::Result<Entity> + Send + Sync>;

/// Mutable catalog of class constructors.
pub struct ClassCatalog {
    classes: RwLock<HashMap<String, EntityConstructor>>,
}

static CATALOG: Lazy<ClassCatalog> = Lazy::new(ClassCatalog::new);

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
        }
    }

    /// Access the process-wide catalog.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    /// Register a constructor under `class_name`, replacing any previous one.
    pub fn register<F>(&self, class_name: &str, constructor: F)
    where
        F: Fn(&str) -> anyhow::Result<Entity> + Send + Sync + 'static,
    {
        let replaced = self
            .classes
            .write()
            .insert(class_name.to_string(), Arc::new(constructor))
            .is_some();
        if replaced {
            tracing::debug!(class = class_name, "entity class re-registered");
        }
    }

    /// Register a statically typed entity class.
    pub fn register_class<T: EntityClass>(&self) {
        self.register(T::CLASS_NAME, Entity::from_class::<T>);
    }

    /// Whether a constructor exists for `class_name`.
    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.read().contains_key(class_name)
    }

    /// Produce an immutable factory for a dispatcher.
    pub fn snapshot(&self) -> EntityFactory {
        EntityFactory {
            classes: Arc::new(self.classes.read().clone()),
        }
    }
}

/// Immutable view of a catalog that mints new entities.
#[derive(Clone)]
pub struct EntityFactory {
    classes: Arc<HashMap<String, EntityConstructor>>,
}

impl EntityFactory {
    /// Whether the factory can build `class_name`.
    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Registered class names, sorted.
    pub fn classes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Construct an instance of `class_name` and register it in `pool`.
    ///
    /// The returned handle always resolves through `pool` under `instance_name`.
    pub fn new_entity(
        &self,
        pool: &mut EntityPool,
        class_name: &str,
        instance_name: &str,
    ) -> DispatchResult<EntityHandle> {
        let constructor = self
            .classes
            .get(class_name)
            .ok_or_else(|| DispatchError::UnknownClass(class_name.to_string()))?;

        let failed = |reason: String| DispatchError::ConstructionFailed {
            class: class_name.to_string(),
            instance: instance_name.to_string(),
            reason,
        };

        if pool.find(instance_name).is_some() {
            return Err(failed(
                "an entity with this name is already registered".to_string(),
            ));
        }

        let entity = panic::catch_unwind(AssertUnwindSafe(|| constructor(instance_name)))
            .map_err(|payload| failed(format!("constructor panicked: {}", panic_message(payload.as_ref()))))?
            .map_err(|err| failed(format!("{err:#}")))?;

        if entity.class_name() != class_name || entity.name() != instance_name {
            return Err(failed(format!(
                "constructor produced '{}' of class '{}'",
                entity.name(),
                entity.class_name()
            )));
        }

        let handle = pool.insert(entity)?;
        tracing::info!(class = class_name, instance = instance_name, %handle, "entity created");
        Ok(handle)
    }
}

/// Render a panic payload caught at the boundary.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
