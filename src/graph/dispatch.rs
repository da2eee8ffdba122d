//! Caller-facing dispatch facade
//!
//! [`Dispatcher`] is the only thing a dynamic caller talks to. It resolves
//! handles through the pool on every call, mints entities through the
//! factory, and runs commands with the two-phase protocol: every argument is
//! converted against the declared signature first, and the action runs only
//! once the whole argument list is valid.
//!
//! The pool sits behind a single mutex that each operation holds for its full
//! duration, so concurrent callers are serialized the way a scripting host
//! would serialize them.

use parking_lot::Mutex;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

use super::DispatcherConfig;
use super::bridge::ValueBridge;
use super::dynamic::Dynamic;
use super::error::{DispatchError, DispatchResult};
use super::factory::{EntityFactory, panic_message};
use super::pool::{EntityHandle, EntityPool};
use super::signal::SignalHandle;

/// Summary of a live entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    /// Handle to pass back into the dispatcher
    pub handle: EntityHandle,
    /// Instance name
    pub name: String,
    /// Class name
    pub class_name: String,
}

/// Boundary between a dynamic caller and the entity graph.
pub struct Dispatcher {
    config: DispatcherConfig,
    bridge: ValueBridge,
    factory: EntityFactory,
    pool: Mutex<EntityPool>,
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration.
    pub fn new(factory: EntityFactory) -> Self {
        Self::with_config(factory, DispatcherConfig::default())
    }

    /// Create a dispatcher with an explicit configuration.
    pub fn with_config(factory: EntityFactory, config: DispatcherConfig) -> Self {
        Self {
            bridge: ValueBridge::new(config.widen_integers),
            config,
            factory,
            pool: Mutex::new(EntityPool::new()),
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Attach to the entity `instance_name`, creating it when absent.
    ///
    /// Repeating the call with the same arguments returns a handle to the same
    /// entity. Asking for an existing name under another class fails with
    /// [`DispatchError::ClassInconsistent`].
    pub fn create(&self, class_name: &str, instance_name: &str) -> DispatchResult<EntityHandle> {
        let mut pool = self.pool.lock();

        let result = match pool.find(instance_name) {
            Some(handle) => pool.get(handle).and_then(|existing| {
                if existing.class_name() == class_name {
                    tracing::debug!(class = class_name, instance = instance_name, "attached to existing entity");
                    Ok(handle)
                } else {
                    Err(DispatchError::ClassInconsistent {
                        instance: instance_name.to_string(),
                        existing: existing.class_name().to_string(),
                        requested: class_name.to_string(),
                    })
                }
            }),
            None => match self.config.max_entities {
                Some(limit) if pool.len() >= limit => Err(DispatchError::ConstructionFailed {
                    class: class_name.to_string(),
                    instance: instance_name.to_string(),
                    reason: format!("entity limit of {limit} reached"),
                }),
                _ => self.factory.new_entity(&mut pool, class_name, instance_name),
            },
        };

        observe("create", result)
    }

    /// Instance name of an entity.
    pub fn get_name(&self, handle: EntityHandle) -> DispatchResult<String> {
        let pool = self.pool.lock();
        observe("get_name", pool.get(handle).map(|entity| entity.name().to_string()))
    }

    /// Class name of an entity.
    pub fn get_class_name(&self, handle: EntityHandle) -> DispatchResult<String> {
        let pool = self.pool.lock();
        observe(
            "get_class_name",
            pool.get(handle).map(|entity| entity.class_name().to_string()),
        )
    }

    /// Documentation of an entity.
    pub fn get_docstring(&self, handle: EntityHandle) -> DispatchResult<String> {
        let pool = self.pool.lock();
        observe(
            "get_docstring",
            pool.get(handle).map(|entity| entity.docstring().to_string()),
        )
    }

    /// Human-readable description of an entity.
    pub fn display(&self, handle: EntityHandle) -> DispatchResult<String> {
        let pool = self.pool.lock();
        let result = pool.get(handle).and_then(|entity| {
            entity.display().map_err(|_| {
                DispatchError::EntityFault(format!("failed to render entity '{}'", entity.name()))
            })
        });
        observe("display", result)
    }

    /// Look up a signal of an entity by exact name.
    pub fn get_signal(&self, handle: EntityHandle, signal_name: &str) -> DispatchResult<SignalHandle> {
        let pool = self.pool.lock();
        let result = pool.get(handle).and_then(|entity| {
            entity
                .signal(signal_name)
                .map(|signal| SignalHandle::new(handle, signal.name()))
                .ok_or_else(|| DispatchError::UnknownSignal {
                    entity: entity.name().to_string(),
                    signal: signal_name.to_string(),
                })
        });
        observe("get_signal", result)
    }

    /// Signals of an entity, ordered by name.
    pub fn list_signals(&self, handle: EntityHandle) -> DispatchResult<Vec<SignalHandle>> {
        let pool = self.pool.lock();
        let result = pool.get(handle).map(|entity| {
            entity
                .signals()
                .map(|signal| SignalHandle::new(handle, signal.name()))
                .collect()
        });
        observe("list_signals", result)
    }

    /// Fully qualified name of a signal.
    pub fn signal_name(&self, signal: &SignalHandle) -> DispatchResult<String> {
        let pool = self.pool.lock();
        let result = pool.get(signal.entity()).and_then(|entity| {
            entity
                .signal(signal.name())
                .map(|found| found.path().to_string())
                .ok_or_else(|| DispatchError::UnknownSignal {
                    entity: entity.name().to_string(),
                    signal: signal.name().to_string(),
                })
        });
        observe("signal_name", result)
    }

    /// Run a command of an entity with dynamically typed arguments.
    pub fn execute_command(
        &self,
        handle: EntityHandle,
        command_name: &str,
        args: &[Dynamic],
    ) -> DispatchResult<Dynamic> {
        let mut pool = self.pool.lock();
        let result = self.run_command(&mut pool, handle, command_name, args);
        observe("execute_command", result)
    }

    fn run_command(
        &self,
        pool: &mut EntityPool,
        handle: EntityHandle,
        command_name: &str,
        args: &[Dynamic],
    ) -> DispatchResult<Dynamic> {
        let entity = pool.get_mut(handle)?;
        let command = entity
            .command(command_name)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownCommand {
                entity: entity.name().to_string(),
                command: command_name.to_string(),
            })?;

        if args.len() != command.arity() {
            return Err(DispatchError::ArityMismatch {
                entity: entity.name().to_string(),
                command: command_name.to_string(),
                expected: command.arity(),
                given: args.len(),
            });
        }

        let values = args
            .iter()
            .zip(command.params())
            .enumerate()
            .map(|(idx, (arg, ty))| {
                self.bridge
                    .from_dynamic(arg, *ty)
                    .map_err(|source| DispatchError::ArgumentConversion {
                        index: idx + 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.config.trace_arguments {
            tracing::debug!(entity = entity.name(), command = command_name, args = ?values, "executing command");
        } else {
            tracing::debug!(entity = entity.name(), command = command_name, "executing command");
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| entity.execute(&command, &values)));
        match outcome {
            Ok(Ok(value)) => Ok(ValueBridge::to_dynamic(&value)),
            Ok(Err(err)) => Err(DispatchError::Execution {
                command: command_name.to_string(),
                message: format!("{err:#}"),
            }),
            Err(payload) => Err(DispatchError::Execution {
                command: command_name.to_string(),
                message: format!("panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    /// Command names of an entity, ordered by name.
    pub fn list_commands(&self, handle: EntityHandle) -> DispatchResult<Vec<String>> {
        let pool = self.pool.lock();
        let result = pool
            .get(handle)
            .map(|entity| entity.command_names().map(str::to_string).collect());
        observe("list_commands", result)
    }

    /// Documentation of a command.
    pub fn get_command_docstring(
        &self,
        handle: EntityHandle,
        command_name: &str,
    ) -> DispatchResult<String> {
        let pool = self.pool.lock();
        let result = pool.get(handle).and_then(|entity| match entity.command(command_name) {
            Some(command) => Ok(command.docstring().to_string()),
            None => Err(DispatchError::UnknownCommand {
                entity: entity.name().to_string(),
                command: command_name.to_string(),
            }),
        });
        observe("get_command_docstring", result)
    }

    /// Live entities, oldest first.
    pub fn list_entities(&self) -> Vec<EntitySummary> {
        let pool = self.pool.lock();
        pool.handles()
            .iter()
            .filter_map(|handle| {
                pool.get(*handle).ok().map(|entity| EntitySummary {
                    handle: *handle,
                    name: entity.name().to_string(),
                    class_name: entity.class_name().to_string(),
                })
            })
            .collect()
    }

    /// Classes this dispatcher can instantiate, sorted.
    pub fn list_classes(&self) -> Vec<String> {
        self.factory.classes()
    }

    /// Destroy an entity. Outstanding handles to it become invalid.
    pub fn destroy(&self, handle: EntityHandle) -> DispatchResult<()> {
        let mut pool = self.pool.lock();
        let result = pool.remove(handle).map(|entity| {
            tracing::info!(class = entity.class_name(), instance = entity.name(), "entity destroyed");
        });
        observe("destroy", result)
    }
}

fn observe<T>(operation: &str, result: DispatchResult<T>) -> DispatchResult<T> {
    if let Err(err) = &result {
        tracing::warn!(operation, code = err.code(), "{}", err);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::entity::{EntityBuilder, EntityClass};
    use crate::graph::factory::ClassCatalog;
    use crate::graph::value::{Value, ValueType};

    #[derive(Default)]
    struct Tally {
        hits: u32,
    }

    impl EntityClass for Tally {
        const CLASS_NAME: &'static str = "Tally";

        fn construct(_name: &str) -> anyhow::Result<Self> {
            Ok(Self::default())
        }

        fn describe(builder: &mut EntityBuilder<Self>) {
            builder
                .output("count", ValueType::Unsigned)
                .command("hit", vec![ValueType::Unsigned], "Add hits", |tally: &mut Tally, args| {
                    tally.hits += args[0].as_unsigned().unwrap_or_default();
                    Ok(Value::Unsigned(tally.hits))
                })
                .command("explode", vec![], "Always panics", |_tally: &mut Tally, _args| {
                    panic!("tally overflow")
                });
        }
    }

    fn dispatcher() -> Dispatcher {
        let catalog = ClassCatalog::new();
        catalog.register_class::<Tally>();
        Dispatcher::new(catalog.snapshot())
    }

    #[test]
    fn execute_converts_both_ways() {
        let dispatcher = dispatcher();
        let tally = dispatcher.create("Tally", "t").unwrap();
        let result = dispatcher
            .execute_command(tally, "hit", &[Dynamic::Int(3)])
            .unwrap();
        assert_eq!(result, Dynamic::Int(3));
    }

    #[test]
    fn panicking_actions_surface_as_execution_errors() {
        let dispatcher = dispatcher();
        let tally = dispatcher.create("Tally", "t").unwrap();
        let err = dispatcher.execute_command(tally, "explode", &[]).unwrap_err();
        assert_eq!(err.code(), "execution_error");
        assert!(err.to_string().contains("tally overflow"));
        // The dispatcher stays usable afterwards.
        assert_eq!(dispatcher.get_name(tally).unwrap(), "t");
    }

    #[test]
    fn entity_limit_is_enforced() {
        let catalog = ClassCatalog::new();
        catalog.register_class::<Tally>();
        let config = DispatcherConfig {
            max_entities: Some(1),
            ..DispatcherConfig::default()
        };
        let dispatcher = Dispatcher::with_config(catalog.snapshot(), config);
        dispatcher.create("Tally", "t1").unwrap();
        // Attaching to an existing instance does not count against the limit.
        dispatcher.create("Tally", "t1").unwrap();
        let err = dispatcher.create("Tally", "t2").unwrap_err();
        assert!(err.to_string().contains("entity limit of 1 reached"));
    }

    #[test]
    fn signal_names_resolve_through_the_pool() {
        let dispatcher = dispatcher();
        let tally = dispatcher.create("Tally", "t").unwrap();
        let signal = dispatcher.get_signal(tally, "count").unwrap();
        assert_eq!(signal.entity(), tally);
        assert_eq!(
            dispatcher.signal_name(&signal).unwrap(),
            "Tally(t)::output(unsigned)::count"
        );
        dispatcher.destroy(tally).unwrap();
        assert!(matches!(
            dispatcher.signal_name(&signal),
            Err(DispatchError::EntityFault(_))
        ));
    }
}
