//! Entities: named instances exposing signals and commands
//!
//! Concrete entity types implement [`EntityClass`]. When an instance is
//! minted, the class declares its signals and commands on a typed
//! [`EntityBuilder`], which erases the concrete type into an [`Entity`] the
//! pool can hold next to instances of every other class.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::marker::PhantomData;

use super::command::Command;
use super::signal::{Signal, SignalDirection};
use super::value::{Value, ValueType};

/// A statically typed entity class that can be instantiated by name.
pub trait EntityClass: Any + Send + Sized {
    /// Class name used by callers to request instances
    const CLASS_NAME: &'static str;

    /// Class documentation
    const DOCSTRING: &'static str = "";

    /// Construct the state of a new instance called `name`.
    fn construct(name: &str) -> anyhow::Result<Self>;

    /// Declare the signals and commands of an instance.
    fn describe(_builder: &mut EntityBuilder<Self>) {}

    /// Append class-specific lines to the entity description.
    fn display(&self, _out: &mut dyn Write) -> fmt::Result {
        Ok(())
    }
}

/// Type-erased entity state.
pub trait EntityState: Send {
    /// Access the state for downcasting by bound commands.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Append class-specific lines to the entity description.
    fn display_state(&self, out: &mut dyn Write) -> fmt::Result;
}

impl<T: EntityClass> EntityState for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn display_state(&self, out: &mut dyn Write) -> fmt::Result {
        self.display(out)
    }
}

/// Collects the declarations of an instance of `T`.
pub struct EntityBuilder<T> {
    class_name: String,
    name: String,
    docstring: String,
    signals: BTreeMap<String, Signal>,
    commands: BTreeMap<String, Command>,
    duplicates: Vec<String>,
    _state: PhantomData<fn(&mut T)>,
}

impl<T: Any + Send> EntityBuilder<T> {
    /// Start declaring an instance `name` of class `class_name`.
    pub fn new(class_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            name: name.into(),
            docstring: String::new(),
            signals: BTreeMap::new(),
            commands: BTreeMap::new(),
            duplicates: Vec::new(),
            _state: PhantomData,
        }
    }

    /// Instance name being built.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the entity documentation.
    pub fn docstring(&mut self, docstring: impl Into<String>) -> &mut Self {
        self.docstring = docstring.into();
        self
    }

    /// Declare a signal.
    pub fn signal(
        &mut self,
        name: &str,
        direction: SignalDirection,
        value_type: ValueType,
    ) -> &mut Self {
        let signal = Signal::new(&self.class_name, &self.name, name, direction, value_type);
        if self.signals.insert(name.to_string(), signal).is_some() {
            self.duplicates.push(format!("signal '{name}'"));
        }
        self
    }

    /// Declare an input signal.
    pub fn input(&mut self, name: &str, value_type: ValueType) -> &mut Self {
        self.signal(name, SignalDirection::Input, value_type)
    }

    /// Declare an output signal.
    pub fn output(&mut self, name: &str, value_type: ValueType) -> &mut Self {
        self.signal(name, SignalDirection::Output, value_type)
    }

    /// Declare a command bound to the entity state.
    pub fn command<F>(
        &mut self,
        name: &str,
        params: Vec<ValueType>,
        docstring: &str,
        action: F,
    ) -> &mut Self
    where
        F: Fn(&mut T, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let command = Command::new::<T, F>(params, docstring, action);
        if self.commands.insert(name.to_string(), command).is_some() {
            self.duplicates.push(format!("command '{name}'"));
        }
        self
    }

    /// Finish the declarations and attach `state`.
    pub fn build(self, state: T) -> anyhow::Result<Entity>
    where
        T: EntityState + 'static,
    {
        if !self.duplicates.is_empty() {
            anyhow::bail!("duplicate declarations: {}", self.duplicates.join(", "));
        }

        Ok(Entity {
            class_name: self.class_name,
            name: self.name,
            docstring: self.docstring,
            signals: self.signals,
            commands: self.commands,
            state: Box::new(state),
        })
    }
}

/// A live entity instance.
pub struct Entity {
    class_name: String,
    name: String,
    docstring: String,
    signals: BTreeMap<String, Signal>,
    commands: BTreeMap<String, Command>,
    state: Box<dyn EntityState>,
}

impl Entity {
    /// Instantiate class `T` under `name`.
    pub fn from_class<T: EntityClass>(name: &str) -> anyhow::Result<Self> {
        let state = T::construct(name)?;
        let mut builder = EntityBuilder::<T>::new(T::CLASS_NAME, name);
        builder.docstring(T::DOCSTRING);
        T::describe(&mut builder);
        builder.build(state)
    }

    /// Class this instance belongs to.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Unique instance name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity documentation.
    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    /// Look up a signal by exact name.
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    /// Signals in name order.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.values()
    }

    /// Look up a command by exact name.
    pub fn command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Command names in name order.
    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Run `command` (taken from this entity) with already converted arguments.
    pub(crate) fn execute(&mut self, command: &Command, args: &[Value]) -> anyhow::Result<Value> {
        command.execute(self.state.as_any_mut(), args)
    }

    /// Human-readable description of the entity.
    pub fn display(&self) -> Result<String, fmt::Error> {
        let mut out = String::new();
        writeln!(out, "{} {}", self.class_name, self.name)?;
        if !self.docstring.is_empty() {
            writeln!(out, "  {}", self.docstring)?;
        }
        writeln!(out, "  signals:")?;
        for signal in self.signals.values() {
            writeln!(out, "    {}", signal.path())?;
        }
        writeln!(out, "  commands:")?;
        for (name, command) in &self.commands {
            writeln!(out, "    {}{}: {}", name, command.signature(), command.docstring())?;
        }
        self.state.display_state(&mut out)?;
        Ok(out)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("class_name", &self.class_name)
            .field("name", &self.name)
            .field("signals", &self.signals.keys().collect::<Vec<_>>())
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
