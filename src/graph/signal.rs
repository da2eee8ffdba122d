//! Signal descriptors
//!
//! Signals are data ports declared by an entity. The dispatcher only names
//! and enumerates them; propagating values along them is the job of the
//! dataflow engine that owns the graph.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::pool::EntityHandle;
use super::value::ValueType;

/// Direction of a signal relative to its owning entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    /// Consumed by the entity
    Input,
    /// Produced by the entity
    Output,
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::Input => f.write_str("input"),
            SignalDirection::Output => f.write_str("output"),
        }
    }
}

/// A named data port owned by an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    name: String,
    direction: SignalDirection,
    value_type: ValueType,
    path: String,
}

impl Signal {
    pub(crate) fn new(
        class_name: &str,
        instance: &str,
        name: &str,
        direction: SignalDirection,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.to_string(),
            direction,
            value_type,
            path: format!("{class_name}({instance})::{direction}({value_type})::{name}"),
        }
    }

    /// Short name, unique within the owning entity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input or output.
    pub fn direction(&self) -> SignalDirection {
        self.direction
    }

    /// Routing type token.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Fully qualified name, e.g. `Adder(a1)::input(int)::in1`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Opaque, non-owning reference to a signal of a live entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalHandle {
    entity: EntityHandle,
    name: String,
}

impl SignalHandle {
    pub(crate) fn new(entity: EntityHandle, name: impl Into<String>) -> Self {
        Self {
            entity,
            name: name.into(),
        }
    }

    /// Handle of the owning entity.
    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_names_class_instance_direction_and_type() {
        let signal = Signal::new("Adder", "a1", "in1", SignalDirection::Input, ValueType::Int);
        assert_eq!(signal.path(), "Adder(a1)::input(int)::in1");
        assert_eq!(signal.name(), "in1");
        assert_eq!(signal.direction(), SignalDirection::Input);
    }
}
