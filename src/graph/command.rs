//! Typed, remotely invocable entity commands

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::value::{Value, ValueType};

type Action = Arc<dyn Fn(&mut dyn Any, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// A named operation with a declared parameter signature.
///
/// The action is bound to the concrete entity type at registration; the
/// dispatcher hands it the entity state together with an argument list that
/// has already been converted slot by slot.
#[derive(Clone)]
pub struct Command {
    params: Vec<ValueType>,
    docstring: String,
    action: Action,
}

impl Command {
    /// Bind `action` to entity state of type `T`.
    pub fn new<T, F>(params: Vec<ValueType>, docstring: impl Into<String>, action: F) -> Self
    where
        T: Any,
        F: Fn(&mut T, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let action: Action = Arc::new(move |state: &mut dyn Any, args: &[Value]| {
            let concrete = state
                .downcast_mut::<T>()
                .expect("command bound to an entity of a different type");
            action(concrete, args)
        });

        Self {
            params,
            docstring: docstring.into(),
            action,
        }
    }

    /// Declared parameter types, in order.
    pub fn params(&self) -> &[ValueType] {
        &self.params
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Human-readable documentation.
    pub fn docstring(&self) -> &str {
        &self.docstring
    }

    /// Whether `args` matches the declared signature exactly.
    pub fn accepts(&self, args: &[Value]) -> bool {
        args.len() == self.params.len()
            && args
                .iter()
                .zip(&self.params)
                .all(|(arg, ty)| arg.value_type() == *ty)
    }

    /// Run the action against `state`.
    pub(crate) fn execute(&self, state: &mut dyn Any, args: &[Value]) -> anyhow::Result<Value> {
        anyhow::ensure!(
            self.accepts(args),
            "arguments do not match signature {}",
            Signature(&self.params)
        );
        (self.action)(state, args)
    }

    /// Render the parameter list, e.g. `(int, int)`.
    pub fn signature(&self) -> String {
        Signature(&self.params).to_string()
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("params", &self.params)
            .field("docstring", &self.docstring)
            .finish_non_exhaustive()
    }
}

struct Signature<'a>(&'a [ValueType]);

impl fmt::Display for Signature<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (idx, ty) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}
