//! Error types for the dispatch core
//!
//! Conversion failures are reported by the value bridge as [`ConversionError`];
//! everything that crosses the caller boundary is a [`DispatchError`].

use std::io;
use thiserror::Error;

use super::value::ValueType;

/// Failure while converting a dynamic value into a typed [`Value`](super::value::Value).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// The dynamic value has the wrong kind for the requested slot
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        /// Requested value type
        expected: ValueType,
        /// Kind of the dynamic value that was supplied
        found: &'static str,
    },

    /// Numeric value does not fit the requested type
    #[error("value {value} is out of range for {expected}")]
    OutOfRange {
        /// Requested value type
        expected: ValueType,
        /// Rendering of the offending value
        value: String,
    },

    /// Integer cannot be represented exactly by the requested floating type
    #[error("integer {value} cannot be represented exactly as {expected}")]
    PrecisionLoss {
        /// Requested value type
        expected: ValueType,
        /// The integer that was supplied
        value: i64,
    },

    /// Matrix rows of differing lengths
    #[error("matrix row {row} has {found} columns, expected {expected}")]
    RaggedMatrix {
        /// 0-based row index
        row: usize,
        /// Column count of the first row
        expected: usize,
        /// Column count of the offending row
        found: usize,
    },

    /// An element of an aggregate failed to convert
    #[error("element {index}: {source}")]
    Element {
        /// 0-based element index
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<ConversionError>,
    },

    /// Type name not part of the closed value type set
    #[error("unsupported value type '{0}'")]
    UnsupportedType(String),
}

impl ConversionError {
    pub(crate) fn element(index: usize, source: ConversionError) -> Self {
        ConversionError::Element {
            index,
            source: Box::new(source),
        }
    }
}

/// Errors surfaced by the boundary operations
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No constructor registered for the class
    #[error("unknown entity class '{0}'")]
    UnknownClass(String),

    /// An instance with this name exists under a different class
    #[error(
        "found an object named '{instance}' of class '{existing}', which differs from the requested class '{requested}'"
    )]
    ClassInconsistent {
        /// Instance name
        instance: String,
        /// Class of the live instance
        existing: String,
        /// Class requested by the caller
        requested: String,
    },

    /// Constructing a new entity failed
    #[error("failed to construct '{instance}' of class '{class}': {reason}")]
    ConstructionFailed {
        /// Requested class
        class: String,
        /// Requested instance name
        instance: String,
        /// Rendered cause
        reason: String,
    },

    /// Signal name not present on the entity
    #[error("signal '{signal}' is not referenced in entity '{entity}'")]
    UnknownSignal {
        /// Entity instance name
        entity: String,
        /// Signal name looked up
        signal: String,
    },

    /// Command name not present on the entity
    #[error("command '{command}' is not referenced in entity '{entity}'")]
    UnknownCommand {
        /// Entity instance name
        entity: String,
        /// Command name looked up
        command: String,
    },

    /// Argument count differs from the declared signature
    #[error("command '{command}' of entity '{entity}': expected {expected}, got {given}")]
    ArityMismatch {
        /// Entity instance name
        entity: String,
        /// Command name
        command: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        given: usize,
    },

    /// A single argument failed dynamic-to-typed conversion
    #[error("error while parsing argument {index}: {source}")]
    ArgumentConversion {
        /// 1-based argument index
        index: usize,
        /// Underlying conversion failure
        #[source]
        source: ConversionError,
    },

    /// The command's action raised
    #[error("command '{command}' failed: {message}")]
    Execution {
        /// Command name
        command: String,
        /// Original failure message
        message: String,
    },

    /// Invalid or stale handle, or a fault inside a read accessor
    #[error("entity fault: {0}")]
    EntityFault(String),
}

impl DispatchError {
    /// Stable machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::UnknownClass(_) => "unknown_class",
            DispatchError::ClassInconsistent { .. } => "class_inconsistent",
            DispatchError::ConstructionFailed { .. } => "construction_failed",
            DispatchError::UnknownSignal { .. } => "unknown_signal",
            DispatchError::UnknownCommand { .. } => "unknown_command",
            DispatchError::ArityMismatch { .. } => "arity_mismatch",
            DispatchError::ArgumentConversion { .. } => "argument_conversion",
            DispatchError::Execution { .. } => "execution_error",
            DispatchError::EntityFault(_) => "entity_fault",
        }
    }
}

/// Convenience result alias for boundary operations
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
