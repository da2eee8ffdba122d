//! Entity graph core and its caller-facing dispatcher
//!
//! This module ties together the pieces a dynamic caller needs to drive a
//! graph of statically typed entities: the pool and factory that name and
//! mint instances, the value bridge that checks and converts arguments, and
//! the [`Dispatcher`] facade exposing the boundary operations.

use serde::{Deserialize, Serialize};
use std::path::Path;

// Submodules
pub mod bridge;
pub mod command;
pub mod dispatch;
pub mod dynamic;
pub mod entity;
pub mod error;
pub mod factory;
pub mod pool;
pub mod signal;
pub mod value;

use error::ConfigError;

/// Configuration for a [`Dispatcher`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Accept exactly representable integers for floating point parameters
    pub widen_integers: bool,

    /// Log every converted argument list at debug level
    pub trace_arguments: bool,

    /// Upper bound on live entities (unbounded when absent)
    pub max_entities: Option<usize>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            widen_integers: true,
            trace_arguments: false,
            max_entities: None,
        }
    }
}

impl DispatcherConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}

// Re-export commonly used types
pub use bridge::ValueBridge;
pub use command::Command;
pub use dispatch::Dispatcher;
pub use dynamic::Dynamic;
pub use entity::{Entity, EntityBuilder, EntityClass};
pub use error::{ConversionError, DispatchError, DispatchResult};
pub use factory::{ClassCatalog, EntityFactory};
pub use pool::{EntityHandle, EntityPool};
pub use signal::{Signal, SignalDirection, SignalHandle};
pub use value::{Matrix, Value, ValueType};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_round_trips_through_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("dispatcher.json");
        let config = DispatcherConfig {
            widen_integers: false,
            trace_arguments: true,
            max_entities: Some(8),
        };
        config.save(&path).unwrap();
        assert_eq!(DispatcherConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.json");
        std::fs::write(&path, br#"{"max_entities": 2}"#).unwrap();
        let config = DispatcherConfig::load(&path).unwrap();
        assert!(config.widen_integers);
        assert_eq!(config.max_entities, Some(2));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let err = DispatcherConfig::load(&temp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
