//! Dyngraph – reflective dispatch core for statically typed entity graphs
//!
//! This crate lets a dynamically typed caller (a scripting or orchestration
//! layer) drive a graph of statically typed entities without linking against
//! their concrete types:
//! - Entities are minted by class name and uniquely named in a pool
//! - Callers hold opaque handles that are re-validated on every access
//! - Commands declare typed signatures; arguments are converted and checked
//!   before anything runs
//! - Signals are exposed as named handles for the dataflow engine to wire up

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Entity graph core: values, pool, factory, commands and the dispatcher
pub mod graph;

/// NDJSON session driving a dispatcher over a reader/writer pair
pub mod service;

/// Stock entity classes
pub mod stock;

// Re-export key types for convenience
pub use graph::{Dispatcher, DispatcherConfig};

/// Current version of the dyngraph crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version for the NDJSON service
pub const PROTOCOL_VERSION: &str = "1.0.0";
