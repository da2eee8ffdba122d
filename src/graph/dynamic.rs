//! Host-side dynamic values
//!
//! This is the loosely typed representation a scripting caller hands to the
//! dispatcher. It serializes as plain JSON so the stdio service can pass it
//! through unchanged.

use serde::{Deserialize, Serialize};

/// Dynamically typed value as seen by the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dynamic {
    /// Absence of a value (`null`)
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// String
    Str(String),
    /// Ordered sequence
    List(Vec<Dynamic>),
}

impl Dynamic {
    /// Name of the dynamic kind, used in conversion diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Dynamic::None => "none",
            Dynamic::Bool(_) => "bool",
            Dynamic::Int(_) => "int",
            Dynamic::Float(_) => "float",
            Dynamic::Str(_) => "string",
            Dynamic::List(_) => "list",
        }
    }

    /// Borrow the list payload, if any.
    pub fn as_list(&self) -> Option<&[Dynamic]> {
        match self {
            Dynamic::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Dynamic {
    fn from(flag: bool) -> Self {
        Dynamic::Bool(flag)
    }
}

impl From<i64> for Dynamic {
    fn from(num: i64) -> Self {
        Dynamic::Int(num)
    }
}

impl From<i32> for Dynamic {
    fn from(num: i32) -> Self {
        Dynamic::Int(i64::from(num))
    }
}

impl From<f64> for Dynamic {
    fn from(num: f64) -> Self {
        Dynamic::Float(num)
    }
}

impl From<&str> for Dynamic {
    fn from(text: &str) -> Self {
        Dynamic::Str(text.to_string())
    }
}

impl From<String> for Dynamic {
    fn from(text: String) -> Self {
        Dynamic::Str(text)
    }
}

impl From<Vec<Dynamic>> for Dynamic {
    fn from(items: Vec<Dynamic>) -> Self {
        Dynamic::List(items)
    }
}
