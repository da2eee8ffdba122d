//! Conversion between caller-side [`Dynamic`] values and typed [`Value`]s
//!
//! Conversion into a typed value is driven by the declared slot type and is
//! strict: kinds never coerce into each other except for exact integer to
//! floating point widening, which the dispatcher configuration can switch off.
//! Conversion back to the dynamic side is total.

use super::dynamic::Dynamic;
use super::error::ConversionError;
use super::value::{Matrix, Value, ValueType};

/// Largest magnitude an integer may have and still be exact as an f64.
const MAX_EXACT_DOUBLE: u64 = 1 << 53;

/// Largest magnitude an integer may have and still be exact as an f32.
const MAX_EXACT_FLOAT: u64 = 1 << 24;

/// Bidirectional converter between [`Dynamic`] and [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueBridge {
    widen_integers: bool,
}

impl Default for ValueBridge {
    fn default() -> Self {
        Self {
            widen_integers: true,
        }
    }
}

impl ValueBridge {
    /// Create a bridge with an explicit integer widening policy.
    pub fn new(widen_integers: bool) -> Self {
        Self { widen_integers }
    }

    /// Whether integers are accepted for floating point slots.
    pub fn widens_integers(&self) -> bool {
        self.widen_integers
    }

    /// Convert `dynamic` into a value of type `expected`.
    pub fn from_dynamic(
        &self,
        dynamic: &Dynamic,
        expected: ValueType,
    ) -> Result<Value, ConversionError> {
        match expected {
            ValueType::None => match dynamic {
                Dynamic::None => Ok(Value::None),
                other => Err(mismatch(expected, other)),
            },
            ValueType::Bool => match dynamic {
                Dynamic::Bool(flag) => Ok(Value::Bool(*flag)),
                other => Err(mismatch(expected, other)),
            },
            ValueType::Unsigned => {
                let num = integer(dynamic, expected)?;
                u32::try_from(num)
                    .map(Value::Unsigned)
                    .map_err(|_| out_of_range(expected, num))
            }
            ValueType::Int => {
                let num = integer(dynamic, expected)?;
                i32::try_from(num)
                    .map(Value::Int)
                    .map_err(|_| out_of_range(expected, num))
            }
            ValueType::Float => self.float(dynamic).map(Value::Float),
            ValueType::Double => self.double(dynamic, expected).map(Value::Double),
            ValueType::String => match dynamic {
                Dynamic::Str(text) => Ok(Value::String(text.clone())),
                other => Err(mismatch(expected, other)),
            },
            ValueType::Vector => self.vector(dynamic, expected).map(Value::Vector),
            ValueType::Matrix => self.matrix(dynamic).map(Value::Matrix),
            ValueType::Values => match dynamic {
                Dynamic::List(items) => infer_items(items).map(Value::Values),
                other => Err(mismatch(expected, other)),
            },
        }
    }

    /// Convert a typed value back to its dynamic representation.
    pub fn to_dynamic(value: &Value) -> Dynamic {
        match value {
            Value::None => Dynamic::None,
            Value::Bool(flag) => Dynamic::Bool(*flag),
            Value::Unsigned(num) => Dynamic::Int(i64::from(*num)),
            Value::Int(num) => Dynamic::Int(i64::from(*num)),
            Value::Float(num) => Dynamic::Float(f64::from(*num)),
            Value::Double(num) => Dynamic::Float(*num),
            Value::String(text) => Dynamic::Str(text.clone()),
            Value::Vector(items) => numbers(items),
            Value::Matrix(matrix) => Dynamic::List(matrix.iter_rows().map(numbers).collect()),
            Value::Values(items) => Dynamic::List(items.iter().map(Self::to_dynamic).collect()),
        }
    }

    fn double(&self, dynamic: &Dynamic, expected: ValueType) -> Result<f64, ConversionError> {
        match dynamic {
            Dynamic::Float(num) => Ok(*num),
            Dynamic::Int(num) if self.widen_integers => {
                if num.unsigned_abs() <= MAX_EXACT_DOUBLE {
                    Ok(*num as f64)
                } else {
                    Err(ConversionError::PrecisionLoss {
                        expected,
                        value: *num,
                    })
                }
            }
            other => Err(mismatch(expected, other)),
        }
    }

    fn float(&self, dynamic: &Dynamic) -> Result<f32, ConversionError> {
        let expected = ValueType::Float;
        match dynamic {
            Dynamic::Float(num) => {
                if num.is_finite() && num.abs() > f64::from(f32::MAX) {
                    Err(ConversionError::OutOfRange {
                        expected,
                        value: num.to_string(),
                    })
                } else {
                    Ok(*num as f32)
                }
            }
            Dynamic::Int(num) if self.widen_integers => {
                if num.unsigned_abs() <= MAX_EXACT_FLOAT {
                    Ok(*num as f32)
                } else {
                    Err(ConversionError::PrecisionLoss {
                        expected,
                        value: *num,
                    })
                }
            }
            other => Err(mismatch(expected, other)),
        }
    }

    fn vector(&self, dynamic: &Dynamic, expected: ValueType) -> Result<Vec<f64>, ConversionError> {
        let items = dynamic
            .as_list()
            .ok_or_else(|| mismatch(expected, dynamic))?;
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.double(item, ValueType::Double)
                    .map_err(|err| ConversionError::element(index, err))
            })
            .collect()
    }

    fn matrix(&self, dynamic: &Dynamic) -> Result<Matrix, ConversionError> {
        let rows = dynamic
            .as_list()
            .ok_or_else(|| mismatch(ValueType::Matrix, dynamic))?;
        let rows = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                self.vector(row, ValueType::Vector)
                    .map_err(|err| ConversionError::element(index, err))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Matrix::from_rows(rows)
    }
}

fn mismatch(expected: ValueType, found: &Dynamic) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        found: found.kind(),
    }
}

fn out_of_range(expected: ValueType, num: i64) -> ConversionError {
    ConversionError::OutOfRange {
        expected,
        value: num.to_string(),
    }
}

fn integer(dynamic: &Dynamic, expected: ValueType) -> Result<i64, ConversionError> {
    match dynamic {
        Dynamic::Int(num) => Ok(*num),
        other => Err(mismatch(expected, other)),
    }
}

fn numbers(items: &[f64]) -> Dynamic {
    Dynamic::List(items.iter().map(|num| Dynamic::Float(*num)).collect())
}

fn infer_items(items: &[Dynamic]) -> Result<Vec<Value>, ConversionError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| infer(item).map_err(|err| ConversionError::element(index, err)))
        .collect()
}

/// Element kinds of a `values` slot are taken from the dynamic side.
fn infer(dynamic: &Dynamic) -> Result<Value, ConversionError> {
    match dynamic {
        Dynamic::None => Ok(Value::None),
        Dynamic::Bool(flag) => Ok(Value::Bool(*flag)),
        Dynamic::Int(num) => {
            if let Ok(small) = i32::try_from(*num) {
                Ok(Value::Int(small))
            } else if let Ok(unsigned) = u32::try_from(*num) {
                Ok(Value::Unsigned(unsigned))
            } else {
                Err(out_of_range(ValueType::Int, *num))
            }
        }
        Dynamic::Float(num) => Ok(Value::Double(*num)),
        Dynamic::Str(text) => Ok(Value::String(text.clone())),
        Dynamic::List(items) => infer_items(items).map(Value::Values),
    }
}
