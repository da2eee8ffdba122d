//! Typed values exchanged with commands
//!
//! [`Value`] is the closed tagged union every command parameter and result is
//! expressed in. [`ValueType`] enumerates its tags and doubles as the declared
//! parameter type of a command slot.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ConversionError;

/// Tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// No value (commands without a result)
    None,
    /// Boolean
    Bool,
    /// 32-bit unsigned integer
    Unsigned,
    /// 32-bit signed integer
    Int,
    /// Single precision float
    Float,
    /// Double precision float
    Double,
    /// UTF-8 string
    String,
    /// Column vector of doubles
    Vector,
    /// Dense row-major matrix of doubles
    Matrix,
    /// Nested heterogeneous sequence of values
    Values,
}

impl ValueType {
    /// Every value type, in declaration order.
    pub const ALL: [ValueType; 10] = [
        ValueType::None,
        ValueType::Bool,
        ValueType::Unsigned,
        ValueType::Int,
        ValueType::Float,
        ValueType::Double,
        ValueType::String,
        ValueType::Vector,
        ValueType::Matrix,
        ValueType::Values,
    ];

    /// Stable lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::None => "none",
            ValueType::Bool => "bool",
            ValueType::Unsigned => "unsigned",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Double => "double",
            ValueType::String => "string",
            ValueType::Vector => "vector",
            ValueType::Matrix => "matrix",
            ValueType::Values => "values",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ValueType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValueType::ALL
            .iter()
            .copied()
            .find(|ty| ty.name() == s)
            .ok_or_else(|| ConversionError::UnsupportedType(s.to_string()))
    }
}

/// Dense row-major matrix of doubles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build a matrix from rows, rejecting ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ConversionError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != cols {
                return Err(ConversionError::RaggedMatrix {
                    row,
                    expected: cols,
                    found: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Borrow row `index`, or `None` past the last row.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index < self.rows {
            Some(&self.data[index * self.cols..(index + 1) * self.cols])
        } else {
            None
        }
    }

    /// Rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).filter_map(move |index| self.row(index))
    }

    /// Element at (`row`, `col`).
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }
}

/// Typed value carried by command parameters and results.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value
    None,
    /// Boolean
    Bool(bool),
    /// 32-bit unsigned integer
    Unsigned(u32),
    /// 32-bit signed integer
    Int(i32),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Column vector of doubles
    Vector(Vec<f64>),
    /// Dense matrix of doubles
    Matrix(Matrix),
    /// Nested heterogeneous sequence
    Values(Vec<Value>),
}

impl Value {
    /// Tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::None => ValueType::None,
            Value::Bool(_) => ValueType::Bool,
            Value::Unsigned(_) => ValueType::Unsigned,
            Value::Int(_) => ValueType::Int,
            Value::Float(_) => ValueType::Float,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::Vector(_) => ValueType::Vector,
            Value::Matrix(_) => ValueType::Matrix,
            Value::Values(_) => ValueType::Values,
        }
    }

    /// Boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    /// Signed integer payload, if any.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(num) => Some(*num),
            _ => None,
        }
    }

    /// Unsigned integer payload, if any.
    pub fn as_unsigned(&self) -> Option<u32> {
        match self {
            Value::Unsigned(num) => Some(*num),
            _ => None,
        }
    }

    /// Floating payload of either precision, widened to f64.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(num) => Some(*num),
            Value::Float(num) => Some(f64::from(*num)),
            _ => None,
        }
    }

    /// String payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }
}

fn write_numbers(f: &mut fmt::Formatter<'_>, numbers: &[f64]) -> fmt::Result {
    f.write_str("[")?;
    for (idx, num) in numbers.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", num)?;
    }
    f.write_str("]")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(flag) => write!(f, "{}", flag),
            Value::Unsigned(num) => write!(f, "{}", num),
            Value::Int(num) => write!(f, "{}", num),
            Value::Float(num) => write!(f, "{}", num),
            Value::Double(num) => write!(f, "{}", num),
            Value::String(text) => write!(f, "{:?}", text),
            Value::Vector(items) => write_numbers(f, items),
            Value::Matrix(matrix) => {
                f.write_str("[")?;
                for (idx, row) in matrix.iter_rows().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_numbers(f, row)?;
                }
                f.write_str("]")
            }
            Value::Values(items) => {
                f.write_str("(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_parse_back() {
        for ty in ValueType::ALL {
            assert_eq!(ty.name().parse::<ValueType>().unwrap(), ty);
        }
        assert!(matches!(
            "quaternion".parse::<ValueType>(),
            Err(ConversionError::UnsupportedType(name)) if name == "quaternion"
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            ConversionError::RaggedMatrix {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn matrix_rows_and_elements() {
        let matrix = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 2);
        assert_eq!(matrix.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(matrix.get(0, 1), Some(2.0));
        assert_eq!(matrix.get(2, 0), None);
    }

    #[test]
    fn row_past_the_end_is_none() {
        let matrix = Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(matrix.row(2), None);
        assert_eq!(matrix.iter_rows().count(), 2);
        assert_eq!(Matrix::zeros(0, 3).row(0), None);
    }

    #[test]
    fn zero_column_matrix_keeps_row_count() {
        let matrix = Matrix::from_rows(vec![vec![], vec![]]).unwrap();
        assert_eq!(matrix.rows(), 2);
        assert_eq!(matrix.cols(), 0);
        assert_eq!(matrix.row(1), Some(&[][..]));
        assert_eq!(matrix.iter_rows().count(), 2);
    }

    #[test]
    fn display_renders_nested_values() {
        let value = Value::Values(vec![
            Value::Int(3),
            Value::String("x".into()),
            Value::Vector(vec![1.0, 2.5]),
        ]);
        assert_eq!(value.to_string(), "(3, \"x\", [1, 2.5])");
        assert_eq!(value.value_type(), ValueType::Values);
    }
}
