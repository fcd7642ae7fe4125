//! Input values and the series normalizer.
//!
//! Callers hand over either one atomic vector or a list of vectors. The
//! normalizer turns that into an ordered list of `f64` buffers, borrowing real
//! vectors and coercing integer/logical ones.

use crate::error::{RollError, RollResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Missing-value sentinel: a NaN whose low payload word is 1954.
///
/// Ordinary arithmetic NaN does not carry this payload, so [`is_na`] can tell
/// the two apart.
pub const NA_REAL: f64 = f64::from_bits(0x7FF0_0000_0000_07A2);

/// True when `value` is the missing-value sentinel (not just any NaN).
pub fn is_na(value: f64) -> bool {
    value.is_nan() && (value.to_bits() & 0xFFFF_FFFF) == 1954
}

/// A typed atomic vector as received from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Vector {
    Real(Vec<f64>),
    /// `None` marks a missing integer.
    Integer(Vec<Option<i32>>),
    /// `None` marks a missing logical.
    Logical(Vec<Option<bool>>),
    Character(Vec<Option<String>>),
    Complex(Vec<(f64, f64)>),
}

impl Vector {
    pub fn len(&self) -> usize {
        match self {
            Vector::Real(v) => v.len(),
            Vector::Integer(v) => v.len(),
            Vector::Logical(v) => v.len(),
            Vector::Character(v) => v.len(),
            Vector::Complex(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Vector::Real(_) => "double",
            Vector::Integer(_) => "integer",
            Vector::Logical(_) => "logical",
            Vector::Character(_) => "character",
            Vector::Complex(_) => "complex",
        }
    }

    /// Borrows real data, coerces integer/logical data, rejects anything else.
    pub(crate) fn to_real(&self) -> Option<Cow<'_, [f64]>> {
        match self {
            Vector::Real(values) => Some(Cow::Borrowed(values.as_slice())),
            Vector::Integer(values) => Some(Cow::Owned(
                values
                    .iter()
                    .map(|v| v.map_or(NA_REAL, f64::from))
                    .collect(),
            )),
            Vector::Logical(values) => Some(Cow::Owned(
                values
                    .iter()
                    .map(|v| match v {
                        Some(true) => 1.0,
                        Some(false) => 0.0,
                        None => NA_REAL,
                    })
                    .collect(),
            )),
            Vector::Character(_) | Vector::Complex(_) => None,
        }
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Vector::Real(values)
    }
}

impl From<Vec<i32>> for Vector {
    fn from(values: Vec<i32>) -> Self {
        Vector::Integer(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<bool>> for Vector {
    fn from(values: Vec<bool>) -> Self {
        Vector::Logical(values.into_iter().map(Some).collect())
    }
}

/// Either one atomic vector or an ordered list of values (a table's columns).
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Atomic(Vector),
    List(Vec<Input>),
}

impl Input {
    /// Number of top-level elements: vector length, or number of list items.
    pub fn len(&self) -> usize {
        match self {
            Input::Atomic(vector) => vector.len(),
            Input::List(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Input::Atomic(_))
    }

    /// Builds a list input from real columns.
    pub fn columns<I, V>(columns: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vector>,
    {
        Input::List(
            columns
                .into_iter()
                .map(|column| Input::Atomic(column.into()))
                .collect(),
        )
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Input::Atomic(vector) => vector.type_name(),
            Input::List(_) => "list",
        }
    }
}

impl From<Vector> for Input {
    fn from(vector: Vector) -> Self {
        Input::Atomic(vector)
    }
}

impl From<Vec<f64>> for Input {
    fn from(values: Vec<f64>) -> Self {
        Input::Atomic(Vector::Real(values))
    }
}

impl From<Vec<i32>> for Input {
    fn from(values: Vec<i32>) -> Self {
        Input::Atomic(values.into())
    }
}

impl From<Vec<bool>> for Input {
    fn from(values: Vec<bool>) -> Self {
        Input::Atomic(values.into())
    }
}

/// Normalizes the source argument into one `f64` buffer per column.
///
/// Positions in errors are 1-based; an atomic input is position 1.
pub fn normalize_source(source: &Input) -> RollResult<Vec<Cow<'_, [f64]>>> {
    let invalid = |position: usize, found: &'static str| RollError::InvalidInputType {
        what: "x",
        position,
        found,
    };

    match source {
        Input::Atomic(vector) => {
            let series = vector.to_real().ok_or_else(|| invalid(1, vector.type_name()))?;
            Ok(vec![series])
        }
        Input::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Input::Atomic(vector) => vector
                    .to_real()
                    .ok_or_else(|| invalid(index + 1, vector.type_name())),
                Input::List(_) => Err(invalid(index + 1, item.type_name())),
            })
            .collect(),
    }
}
