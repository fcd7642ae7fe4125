//! Window resolution: turns the caller's window argument into one
//! [`WindowSpec`] per task-column.
//!
//! Fixed mode takes a vector of widths (one task-column per width). Adaptive
//! mode takes one width array per task-column, each giving the width at every
//! output position.

use crate::error::{RollError, RollResult};
use crate::options::Align;
use crate::series::{Input, Vector};
use std::borrow::Cow;

/// Canonical window descriptor for one task-column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WindowSpec {
    Fixed(usize),
    /// Width per output position; length equals the series length.
    Adaptive(Vec<usize>),
}

impl WindowSpec {
    /// Width used for the output at `index`.
    pub fn width_at(&self, index: usize) -> usize {
        match self {
            WindowSpec::Fixed(width) => *width,
            WindowSpec::Adaptive(widths) => widths[index],
        }
    }

    /// Largest width this descriptor can request.
    pub fn max_width(&self) -> usize {
        match self {
            WindowSpec::Fixed(width) => *width,
            WindowSpec::Adaptive(widths) => widths.iter().copied().max().unwrap_or(0),
        }
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, WindowSpec::Adaptive(_))
    }
}

/// Resolves the window argument against the normalized series.
pub fn resolve_windows(
    window: &Input,
    adaptive: bool,
    align: Align,
    series: &[Cow<'_, [f64]>],
) -> RollResult<Vec<WindowSpec>> {
    if window.is_empty() {
        return Err(RollError::EmptyWindowSpec);
    }

    if adaptive {
        resolve_adaptive(window, align, series)
    } else {
        resolve_fixed(window)
    }
}

fn resolve_fixed(window: &Input) -> RollResult<Vec<WindowSpec>> {
    let vector = match window {
        Input::Atomic(vector) => vector,
        Input::List(_) => {
            return Err(RollError::InvalidInputType {
                what: "n (list is accepted for adaptive only)",
                position: 1,
                found: "list",
            })
        }
    };

    let widths = integer_widths(vector, 1)?;
    widths
        .iter()
        .enumerate()
        .map(|(index, width)| positive_width(*width, index + 1).map(WindowSpec::Fixed))
        .collect()
}

fn resolve_adaptive(
    window: &Input,
    align: Align,
    series: &[Cow<'_, [f64]>],
) -> RollResult<Vec<WindowSpec>> {
    let arrays: Vec<&Vector> = match window {
        Input::Atomic(vector) => vec![vector],
        Input::List(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Input::Atomic(vector) => Ok(vector),
                Input::List(_) => Err(RollError::InvalidInputType {
                    what: "n",
                    position: index + 1,
                    found: "list",
                }),
            })
            .collect::<RollResult<_>>()?,
    };

    let widths = arrays
        .iter()
        .enumerate()
        .map(|(index, vector)| integer_widths(vector, index + 1))
        .collect::<RollResult<Vec<_>>>()?;

    if align != Align::Right {
        return Err(RollError::UnsupportedAlignmentForAdaptive);
    }

    // Every series must agree on length before any width array is compared.
    let expected = series.first().map_or(0, |first| first.len());
    if let Some((index, found)) = series
        .iter()
        .enumerate()
        .find(|(_, column)| column.len() != expected)
    {
        return Err(RollError::InconsistentSeriesLength {
            position: index + 1,
            expected,
            found: found.len(),
        });
    }

    widths
        .into_iter()
        .enumerate()
        .map(|(index, array)| {
            if array.len() != expected {
                return Err(RollError::WindowLengthMismatch {
                    position: index + 1,
                    expected,
                    found: array.len(),
                });
            }
            array
                .iter()
                .enumerate()
                .map(|(offset, width)| {
                    positive_width(*width, offset + 1).map_err(|_| RollError::InvalidWindowWidth {
                        position: offset + 1,
                        value: format!("{} in window {}", describe(*width), index + 1),
                    })
                })
                .collect::<RollResult<Vec<_>>>()
                .map(WindowSpec::Adaptive)
        })
        .collect()
}

/// Reads an integer or integer-valued real vector. `None` marks a missing width.
fn integer_widths(vector: &Vector, position: usize) -> RollResult<Vec<Option<i64>>> {
    match vector {
        Vector::Integer(values) => Ok(values.iter().map(|v| v.map(i64::from)).collect()),
        Vector::Real(values) => values
            .iter()
            .map(|&value| {
                if value.is_nan() {
                    Ok(None)
                } else if value.abs() > f64::from(i32::MAX) {
                    Err(RollError::InvalidInputType {
                        what: "n",
                        position,
                        found: "out-of-range double",
                    })
                } else if value.fract() != 0.0 {
                    Err(RollError::InvalidInputType {
                        what: "n",
                        position,
                        found: "non-integer double",
                    })
                } else {
                    Ok(Some(value as i64))
                }
            })
            .collect(),
        other => Err(RollError::InvalidInputType {
            what: "n",
            position,
            found: other.type_name(),
        }),
    }
}

fn positive_width(width: Option<i64>, position: usize) -> RollResult<usize> {
    match width {
        Some(value) if value > 0 => Ok(value as usize),
        other => Err(RollError::InvalidWindowWidth {
            position,
            value: describe(other),
        }),
    }
}

fn describe(width: Option<i64>) -> String {
    width.map_or_else(|| "NA".to_string(), |value| value.to_string())
}
