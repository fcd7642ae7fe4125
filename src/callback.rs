//! Bridge to user-supplied window functions.
//!
//! A host callback is not assumed to be thread-safe or re-entrant, so every
//! invocation goes through the single callback lane owned by the dispatcher.

use crate::series::{Vector, NA_REAL};

/// A function evaluated once per output position on the current window.
///
/// The returned value must be a single real, integer or logical (missing is
/// allowed). An `Err` aborts the task with a fatal status.
pub trait HostCallback {
    fn invoke(&mut self, frame: &CallFrame) -> Result<Vector, String>;
}

impl<F> HostCallback for F
where
    F: FnMut(&[f64]) -> f64,
{
    fn invoke(&mut self, frame: &CallFrame) -> Result<Vector, String> {
        Ok(Vector::Real(vec![(*self)(frame.window())]))
    }
}

/// Reusable window buffer for one window spec.
///
/// It is overwritten before each call and lives only for the dispatch loop,
/// so a callback must not keep the slice it is handed.
#[derive(Debug)]
pub struct CallFrame {
    window: Vec<f64>,
}

impl CallFrame {
    pub(crate) fn with_capacity(width: usize) -> Self {
        CallFrame {
            window: Vec::with_capacity(width),
        }
    }

    pub(crate) fn load(&mut self, values: &[f64]) {
        self.window.clear();
        self.window.extend_from_slice(values);
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }
}

/// Converts a callback result into the value stored in the output buffer.
pub(crate) fn coerce_result(value: &Vector) -> Result<f64, String> {
    if value.len() != 1 {
        return Err("frollapply: results from provided FUN are not length 1".to_string());
    }

    match value {
        Vector::Real(values) => Ok(values[0]),
        Vector::Integer(values) => Ok(values[0].map_or(NA_REAL, f64::from)),
        Vector::Logical(values) => Ok(match values[0] {
            Some(true) => 1.0,
            Some(false) => 0.0,
            None => NA_REAL,
        }),
        _ => Err("frollapply: results from provided FUN are not of type double".to_string()),
    }
}
