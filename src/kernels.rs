//! Rolling reduction kernels.
//!
//! The dispatcher only sees the [`RollKernel`] contract: fill `out` with
//! exactly `source.len()` values and report problems through the task's
//! [`DiagnosticsRecord`]. Kernels never return errors or panic on data.

pub mod adaptive;
pub mod apply;
pub mod fixed;

use crate::diagnostics::DiagnosticsRecord;
use crate::options::{Algorithm, Align, GlobalOptions};
use crate::series::NA_REAL;
use crate::window::WindowSpec;

pub(crate) const HAS_NA_WARNING: &str = "hasNA=FALSE used but NA (or other non-finite) value(s) are present in input, use default hasNA=NA to avoid this warning";

/// Calling contract shared by every built-in kernel.
pub trait RollKernel: Sync {
    fn roll(
        &self,
        source: &[f64],
        window: &WindowSpec,
        options: &GlobalOptions,
        verbose: bool,
        out: &mut [f64],
        record: &mut DiagnosticsRecord,
    );
}

/// Built-in reductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reduction {
    Sum,
    Mean,
}

impl Reduction {
    /// Kernel label used in diagnostics, e.g. `frollsumFast`.
    pub fn label(self, algo: Algorithm, adaptive: bool) -> String {
        let prefix = if adaptive { "fadaptiveroll" } else { "froll" };
        let name = match self {
            Reduction::Sum => "sum",
            Reduction::Mean => "mean",
        };
        let algo = match algo {
            Algorithm::Fast => "Fast",
            Algorithm::Exact => "Exact",
        };
        format!("{prefix}{name}{algo}")
    }
}

impl RollKernel for Reduction {
    fn roll(
        &self,
        source: &[f64],
        window: &WindowSpec,
        options: &GlobalOptions,
        verbose: bool,
        out: &mut [f64],
        record: &mut DiagnosticsRecord,
    ) {
        match window {
            WindowSpec::Fixed(width) => {
                fixed::roll_fixed(*self, source, *width, options, verbose, out, record)
            }
            WindowSpec::Adaptive(widths) => {
                adaptive::roll_adaptive(*self, source, widths, options, verbose, out, record)
            }
        }
    }
}

/// Running aggregate over finite values plus counts of the non-finite ones.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct WindowState {
    sum: f64,
    missing: usize,
    pos_inf: usize,
    neg_inf: usize,
}

impl WindowState {
    pub(crate) fn push(&mut self, value: f64) {
        if value.is_nan() {
            self.missing += 1;
        } else if value == f64::INFINITY {
            self.pos_inf += 1;
        } else if value == f64::NEG_INFINITY {
            self.neg_inf += 1;
        } else {
            self.sum += value;
        }
    }

    pub(crate) fn pop(&mut self, value: f64) {
        if value.is_nan() {
            self.missing -= 1;
        } else if value == f64::INFINITY {
            self.pos_inf -= 1;
        } else if value == f64::NEG_INFINITY {
            self.neg_inf -= 1;
        } else {
            self.sum -= value;
        }
    }

    /// State of the values pushed after `earlier` (prefix difference).
    pub(crate) fn since(&self, earlier: &WindowState) -> WindowState {
        WindowState {
            sum: self.sum - earlier.sum,
            missing: self.missing - earlier.missing,
            pos_inf: self.pos_inf - earlier.pos_inf,
            neg_inf: self.neg_inf - earlier.neg_inf,
        }
    }

    pub(crate) fn has_missing(&self) -> bool {
        self.missing > 0
    }

    pub(crate) fn finish(&self, reduction: Reduction, width: usize, na_rm: bool) -> f64 {
        if self.missing > 0 && !na_rm {
            return NA_REAL;
        }
        if self.pos_inf > 0 && self.neg_inf > 0 {
            return f64::NAN;
        }
        if self.pos_inf > 0 {
            return f64::INFINITY;
        }
        if self.neg_inf > 0 {
            return f64::NEG_INFINITY;
        }

        let count = width - self.missing;
        match reduction {
            Reduction::Sum => self.sum,
            Reduction::Mean if count == 0 => f64::NAN,
            Reduction::Mean => self.sum / count as f64,
        }
    }
}

/// Recomputes one window from scratch.
///
/// The mean is refined by the mean of its residuals to limit rounding error.
pub(crate) fn exact_window(reduction: Reduction, window: &[f64], na_rm: bool) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &value in window {
        if value.is_nan() {
            if !na_rm {
                return NA_REAL;
            }
            continue;
        }
        sum += value;
        count += 1;
    }

    match reduction {
        Reduction::Sum => sum,
        Reduction::Mean if count == 0 => f64::NAN,
        Reduction::Mean => {
            let mean = sum / count as f64;
            if !mean.is_finite() {
                return mean;
            }
            let residual: f64 = window
                .iter()
                .filter(|value| !value.is_nan())
                .map(|value| value - mean)
                .sum();
            mean + residual / count as f64
        }
    }
}

/// Moves right-aligned results to the requested alignment.
///
/// Left alignment shifts by `width - 1`, center by `width / 2`; vacated
/// trailing positions take `fill`.
pub(crate) fn shift_for_alignment(out: &mut [f64], width: usize, align: Align, fill: f64) {
    let shift = match align {
        Align::Right => return,
        Align::Left => width.saturating_sub(1),
        Align::Center => width / 2,
    };
    if shift == 0 {
        return;
    }

    let len = out.len();
    if shift >= len {
        out.fill(fill);
        return;
    }
    out.copy_within(shift.., 0);
    out[len - shift..].fill(fill);
}
