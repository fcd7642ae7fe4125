//! Fixed-width rolling sum and mean.

use super::{exact_window, shift_for_alignment, Reduction, WindowState, HAS_NA_WARNING};
use crate::diagnostics::DiagnosticsRecord;
use crate::options::{Algorithm, GlobalOptions, NaHint};
use rayon::prelude::*;

pub(crate) fn roll_fixed(
    reduction: Reduction,
    source: &[f64],
    width: usize,
    options: &GlobalOptions,
    verbose: bool,
    out: &mut [f64],
    record: &mut DiagnosticsRecord,
) {
    let label = reduction.label(options.algo, false);
    if verbose {
        record.info(format!(
            "{label}: running for input length {}, window {width}, hasna {}, narm {}",
            source.len(),
            options.na_hint.code(),
            i32::from(options.na_rm),
        ));
    }

    if width > source.len() {
        if verbose {
            record.info(format!(
                "{label}: window width longer than input vector, returning all fill vector"
            ));
        }
        out.fill(options.fill);
        return;
    }

    let saw_missing = match options.algo {
        Algorithm::Fast => roll_fast(reduction, source, width, options, out),
        Algorithm::Exact => roll_exact(reduction, source, width, options, out),
    };

    if saw_missing && options.na_hint == NaHint::Absent {
        record.warning(format!("{label}: {HAS_NA_WARNING}"));
    }

    shift_for_alignment(out, width, options.align, options.fill);
}

/// Single pass with a running window state. Returns whether NA/NaN was seen.
fn roll_fast(
    reduction: Reduction,
    source: &[f64],
    width: usize,
    options: &GlobalOptions,
    out: &mut [f64],
) -> bool {
    let mut state = WindowState::default();
    let mut saw_missing = false;

    for (index, &value) in source.iter().enumerate() {
        state.push(value);
        if index >= width {
            state.pop(source[index - width]);
        }
        saw_missing |= state.has_missing();

        out[index] = if index + 1 < width {
            options.fill
        } else {
            state.finish(reduction, width, options.na_rm)
        };
    }

    saw_missing
}

/// Recomputes every full window independently, in parallel.
fn roll_exact(
    reduction: Reduction,
    source: &[f64],
    width: usize,
    options: &GlobalOptions,
    out: &mut [f64],
) -> bool {
    let (head, tail) = out.split_at_mut(width - 1);
    head.fill(options.fill);
    tail.par_iter_mut().enumerate().for_each(|(start, slot)| {
        *slot = exact_window(reduction, &source[start..start + width], options.na_rm);
    });

    source.par_iter().any(|value| value.is_nan())
}
