//! Adaptive (per-position width) rolling sum and mean. Always right-aligned.

use super::{exact_window, Reduction, WindowState, HAS_NA_WARNING};
use crate::diagnostics::DiagnosticsRecord;
use crate::options::{Algorithm, GlobalOptions, NaHint};
use rayon::prelude::*;

pub(crate) fn roll_adaptive(
    reduction: Reduction,
    source: &[f64],
    widths: &[usize],
    options: &GlobalOptions,
    verbose: bool,
    out: &mut [f64],
    record: &mut DiagnosticsRecord,
) {
    let label = reduction.label(options.algo, true);
    if verbose {
        record.info(format!(
            "{label}: running for input length {}, hasna {}, narm {}",
            source.len(),
            options.na_hint.code(),
            i32::from(options.na_rm),
        ));
    }

    let saw_missing = match options.algo {
        Algorithm::Fast => match roll_fast(reduction, source, widths, options, out) {
            Ok(saw_missing) => saw_missing,
            Err(message) => {
                record.fatal(format!("{label}: {message}"));
                return;
            }
        },
        Algorithm::Exact => roll_exact(reduction, source, widths, options, out),
    };

    if saw_missing && options.na_hint == NaHint::Absent {
        record.warning(format!("{label}: {HAS_NA_WARNING}"));
    }
}

/// Prefix states over the whole series; each window is a prefix difference.
fn roll_fast(
    reduction: Reduction,
    source: &[f64],
    widths: &[usize],
    options: &GlobalOptions,
    out: &mut [f64],
) -> Result<bool, String> {
    let mut prefix: Vec<WindowState> = Vec::new();
    prefix.try_reserve_exact(source.len() + 1).map_err(|_| {
        format!(
            "Unable to allocate memory for cumulative sums of length {}",
            source.len() + 1
        )
    })?;

    let mut running = WindowState::default();
    prefix.push(running);
    for &value in source {
        running.push(value);
        prefix.push(running);
    }

    for (index, slot) in out.iter_mut().enumerate() {
        let width = widths[index];
        *slot = if width > index + 1 {
            options.fill
        } else {
            prefix[index + 1]
                .since(&prefix[index + 1 - width])
                .finish(reduction, width, options.na_rm)
        };
    }

    Ok(running.has_missing())
}

fn roll_exact(
    reduction: Reduction,
    source: &[f64],
    widths: &[usize],
    options: &GlobalOptions,
    out: &mut [f64],
) -> bool {
    out.par_iter_mut().enumerate().for_each(|(index, slot)| {
        let width = widths[index];
        *slot = if width > index + 1 {
            options.fill
        } else {
            exact_window(reduction, &source[index + 1 - width..=index], options.na_rm)
        };
    });

    source.par_iter().any(|value| value.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RollOptions;
    use crate::series::{is_na, NA_REAL};

    fn run(
        reduction: Reduction,
        source: &[f64],
        widths: &[usize],
        options: RollOptions,
    ) -> (Vec<f64>, DiagnosticsRecord) {
        let options = options.adaptive(true).validate().unwrap();
        let mut out = vec![0.0; source.len()];
        let mut record = DiagnosticsRecord::new();
        roll_adaptive(reduction, source, widths, &options, false, &mut out, &mut record);
        (out, record)
    }

    #[test]
    fn adaptive_sum_uses_per_position_widths() {
        for algo in [Algorithm::Fast, Algorithm::Exact] {
            let (out, record) = run(
                Reduction::Sum,
                &[1.0, 2.0, 3.0, 4.0],
                &[1, 2, 2, 3],
                RollOptions::default().with_algo(algo),
            );
            assert_eq!(out, vec![1.0, 3.0, 5.0, 9.0]);
            assert_eq!(record.status(), 0);
        }
    }

    #[test]
    fn insufficient_history_takes_fill() {
        let (out, _) = run(
            Reduction::Mean,
            &[2.0, 4.0, 6.0],
            &[2, 2, 3],
            RollOptions::default(),
        );
        assert!(is_na(out[0]));
        assert_eq!(&out[1..], &[3.0, 4.0]);
    }

    #[test]
    fn missing_values_respect_na_rm() {
        let source = [1.0, NA_REAL, 3.0, 5.0];
        let widths = [1, 2, 2, 2];
        let (kept, _) = run(Reduction::Sum, &source, &widths, RollOptions::default());
        assert!(is_na(kept[1]) && is_na(kept[2]));
        assert_eq!(kept[3], 8.0);

        let (skipped, _) = run(
            Reduction::Sum,
            &source,
            &widths,
            RollOptions::default().with_na_rm(true),
        );
        assert_eq!(skipped, vec![1.0, 1.0, 3.0, 8.0]);
    }
}
