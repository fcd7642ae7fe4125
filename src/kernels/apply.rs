//! Rolling apply of a host callback.
//!
//! Runs on the caller's thread only. Each output position copies its values
//! into the [`CallFrame`] of its window spec and invokes the callback once.

use super::shift_for_alignment;
use crate::callback::{coerce_result, CallFrame, HostCallback};
use crate::diagnostics::DiagnosticsRecord;
use crate::options::GlobalOptions;
use crate::window::WindowSpec;

pub(crate) fn roll_apply(
    callback: &mut dyn HostCallback,
    frame: &mut CallFrame,
    source: &[f64],
    window: &WindowSpec,
    options: &GlobalOptions,
    verbose: bool,
    out: &mut [f64],
    record: &mut DiagnosticsRecord,
) {
    if verbose {
        record.info(format!(
            "frollapply: running for input length {}, window {}",
            source.len(),
            match window {
                WindowSpec::Fixed(width) => width.to_string(),
                WindowSpec::Adaptive(_) => "adaptive".to_string(),
            }
        ));
    }

    for (index, slot) in out.iter_mut().enumerate() {
        let width = window.width_at(index);
        if width > index + 1 {
            *slot = options.fill;
            continue;
        }

        frame.load(&source[index + 1 - width..=index]);
        let value = callback
            .invoke(frame)
            .map_err(|message| format!("frollapply: {message}"))
            .and_then(|value| coerce_result(&value));
        match value {
            Ok(value) => *slot = value,
            Err(message) => {
                record.fatal(message);
                return;
            }
        }
    }

    if let WindowSpec::Fixed(width) = window {
        shift_for_alignment(out, *width, options.align, options.fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Align, RollOptions};
    use crate::series::{is_na, Vector};

    #[test]
    fn applies_callback_to_each_full_window() {
        let options = RollOptions::default().validate().unwrap();
        let mut range = |window: &[f64]| {
            let max = window.iter().copied().fold(f64::MIN, f64::max);
            let min = window.iter().copied().fold(f64::MAX, f64::min);
            max - min
        };
        let mut frame = CallFrame::with_capacity(2);
        let mut out = vec![0.0; 4];
        let mut record = DiagnosticsRecord::new();
        roll_apply(
            &mut range,
            &mut frame,
            &[1.0, 4.0, 2.0, 8.0],
            &WindowSpec::Fixed(2),
            &options,
            false,
            &mut out,
            &mut record,
        );
        assert!(is_na(out[0]));
        assert_eq!(&out[1..], &[3.0, 2.0, 6.0]);
        assert_eq!(record.status(), 0);
    }

    #[test]
    fn center_alignment_applies_to_callback_results() {
        let options = RollOptions::default()
            .with_fill(0.0)
            .with_align(Align::Center)
            .validate()
            .unwrap();
        let mut sum = |window: &[f64]| window.iter().sum::<f64>();
        let mut frame = CallFrame::with_capacity(3);
        let mut out = vec![0.0; 5];
        let mut record = DiagnosticsRecord::new();
        roll_apply(
            &mut sum,
            &mut frame,
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &WindowSpec::Fixed(3),
            &options,
            false,
            &mut out,
            &mut record,
        );
        assert_eq!(out, vec![0.0, 6.0, 9.0, 12.0, 0.0]);
    }

    struct Pair;

    impl HostCallback for Pair {
        fn invoke(&mut self, frame: &CallFrame) -> Result<Vector, String> {
            Ok(Vector::Real(frame.window().to_vec()))
        }
    }

    #[test]
    fn non_scalar_result_is_fatal() {
        let options = RollOptions::default().validate().unwrap();
        let mut frame = CallFrame::with_capacity(2);
        let mut out = vec![0.0; 3];
        let mut record = DiagnosticsRecord::new();
        roll_apply(
            &mut Pair,
            &mut frame,
            &[1.0, 2.0, 3.0],
            &WindowSpec::Fixed(2),
            &options,
            false,
            &mut out,
            &mut record,
        );
        assert!(record.is_fatal());
    }
}
