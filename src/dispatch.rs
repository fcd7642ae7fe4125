//! Dispatcher: runs the kernel once per grid cell.
//!
//! Built-in reducers with the fast algorithm run concurrently on the engine's
//! worker pool when the grid has more than one cell. The exact algorithm stays
//! sequential here because its kernels parallelize per output position.
//! Callbacks run on a single process-wide lane, one call at a time.

use crate::callback::{CallFrame, HostCallback};
use crate::grid::TaskGrid;
use crate::kernels::apply::roll_apply;
use crate::kernels::{Reduction, RollKernel};
use crate::options::{Algorithm, Reducer};
use crate::window::WindowSpec;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::borrow::Cow;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Held for the whole of a callback dispatch; at most one host call is in
/// flight across the process.
static CALLBACK_LANE: Mutex<()> = Mutex::new(());

/// How the cells of one request are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    Concurrent,
    Sequential,
    CallbackLane,
}

impl ExecutionPolicy {
    pub fn select(reducer: &Reducer<'_>, algo: Algorithm, cell_count: usize) -> Self {
        match reducer {
            Reducer::Callback(_) => ExecutionPolicy::CallbackLane,
            _ if algo == Algorithm::Fast && cell_count > 1 => ExecutionPolicy::Concurrent,
            _ => ExecutionPolicy::Sequential,
        }
    }
}

/// Fills every cell of `grid`. Returns once all tasks have finished, so the
/// records may be read afterwards without synchronization.
pub(crate) fn dispatch(
    grid: &mut TaskGrid,
    series: &[Cow<'_, [f64]>],
    windows: &[WindowSpec],
    reducer: &mut Reducer<'_>,
    pool: &ThreadPool,
    verbose: bool,
) -> ExecutionPolicy {
    let options = *grid.options();
    let window_count = grid.window_count();
    let policy = ExecutionPolicy::select(reducer, options.algo, grid.len());

    if verbose {
        debug!(
            series = grid.series_count(),
            windows = window_count,
            policy = ?policy,
            "froll: dispatching task grid"
        );
    }

    let kernel = match reducer {
        Reducer::Sum => Reduction::Sum,
        Reducer::Mean => Reduction::Mean,
        Reducer::Callback(callback) => {
            dispatch_callbacks(grid, series, windows, &mut **callback, verbose);
            return policy;
        }
    };

    run_kernel(grid, series, windows, &kernel, policy, pool, verbose);
    policy
}

/// Runs a built-in kernel over every cell of `grid`.
///
/// A fatal record in one cell does not stop its siblings; the aggregator
/// decides what to surface once all of them have finished.
fn run_kernel<K: RollKernel>(
    grid: &mut TaskGrid,
    series: &[Cow<'_, [f64]>],
    windows: &[WindowSpec],
    kernel: &K,
    policy: ExecutionPolicy,
    pool: &ThreadPool,
    verbose: bool,
) {
    let options = *grid.options();
    let window_count = grid.window_count();

    match policy {
        ExecutionPolicy::Concurrent => pool.install(|| {
            grid.cells_mut()
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, cell)| {
                    let (i, j) = (index / window_count, index % window_count);
                    kernel.roll(
                        &series[i],
                        &windows[j],
                        &options,
                        verbose,
                        &mut cell.output,
                        &mut cell.record,
                    );
                });
        }),
        _ => pool.install(|| {
            for (index, cell) in grid.cells_mut().iter_mut().enumerate() {
                let (i, j) = (index / window_count, index % window_count);
                kernel.roll(
                    &series[i],
                    &windows[j],
                    &options,
                    verbose,
                    &mut cell.output,
                    &mut cell.record,
                );
            }
        }),
    }
}

/// Sequential rolling apply on the callback lane.
///
/// One frame per window spec is reused across all series. Stops at the first
/// fatal cell, since a failed host call aborts the whole request.
fn dispatch_callbacks(
    grid: &mut TaskGrid,
    series: &[Cow<'_, [f64]>],
    windows: &[WindowSpec],
    callback: &mut dyn HostCallback,
    verbose: bool,
) {
    let _lane = CALLBACK_LANE.lock().unwrap_or_else(PoisonError::into_inner);

    let options = *grid.options();
    let window_count = grid.window_count();
    let mut frames: Vec<CallFrame> = windows
        .iter()
        .map(|window| CallFrame::with_capacity(window.max_width()))
        .collect();

    for (index, cell) in grid.cells_mut().iter_mut().enumerate() {
        let (i, j) = (index / window_count, index % window_count);
        roll_apply(
            callback,
            &mut frames[j],
            &series[i],
            &windows[j],
            &options,
            verbose,
            &mut cell.output,
            &mut cell.record,
        );
        if cell.record.is_fatal() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{aggregate, DiagnosticsRecord};
    use crate::error::RollError;
    use crate::options::{GlobalOptions, RollOptions};
    use rayon::ThreadPoolBuilder;

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn policy_follows_reducer_and_algorithm() {
        let mut callback = |window: &[f64]| window[0];
        assert_eq!(
            ExecutionPolicy::select(&Reducer::Sum, Algorithm::Fast, 4),
            ExecutionPolicy::Concurrent
        );
        assert_eq!(
            ExecutionPolicy::select(&Reducer::Mean, Algorithm::Fast, 1),
            ExecutionPolicy::Sequential
        );
        assert_eq!(
            ExecutionPolicy::select(&Reducer::Sum, Algorithm::Exact, 4),
            ExecutionPolicy::Sequential
        );
        assert_eq!(
            ExecutionPolicy::select(&Reducer::Callback(&mut callback), Algorithm::Fast, 4),
            ExecutionPolicy::CallbackLane
        );
    }

    #[test]
    fn concurrent_dispatch_fills_every_cell() {
        let data = [vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 20.0, 30.0, 40.0]];
        let series: Vec<Cow<'_, [f64]>> =
            data.iter().map(|c| Cow::Borrowed(c.as_slice())).collect();
        let windows = vec![WindowSpec::Fixed(1), WindowSpec::Fixed(2)];
        let options = RollOptions::default().with_fill(0.0);
        let mut grid = TaskGrid::build(&series, &windows, &options).unwrap();

        let policy = dispatch(&mut grid, &series, &windows, &mut Reducer::Sum, &pool(), false);
        assert_eq!(policy, ExecutionPolicy::Concurrent);

        let (outputs, _) = grid.into_parts();
        assert_eq!(outputs[0], vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(outputs[1], vec![0.0, 3.0, 5.0, 7.0]);
        assert_eq!(outputs[3], vec![0.0, 30.0, 50.0, 70.0]);
    }

    #[test]
    fn callback_frames_are_shared_across_series() {
        let data = [vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let series: Vec<Cow<'_, [f64]>> =
            data.iter().map(|c| Cow::Borrowed(c.as_slice())).collect();
        let windows = vec![WindowSpec::Fixed(2)];
        let options = RollOptions::default().with_fill(-1.0);
        let mut grid = TaskGrid::build(&series, &windows, &options).unwrap();

        let mut calls = 0;
        let mut last = |window: &[f64]| {
            calls += 1;
            window[window.len() - 1]
        };
        let mut reducer = Reducer::Callback(&mut last);
        let policy = dispatch(&mut grid, &series, &windows, &mut reducer, &pool(), false);
        assert_eq!(policy, ExecutionPolicy::CallbackLane);
        drop(reducer);

        assert_eq!(calls, 4);
        let (outputs, _) = grid.into_parts();
        assert_eq!(outputs, vec![vec![-1.0, 2.0, 3.0], vec![-1.0, 5.0, 6.0]]);
    }

    /// Copies the series through, or fails the cell when it starts negative.
    struct FailsOnNegativeStart;

    impl RollKernel for FailsOnNegativeStart {
        fn roll(
            &self,
            source: &[f64],
            _window: &WindowSpec,
            _options: &GlobalOptions,
            _verbose: bool,
            out: &mut [f64],
            record: &mut DiagnosticsRecord,
        ) {
            if source.first().is_some_and(|first| *first < 0.0) {
                record.fatal("negative start");
                return;
            }
            out.copy_from_slice(source);
        }
    }

    #[test]
    fn fatal_cell_leaves_concurrent_siblings_computed() {
        let data = [vec![1.0, 2.0], vec![-1.0, 0.0], vec![3.0, 4.0]];
        let series: Vec<Cow<'_, [f64]>> =
            data.iter().map(|c| Cow::Borrowed(c.as_slice())).collect();
        let windows = vec![WindowSpec::Fixed(1), WindowSpec::Fixed(2)];
        let mut grid = TaskGrid::build(&series, &windows, &RollOptions::default()).unwrap();

        run_kernel(
            &mut grid,
            &series,
            &windows,
            &FailsOnNegativeStart,
            ExecutionPolicy::Concurrent,
            &pool(),
            false,
        );

        let (outputs, records) = grid.into_parts();
        let fatal: Vec<_> = records.iter().map(DiagnosticsRecord::is_fatal).collect();
        assert_eq!(fatal, vec![false, false, true, true, false, false]);
        assert_eq!(outputs[0], vec![1.0, 2.0]);
        assert_eq!(outputs[1], vec![1.0, 2.0]);
        assert_eq!(outputs[4], vec![3.0, 4.0]);
        assert_eq!(outputs[5], vec![3.0, 4.0]);

        assert_eq!(
            aggregate(&records, windows.len()),
            Err(RollError::KernelFatal {
                cell: 3,
                message: "negative start".to_string()
            })
        );
    }
}
