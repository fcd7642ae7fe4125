//! Rolling-window engine: the single entry point callers use.
//!
//! A request flows through the pipeline in one direction:
//! normalize series → resolve windows → build task grid → dispatch →
//! aggregate diagnostics.

use crate::callback::HostCallback;
use crate::config::EngineConfig;
use crate::diagnostics::{aggregate, Diagnostics};
use crate::dispatch::dispatch;
use crate::error::RollResult;
use crate::grid::TaskGrid;
use crate::options::{Reducer, RollOptions};
use crate::series::{normalize_source, Input};
use crate::window::resolve_windows;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, info};

/// Result buffers of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RollOutput {
    /// Zero-length input, handed back untouched.
    Unchanged(Input),
    /// Atomic input rolled with exactly one window.
    Single(Vec<f64>),
    /// Row-major by series, then window.
    Grid(Vec<Vec<f64>>),
}

impl RollOutput {
    /// Output buffers in grid order, whatever the shape.
    pub fn buffers(&self) -> Vec<&[f64]> {
        match self {
            RollOutput::Unchanged(_) => Vec::new(),
            RollOutput::Single(values) => vec![values.as_slice()],
            RollOutput::Grid(values) => values.iter().map(Vec::as_slice).collect(),
        }
    }

    pub fn into_single(self) -> Option<Vec<f64>> {
        match self {
            RollOutput::Single(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_grid(self) -> Option<Vec<Vec<f64>>> {
        match self {
            RollOutput::Grid(values) => Some(values),
            _ => None,
        }
    }
}

/// Buffers plus every non-fatal message the kernels produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Rolled {
    pub output: RollOutput,
    pub diagnostics: Diagnostics,
}

/// Owns the worker pool used for concurrent dispatch.
pub struct RollEngine {
    config: EngineConfig,
    pool: ThreadPool,
}

impl std::fmt::Debug for RollEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollEngine")
            .field("config", &self.config)
            .field("workers", &self.pool.current_num_threads())
            .finish()
    }
}

impl RollEngine {
    pub fn new(config: EngineConfig) -> RollResult<Self> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("froll-worker-{index}"));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        debug!(
            workers = pool.current_num_threads(),
            verbose = config.verbose,
            "RollEngine: worker pool ready"
        );

        Ok(RollEngine { config, pool })
    }

    /// Engine configured from `FROLL_NUM_THREADS` / `FROLL_VERBOSE`.
    pub fn from_env() -> RollResult<Self> {
        Self::new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rolls `reducer` over every (series, window) pair.
    ///
    /// # Errors
    /// Validation errors are returned before any output is allocated. A fatal
    /// kernel status is returned as [`RollError::KernelFatal`] after dispatch.
    ///
    /// [`RollError::KernelFatal`]: crate::error::RollError::KernelFatal
    pub fn roll(
        &self,
        mut reducer: Reducer<'_>,
        source: &Input,
        window: &Input,
        options: &RollOptions,
    ) -> RollResult<Rolled> {
        if source.is_empty() {
            debug!("froll: empty input, returning it unchanged");
            return Ok(Rolled {
                output: RollOutput::Unchanged(source.clone()),
                diagnostics: Diagnostics::default(),
            });
        }

        let verbose = self.config.verbose;
        let started = Instant::now();

        let series = normalize_source(source)?;
        let windows = resolve_windows(window, options.adaptive, options.align, &series)?;
        let mut grid = TaskGrid::build(&series, &windows, options)?;

        if verbose {
            info!(
                "froll: allocating memory for results {}x{}",
                grid.series_count(),
                grid.window_count()
            );
        }

        let policy = dispatch(&mut grid, &series, &windows, &mut reducer, &self.pool, verbose);

        let series_count = grid.series_count();
        let window_count = grid.window_count();
        let (mut outputs, records) = grid.into_parts();
        let diagnostics = aggregate(&records, window_count)?;

        if verbose {
            info!(
                reducer = reducer.name(),
                policy = ?policy,
                "froll: processing of {} column(s) and {} window(s) took {:.3}s",
                series_count,
                window_count,
                started.elapsed().as_secs_f64()
            );
        }

        let output = if source.is_atomic() && outputs.len() == 1 {
            RollOutput::Single(outputs.remove(0))
        } else {
            RollOutput::Grid(outputs)
        };

        Ok(Rolled {
            output,
            diagnostics,
        })
    }
}

static SHARED_ENGINE: OnceLock<RollEngine> = OnceLock::new();

/// Process-wide engine used by the free functions, configured from the
/// environment on first use. Its worker pool lives for the whole process.
pub fn shared_engine() -> RollResult<&'static RollEngine> {
    if let Some(engine) = SHARED_ENGINE.get() {
        return Ok(engine);
    }
    let engine = RollEngine::from_env()?;
    Ok(SHARED_ENGINE.get_or_init(|| engine))
}

/// Rolls a built-in reducer selected by name (`"sum"` or `"mean"`) on the
/// [`shared_engine`].
pub fn froll(
    reducer: &str,
    source: &Input,
    window: &Input,
    options: &RollOptions,
) -> RollResult<Rolled> {
    let reducer = Reducer::from_name(reducer)?;
    shared_engine()?.roll(reducer, source, window, options)
}

/// Rolls a user callback over every window, one call at a time, on the
/// [`shared_engine`].
pub fn frollapply(
    callback: &mut dyn HostCallback,
    source: &Input,
    window: &Input,
    options: &RollOptions,
) -> RollResult<Rolled> {
    shared_engine()?.roll(Reducer::Callback(callback), source, window, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RollError;
    use crate::series::{is_na, Vector};

    fn engine() -> RollEngine {
        RollEngine::new(EngineConfig::new(Some(2), false)).unwrap()
    }

    #[test]
    fn single_series_single_window_is_unwrapped() {
        let rolled = engine()
            .roll(
                Reducer::Sum,
                &Input::from(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
                &Input::from(vec![3]),
                &RollOptions::default(),
            )
            .unwrap();
        let values = rolled.output.into_single().unwrap();
        assert!(is_na(values[0]) && is_na(values[1]));
        assert_eq!(&values[2..], &[6.0, 9.0, 12.0]);
        assert!(rolled.diagnostics.is_clean());
    }

    #[test]
    fn list_with_one_column_stays_a_grid() {
        let rolled = engine()
            .roll(
                Reducer::Mean,
                &Input::columns([vec![2.0, 4.0]]),
                &Input::from(vec![1]),
                &RollOptions::default(),
            )
            .unwrap();
        assert_eq!(rolled.output, RollOutput::Grid(vec![vec![2.0, 4.0]]));
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        let source = Input::List(vec![]);
        let rolled = engine()
            .roll(
                Reducer::Sum,
                &source,
                &Input::from(Vec::<i32>::new()),
                &RollOptions::default(),
            )
            .unwrap();
        assert_eq!(rolled.output, RollOutput::Unchanged(source));
    }

    #[test]
    fn validation_errors_surface_before_dispatch() {
        let err = engine()
            .roll(
                Reducer::Sum,
                &Input::from(vec![1.0, 2.0]),
                &Input::from(vec![1]),
                &RollOptions {
                    fill: Vector::Real(vec![]),
                    ..RollOptions::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RollError::InvalidFillValue(_)));
    }

    #[test]
    fn free_functions_reuse_one_engine() {
        let first = shared_engine().unwrap();
        let second = shared_engine().unwrap();
        assert!(std::ptr::eq(first, second));

        let rolled = froll(
            "sum",
            &Input::from(vec![1.0, 2.0, 3.0]),
            &Input::from(vec![2]),
            &RollOptions::default().with_fill(0.0),
        )
        .unwrap();
        assert_eq!(rolled.output, RollOutput::Single(vec![0.0, 3.0, 5.0]));
        assert!(std::ptr::eq(shared_engine().unwrap(), first));
    }

    #[test]
    fn unknown_reducer_name_is_rejected() {
        let err = froll(
            "median",
            &Input::from(vec![1.0]),
            &Input::from(vec![1]),
            &RollOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err, RollError::UnknownReducer("median".to_string()));
    }
}
