//! Task grid: one output buffer and one diagnostics record per
//! (series, window) pair, laid out row-major by series.

use crate::diagnostics::DiagnosticsRecord;
use crate::error::RollResult;
use crate::options::{GlobalOptions, RollOptions};
use crate::window::WindowSpec;
use std::borrow::Cow;

/// Identifies a grid cell by its series and window indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub series: usize,
    pub window: usize,
}

/// Output buffer and diagnostics owned by a single task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskCell {
    pub output: Vec<f64>,
    pub record: DiagnosticsRecord,
}

#[derive(Debug)]
pub struct TaskGrid {
    options: GlobalOptions,
    series_count: usize,
    window_count: usize,
    cells: Vec<TaskCell>,
}

impl TaskGrid {
    /// Validates the request options, then allocates the grid.
    ///
    /// Nothing is allocated when validation fails.
    pub fn build(
        series: &[Cow<'_, [f64]>],
        windows: &[WindowSpec],
        options: &RollOptions,
    ) -> RollResult<Self> {
        let options = options.validate()?;

        let mut cells = Vec::with_capacity(series.len() * windows.len());
        for column in series {
            for _ in windows {
                cells.push(TaskCell {
                    output: vec![0.0; column.len()],
                    record: DiagnosticsRecord::new(),
                });
            }
        }

        Ok(TaskGrid {
            options,
            series_count: series.len(),
            window_count: windows.len(),
            cells,
        })
    }

    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    pub fn series_count(&self) -> usize {
        self.series_count
    }

    pub fn window_count(&self) -> usize {
        self.window_count
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Maps a linear index to its (series, window) pair.
    pub fn task(&self, index: usize) -> TaskId {
        TaskId {
            series: index / self.window_count,
            window: index % self.window_count,
        }
    }

    pub fn cells(&self) -> &[TaskCell] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [TaskCell] {
        &mut self.cells
    }

    /// Splits the grid into its output buffers and diagnostics records.
    pub fn into_parts(self) -> (Vec<Vec<f64>>, Vec<DiagnosticsRecord>) {
        self.cells
            .into_iter()
            .map(|cell| (cell.output, cell.record))
            .unzip()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RollError;

    #[test]
    fn grid_is_series_major() {
        let data = [vec![1.0; 3], vec![2.0; 5]];
        let series: Vec<Cow<'_, [f64]>> = data.iter().map(|c| Cow::Borrowed(c.as_slice())).collect();
        let windows = vec![WindowSpec::Fixed(1), WindowSpec::Fixed(2), WindowSpec::Fixed(3)];
        let grid = TaskGrid::build(&series, &windows, &RollOptions::default()).unwrap();

        assert_eq!(grid.len(), 6);
        assert_eq!(grid.task(4), TaskId { series: 1, window: 1 });
        let lengths: Vec<_> = grid.cells().iter().map(|cell| cell.output.len()).collect();
        assert_eq!(lengths, vec![3, 3, 3, 5, 5, 5]);
        assert!(grid.cells().iter().all(|cell| cell.record.status() == 0));
    }

    #[test]
    fn invalid_options_prevent_allocation() {
        let data = [vec![1.0; 3]];
        let series: Vec<Cow<'_, [f64]>> = data.iter().map(|c| Cow::Borrowed(c.as_slice())).collect();
        let options = RollOptions::default().with_has_na(Some(false)).with_na_rm(true);
        let err = TaskGrid::build(&series, &[WindowSpec::Fixed(2)], &options).unwrap_err();
        assert_eq!(err, RollError::ContradictoryNAOptions);
    }
}
