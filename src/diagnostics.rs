//! Per-task diagnostics records and the aggregator that surfaces them.
//!
//! Each task owns one [`DiagnosticsRecord`]. Kernels write into it during
//! dispatch; once every task has finished, [`aggregate`] walks the records in
//! row-major (series, window) order.

use crate::error::{RollError, RollResult};
use serde::Serialize;
use tracing::{error, info, warn};

/// Message tier, also the index of the record slot it is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info = 0,
    /// Reserved tier: surfaced without aborting. No built-in kernel writes it.
    SuppressedError = 1,
    Warning = 2,
    /// Unrecoverable kernel failure (allocation, internal invariant).
    Fatal = 3,
}

impl Severity {
    /// Status code a record takes when this tier is written.
    pub fn status(self) -> u8 {
        self as u8
    }
}

/// Status and message slots for one task.
///
/// At most one slot is populated. Writing a more severe tier replaces a less
/// severe message; writing the same tier again appends a line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsRecord {
    messages: [Option<String>; 4],
    status: u8,
}

impl DiagnosticsRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.write(Severity::Info, message.into());
    }

    pub fn suppressed_error(&mut self, message: impl Into<String>) {
        self.write(Severity::SuppressedError, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.write(Severity::Warning, message.into());
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        self.write(Severity::Fatal, message.into());
    }

    fn write(&mut self, severity: Severity, message: String) {
        let current = self.severity();
        if current.is_some_and(|current| current > severity) {
            return;
        }

        let slot = severity as usize;
        if current == Some(severity) {
            if let Some(existing) = self.messages[slot].as_mut() {
                existing.push('\n');
                existing.push_str(&message);
                return;
            }
        }

        self.messages = Default::default();
        self.messages[slot] = Some(message);
        self.status = severity.status();
    }

    /// 0 = ok, 1 = suppressed error, 2 = warning, 3 = fatal.
    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn is_fatal(&self) -> bool {
        self.status == Severity::Fatal.status()
    }

    /// The populated tier, if any.
    pub fn severity(&self) -> Option<Severity> {
        [
            Severity::Fatal,
            Severity::Warning,
            Severity::SuppressedError,
            Severity::Info,
        ]
        .into_iter()
        .find(|severity| self.messages[*severity as usize].is_some())
    }

    pub fn message(&self, severity: Severity) -> Option<&str> {
        self.messages[severity as usize].as_deref()
    }
}

/// A message attributed to its originating grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellMessage {
    /// 1-based linear cell index (`series * window_count + window + 1`).
    pub cell: usize,
    /// 0-based series index.
    pub series: usize,
    /// 0-based window index.
    pub window: usize,
    pub message: String,
}

/// Everything non-fatal the kernels reported, in row-major order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub info: Vec<CellMessage>,
    pub suppressed_errors: Vec<CellMessage>,
    pub warnings: Vec<CellMessage>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.info.is_empty() && self.suppressed_errors.is_empty() && self.warnings.is_empty()
    }
}

/// Walks the finished records once, in grid order.
///
/// Informational and suppressed-error messages are logged as they are met;
/// warnings are collected and re-raised together after the walk. The first
/// fatal record aborts the walk and becomes the returned error; warnings met
/// before it are still raised.
pub fn aggregate(records: &[DiagnosticsRecord], window_count: usize) -> RollResult<Diagnostics> {
    let mut diagnostics = Diagnostics::default();

    for (index, record) in records.iter().enumerate() {
        let Some(severity) = record.severity() else {
            continue;
        };
        let message = record.message(severity).unwrap_or_default().to_string();
        let cell = CellMessage {
            cell: index + 1,
            series: index / window_count.max(1),
            window: index % window_count.max(1),
            message,
        };

        match severity {
            Severity::Info => {
                info!(cell = cell.cell, "froll: {}", cell.message);
                diagnostics.info.push(cell);
            }
            Severity::SuppressedError => {
                error!(cell = cell.cell, "froll: {}", cell.message);
                diagnostics.suppressed_errors.push(cell);
            }
            Severity::Warning => diagnostics.warnings.push(cell),
            Severity::Fatal => {
                raise_warnings(&diagnostics.warnings);
                return Err(RollError::KernelFatal {
                    cell: cell.cell,
                    message: cell.message,
                });
            }
        }
    }

    raise_warnings(&diagnostics.warnings);
    Ok(diagnostics)
}

fn raise_warnings(warnings: &[CellMessage]) {
    for cell in warnings {
        warn!(cell = cell.cell, "froll: {}", cell.message);
    }
}
