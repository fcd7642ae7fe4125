pub mod callback;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod grid;
pub mod kernels;
pub mod options;
pub mod series;
pub mod window;

pub use callback::{CallFrame, HostCallback};
pub use config::EngineConfig;
pub use diagnostics::{CellMessage, Diagnostics, DiagnosticsRecord, Severity};
pub use dispatch::ExecutionPolicy;
pub use engine::{froll, frollapply, shared_engine, RollEngine, RollOutput, Rolled};
pub use error::{RollError, RollResult};
pub use grid::{TaskCell, TaskGrid, TaskId};
pub use kernels::{Reduction, RollKernel};
pub use options::{Algorithm, Align, GlobalOptions, NaHint, Reducer, RollOptions};
pub use series::{is_na, normalize_source, Input, Vector, NA_REAL};
pub use window::{resolve_windows, WindowSpec};
