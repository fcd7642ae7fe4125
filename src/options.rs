//! Request options, their string selectors, and validation into the
//! read-only [`GlobalOptions`] shared by every task.

use crate::callback::HostCallback;
use crate::error::{RollError, RollResult};
use crate::series::{Vector, NA_REAL};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of the current position the window extends to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Window ends at the current position.
    #[default]
    Right,
    Center,
    /// Window starts at the current position.
    Left,
}

impl FromStr for Align {
    type Err = RollError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "right" => Ok(Align::Right),
            "center" => Ok(Align::Center),
            "left" => Ok(Align::Left),
            other => Err(RollError::UnknownAlignment(other.to_string())),
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Align::Right => "right",
            Align::Center => "center",
            Align::Left => "left",
        };
        write!(f, "{repr}")
    }
}

/// Kernel algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Direct recurrence: one running accumulator per task.
    #[default]
    Fast,
    /// Recompute every window from scratch; parallel per output position.
    Exact,
}

impl FromStr for Algorithm {
    type Err = RollError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fast" => Ok(Algorithm::Fast),
            "exact" => Ok(Algorithm::Exact),
            other => Err(RollError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::Fast => write!(f, "fast"),
            Algorithm::Exact => write!(f, "exact"),
        }
    }
}

/// Caller's hint about missing values in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NaHint {
    #[default]
    Unknown,
    MaybePresent,
    Absent,
}

impl NaHint {
    /// Maps the tri-state `hasNA` flag (`None` meaning "no information").
    pub fn from_flag(has_na: Option<bool>) -> Self {
        match has_na {
            None => NaHint::Unknown,
            Some(true) => NaHint::MaybePresent,
            Some(false) => NaHint::Absent,
        }
    }

    /// Integer code used in verbose kernel messages.
    pub fn code(self) -> i32 {
        match self {
            NaHint::Unknown => 0,
            NaHint::MaybePresent => 1,
            NaHint::Absent => -1,
        }
    }
}

/// The reduction applied to every window.
pub enum Reducer<'a> {
    Sum,
    Mean,
    /// User function evaluated once per output position on the callback lane.
    Callback(&'a mut dyn HostCallback),
}

impl Reducer<'static> {
    /// Resolves a built-in reducer by name.
    pub fn from_name(name: &str) -> RollResult<Self> {
        match name {
            "sum" => Ok(Reducer::Sum),
            "mean" => Ok(Reducer::Mean),
            other => Err(RollError::UnknownReducer(other.to_string())),
        }
    }
}

impl Reducer<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Reducer::Sum => "sum",
            Reducer::Mean => "mean",
            Reducer::Callback(_) => "callback",
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Reducer::Callback(_))
    }
}

impl fmt::Debug for Reducer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reducer({})", self.name())
    }
}

/// Options as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollOptions {
    /// Value written where a window has insufficient history. Must hold a
    /// single integer, real, or missing logical.
    pub fill: Vector,
    pub algo: Algorithm,
    pub align: Align,
    /// Skip missing values inside each window instead of propagating them.
    pub na_rm: bool,
    /// `None` = unknown, `Some(true)` = may contain NA, `Some(false)` = no NA.
    pub has_na: Option<bool>,
    /// Interpret the window argument as per-element widths.
    pub adaptive: bool,
}

impl Default for RollOptions {
    fn default() -> Self {
        RollOptions {
            fill: Vector::Logical(vec![None]),
            algo: Algorithm::Fast,
            align: Align::Right,
            na_rm: false,
            has_na: None,
            adaptive: false,
        }
    }
}

impl RollOptions {
    pub fn with_fill(mut self, fill: f64) -> Self {
        self.fill = Vector::Real(vec![fill]);
        self
    }

    pub fn with_algo(mut self, algo: Algorithm) -> Self {
        self.algo = algo;
        self
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_na_rm(mut self, na_rm: bool) -> Self {
        self.na_rm = na_rm;
        self
    }

    pub fn with_has_na(mut self, has_na: Option<bool>) -> Self {
        self.has_na = has_na;
        self
    }

    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Validates the caller options into the form shared by all tasks.
    pub fn validate(&self) -> RollResult<GlobalOptions> {
        if self.has_na == Some(false) && self.na_rm {
            return Err(RollError::ContradictoryNAOptions);
        }

        Ok(GlobalOptions {
            fill: parse_fill(&self.fill)?,
            align: self.align,
            na_rm: self.na_rm,
            na_hint: NaHint::from_flag(self.has_na),
            algo: self.algo,
            adaptive: self.adaptive,
        })
    }
}

fn parse_fill(fill: &Vector) -> RollResult<f64> {
    if fill.len() != 1 {
        return Err(RollError::InvalidFillValue(format!(
            "got {} values",
            fill.len()
        )));
    }

    match fill {
        Vector::Real(values) => Ok(values[0]),
        Vector::Integer(values) => Ok(values[0].map_or(NA_REAL, f64::from)),
        Vector::Logical(values) if values[0].is_none() => Ok(NA_REAL),
        other => Err(RollError::InvalidFillValue(format!(
            "got {} value",
            other.type_name()
        ))),
    }
}

/// Validated, read-only options handed to every kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlobalOptions {
    pub fill: f64,
    pub align: Align,
    pub na_rm: bool,
    pub na_hint: NaHint,
    pub algo: Algorithm,
    pub adaptive: bool,
}
