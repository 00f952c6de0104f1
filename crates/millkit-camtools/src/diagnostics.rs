//! Non-fatal planning warnings.
//!
//! Planners never fail on these; they record them, log them at `warn`
//! level, and carry on with a degraded but usable result.

use serde::Serialize;
use std::fmt;
use tracing::warn;

/// A recoverable degradation observed while planning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanWarning {
    /// Repeated offsetting hit the iteration cap before running out of
    /// material.
    LoopLimitReached {
        context: String,
        z: f64,
        limit: usize,
    },
    /// A retract query found no safety geometry; the frame was left in place.
    RetractMissed { path_index: usize },
    /// A closest-point query failed during a link; the raw step was kept.
    ClosestPointMissed { path_index: usize, step: usize },
    /// A link ran out of steps before reaching its target.
    LinkNotConverged { path_index: usize, remaining: f64 },
    /// A contour was discarded because it sits under an overhang.
    UndercutRemoved { z: f64 },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoopLimitReached { context, z, limit } => write!(
                f,
                "{context} at z = {z:.3}: offset loop limit of {limit} reached"
            ),
            Self::RetractMissed { path_index } => {
                write!(f, "pass {path_index}: retract found no safety geometry")
            }
            Self::ClosestPointMissed { path_index, step } => write!(
                f,
                "pass {path_index}: closest-point query failed at link step {step}"
            ),
            Self::LinkNotConverged {
                path_index,
                remaining,
            } => write!(
                f,
                "pass {path_index}: link stopped {remaining:.3} short of its target"
            ),
            Self::UndercutRemoved { z } => {
                write!(f, "contour at z = {z:.3} removed: undercut")
            }
        }
    }
}

/// Ordered collection of warnings from one planning run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    warnings: Vec<PlanWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and logs a warning.
    pub fn push(&mut self, warning: PlanWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.warnings.extend(other.warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanWarning> {
        self.warnings.iter()
    }

    /// Number of warnings matching a predicate.
    pub fn count(&self, predicate: impl Fn(&PlanWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| predicate(w)).count()
    }
}
