//! The fitness contract between the solver and the embedding application.
//!
//! The core never defines objective semantics; it consumes any
//! implementation of [`Evaluator`] that is deterministic for identical
//! inputs and safe to call from parallel workers. Aggregate fitness is
//! maximized; minimization objectives are negated by the evaluator.
//!
//! A bounded memoizing wrapper is provided for expensive evaluators, keyed
//! by the 1 m-quantized solution fingerprint.

pub mod builtin;
pub mod memo;

pub use builtin::{ConstantEvaluator, DispersionEvaluator};
pub use memo::MemoEvaluator;

use std::collections::BTreeMap;

use thiserror::Error;

use core_model::{Building, ConstraintViolation, Site, Solution};

/// Immutable problem context borrowed by every evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub site: &'a Site,
    pub buildings: &'a [Building],
    pub boundary_margin: f64,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FitnessResult {
    /// Aggregate scalar, higher is better.
    pub fitness: f64,
    /// Named objective components in the dominance frame (all maximized).
    pub objectives: BTreeMap<String, f64>,
    /// Constraint findings the evaluator chose to report.
    pub violations: Vec<ConstraintViolation>,
}

impl FitnessResult {
    pub fn scalar(fitness: f64) -> Self {
        Self {
            fitness,
            ..Default::default()
        }
    }

    /// NaN or infinite fitness/objectives mark numerical failure upstream.
    pub fn is_finite(&self) -> bool {
        self.fitness.is_finite() && self.objectives.values().all(|v| v.is_finite())
    }
}

#[derive(Debug, Error)]
pub enum EvaluatorError {
    #[error("evaluator failed: {0}")]
    Failure(String),
}

pub type EvalResult = Result<FitnessResult, EvaluatorError>;

/// The pluggable fitness/constraint engine.
///
/// Contract: deterministic given identical `(solution, ctx)`, no hidden
/// state, thread-safe, and cheap enough for ~10^4 calls per run.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, solution: &Solution, ctx: &EvalContext<'_>) -> EvalResult;

    /// Stable name for diagnostics.
    fn name(&self) -> &str {
        "evaluator"
    }
}

impl<E: Evaluator + ?Sized> Evaluator for std::sync::Arc<E> {
    fn evaluate(&self, solution: &Solution, ctx: &EvalContext<'_>) -> EvalResult {
        (**self).evaluate(solution, ctx)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
