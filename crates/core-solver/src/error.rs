//! Fatal solver errors. Non-fatal conditions (infeasible seeds, stalled
//! chains, cancellation, budget exhaustion) are carried in the
//! `ResultBundle` diagnostics instead.

use thiserror::Error;

use core_evaluate::EvaluatorError;
use core_events::Phase;
use core_model::{Fingerprint, ValidationError};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// NaN/Inf fitness or non-finite positions. The offending solution's
    /// fingerprint pins down what the evaluator saw.
    #[error("numerical failure in {phase} at iteration {iteration} on solution {fingerprint}: {detail}")]
    Numerical {
        phase: Phase,
        iteration: usize,
        fingerprint: Fingerprint,
        detail: String,
    },

    /// The same solution failed evaluation twice in a row.
    #[error("evaluator failed twice in {phase} on solution {fingerprint}")]
    Evaluator {
        phase: Phase,
        fingerprint: Fingerprint,
        #[source]
        source: EvaluatorError,
    },
}
