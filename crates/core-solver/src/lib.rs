//! The H-SAGA optimizer: parallel simulated-annealing exploration seeding
//! an NSGA-style genetic refinement, orchestrated end to end into a
//! `ResultBundle` with roads, compliance, and quality metrics.
//!
//! Layering: `sa` and `ga` are the two search phases, `nsga` holds the
//! dominance machinery they share, `orchestrator` wires phases, progress,
//! cancellation and packaging together. Nothing here repairs solutions
//! after seeding; constraint pressure reaches the search only through the
//! evaluator.

pub mod error;
pub mod ga;
pub mod nsga;
pub mod orchestrator;
pub mod result;
pub mod sa;
mod seeding;

pub use error::SolverError;
pub use orchestrator::{solve, Orchestrator};
pub use result::{ConvergenceTraces, PhaseTrace, ResultBundle, Timings};
