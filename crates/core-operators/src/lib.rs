//! Search operators and the machinery that selects between them.
//!
//! Each operator family is a tagged sum (`Perturbation`, `Mutation`,
//! `Crossover`, `Selection`): variants carry their parameters, application
//! is a method taking the RNG explicitly, and no operator holds mutable
//! state. Determinism contract: identical inputs plus identical RNG state
//! produce identical outputs.
//!
//! `OperatorRegistry` maps `(family, name)` to factory closures so
//! embedders can register custom operators at runtime. `AdaptiveSelector`
//! learns which operator of a family pays off during the run and biases
//! selection accordingly. `Schedule` maps run progress to parameter values
//! (mutation rate, temperature, ...).

pub mod adaptive;
pub mod crossover;
pub mod mutation;
pub mod perturbation;
pub mod registry;
pub mod schedule;
pub mod selection;

pub use adaptive::{AdaptiveSelector, OperatorStatsSnapshot};
pub use crossover::Crossover;
pub use mutation::Mutation;
pub use perturbation::Perturbation;
pub use registry::{
    Factory, OperatorFamily, OperatorKind, OperatorParams, OperatorRegistry, RegistryError,
};
pub use schedule::{Schedule, ScheduleSet};
pub use selection::{Ranked, Selection};

use core_model::{Bounds, Point};
use rand::rngs::StdRng;
use rand::Rng;

/// Uniform draw inside `bounds` inset by `margin`.
pub fn uniform_point(bounds: &Bounds, margin: f64, rng: &mut StdRng) -> Point {
    let inner = bounds.inset(margin);
    Point::new(
        rng.gen_range(inner.x_min..=inner.x_max),
        rng.gen_range(inner.y_min..=inner.y_max),
    )
}
