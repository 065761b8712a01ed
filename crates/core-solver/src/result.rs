//! The final packaging of a run. Every map inside is a `BTreeMap` and
//! every list is emitted in a deterministic order, so serializing the
//! bundle twice yields byte-identical JSON (the canonical-form law the
//! embedding layer relies on).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use core_model::Solution;
use core_operators::OperatorStatsSnapshot;
use core_quality::{ComplianceReport, RobustnessReport};
use core_roads::RoadNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Timings {
    pub sa_ms: u64,
    pub ga_ms: u64,
    pub road_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PhaseTrace {
    /// Best fitness after each iteration/generation.
    pub best: Vec<f64>,
    /// Mean fitness of the live population at the same points.
    pub average: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConvergenceTraces {
    pub sa: PhaseTrace,
    pub ga: PhaseTrace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub problem_id: String,
    pub rng_seed_used: u64,
    pub cancelled: bool,
    pub best_solution: Solution,
    /// Mutually non-dominated solutions with their objective vectors.
    pub pareto_front: Vec<Solution>,
    /// Operator statistics per family.
    pub operator_stats: BTreeMap<String, Vec<OperatorStatsSnapshot>>,
    pub compliance: ComplianceReport,
    #[serde(default)]
    pub robustness: Option<RobustnessReport>,
    pub road_network: RoadNetwork,
    pub timings: Timings,
    pub convergence: ConvergenceTraces,
    /// Ordered record of non-fatal conditions observed during the run.
    pub diagnostics: Vec<String>,
}

impl ResultBundle {
    /// Canonical JSON form: stable key order, stable float formatting.
    pub fn to_canonical_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
