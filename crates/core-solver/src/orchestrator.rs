//! End-to-end run coordination: validate, seed the RNG, run SA then GA,
//! derive the road network, check compliance, optionally analyze
//! robustness, and package everything into a `ResultBundle`.
//!
//! The orchestrator owns the single source of truth for the run seed and
//! hands deterministic substreams to every worker. Cancellation (external
//! or wall-clock budget) is cooperative: phases check the shared token at
//! iteration/generation boundaries and the best-so-far is packaged with
//! `cancelled = true`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use core_evaluate::{EvalContext, Evaluator};
use core_events::{CancelToken, Phase, ProgressBus, ProgressEvent};
use core_model::ProblemSpec;
use core_operators::{
    AdaptiveSelector, Crossover, Mutation, OperatorFamily, OperatorParams, OperatorRegistry,
    Perturbation, Schedule, ScheduleSet,
};
use core_quality::{
    ComplianceChecker, ParetoFront, RobustnessAnalyzer, RobustnessConfig,
};
use core_roads::RoadNetworkBuilder;

use crate::error::SolverError;
use crate::ga::GaRefiner;
use crate::result::{ConvergenceTraces, PhaseTrace, ResultBundle, Timings};
use crate::sa::SaExplorer;

pub struct Orchestrator {
    spec: ProblemSpec,
    evaluator: Arc<dyn Evaluator>,
    registry: OperatorRegistry,
    bus: ProgressBus,
    cancel: CancelToken,
}

impl Orchestrator {
    pub fn new(spec: ProblemSpec, evaluator: Arc<dyn Evaluator>) -> Self {
        Self {
            spec,
            evaluator,
            registry: OperatorRegistry::with_builtins(),
            bus: ProgressBus::new(),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the operator registry (e.g. to add custom operators).
    pub fn with_registry(mut self, registry: OperatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Subscribe to mid-run progress events.
    pub fn subscribe(&self) -> Receiver<ProgressEvent> {
        self.bus.subscribe()
    }

    /// Shared cancellation handle for the embedding application.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(self) -> Result<ResultBundle, SolverError> {
        self.spec.validate()?;
        let seed = self
            .spec
            .rng_seed
            .unwrap_or_else(|| rand::thread_rng().gen());
        if let Some(budget_ms) = self.spec.wall_clock_budget_ms {
            self.cancel.set_budget(Duration::from_millis(budget_ms));
        }
        info!(
            target: "solver",
            problem = self.spec.problem_id.as_str(),
            buildings = self.spec.buildings.len(),
            seed,
            "run_started"
        );

        // operator instances + their adaptive selectors, built from the
        // registry so runtime-registered operators participate
        let params = OperatorParams::default();
        let perturbation_names = self.registry.names(OperatorFamily::Perturbation);
        let perturbations: Vec<Perturbation> = perturbation_names
            .iter()
            .map(|n| self.registry.create_perturbation(n, &params))
            .collect::<Result<_, _>>()
            .expect("registry enumerates its own names");
        let mutation_names = self.registry.names(OperatorFamily::Mutation);
        let mutations: Vec<Mutation> = mutation_names
            .iter()
            .map(|n| self.registry.create_mutation(n, &params))
            .collect::<Result<_, _>>()
            .expect("registry enumerates its own names");
        let crossover_names = self.registry.names(OperatorFamily::Crossover);
        let crossovers: Vec<Crossover> = crossover_names
            .iter()
            .map(|n| self.registry.create_crossover(n, &params))
            .collect::<Result<_, _>>()
            .expect("registry enumerates its own names");

        let adaptive = &self.spec.adaptive;
        let perturbation_selector = AdaptiveSelector::new(
            adaptive.strategy,
            adaptive.enabled,
            perturbation_names,
        );
        let mutation_selector =
            AdaptiveSelector::new(adaptive.strategy, adaptive.enabled, mutation_names);
        let crossover_selector =
            AdaptiveSelector::new(adaptive.strategy, adaptive.enabled, crossover_names);

        // schedules anchored at the configured initial rates
        let mut schedules = ScheduleSet::with_defaults();
        schedules.insert(
            "crossover_rate",
            Schedule::Linear {
                from: self.spec.ga.crossover_rate,
                to: self.spec.ga.crossover_rate * 0.7,
            },
        );
        schedules.insert(
            "mutation_rate",
            Schedule::Linear {
                from: self.spec.ga.mutation_rate,
                to: self.spec.ga.mutation_rate * 0.15,
            },
        );
        schedules.insert(
            "temperature",
            Schedule::Exponential {
                from: self.spec.sa.initial_temp,
                to: self.spec.sa.final_temp,
            },
        );

        // phase 1: annealing exploration
        let sa_started = Instant::now();
        let sa = SaExplorer {
            spec: &self.spec,
            evaluator: Arc::clone(&self.evaluator),
            selector: &perturbation_selector,
            operators: &perturbations,
            bus: &self.bus,
            cancel: &self.cancel,
            run_seed: seed,
        }
        .run()?;
        let sa_ms = sa_started.elapsed().as_millis() as u64;

        // phase 2: genetic refinement
        let archive = Mutex::new(ParetoFront::new());
        let ga_started = Instant::now();
        let ga = GaRefiner {
            spec: &self.spec,
            evaluator: Arc::clone(&self.evaluator),
            crossover_selector: &crossover_selector,
            mutation_selector: &mutation_selector,
            crossovers: &crossovers,
            mutations: &mutations,
            schedules: &schedules,
            archive: &archive,
            bus: &self.bus,
            cancel: &self.cancel,
            run_seed: seed,
        }
        .run(sa.top.clone())?;
        let ga_ms = ga_started.elapsed().as_millis() as u64;

        // the winner across both phases
        let mut best = ga.best;
        if let Some(sa_best) = sa.top.first() {
            if sa_best.fitness.unwrap_or(f64::NEG_INFINITY)
                > best.fitness.unwrap_or(f64::NEG_INFINITY)
            {
                best = sa_best.clone();
            }
        }
        let mut front = archive.into_inner().expect("pareto archive poisoned");
        front.try_insert(best.clone());

        // phase 3: roads from the winning layout
        let road_started = Instant::now();
        let road_network = RoadNetworkBuilder::new(self.spec.road.clone()).build(
            &self.spec.site,
            &best,
            &self.spec.buildings,
        );
        let road_ms = road_started.elapsed().as_millis() as u64;
        self.bus.publish(ProgressEvent {
            elapsed_ms: self.bus.elapsed_ms(),
            phase: Phase::Roads,
            iteration: 0,
            best_fitness: best.fitness.unwrap_or(f64::NEG_INFINITY),
            population_diversity: 0.0,
            operator_mix: Vec::new(),
        });

        // quality: compliance always, robustness on demand
        let compliance = ComplianceChecker::new(
            self.spec.quality.compliance.clone(),
            self.spec.boundary_margin,
        )
        .check(&best, &self.spec.site, &self.spec.buildings);

        let mut diagnostics = Vec::new();
        diagnostics.extend(sa.diagnostics.iter().cloned());
        diagnostics.extend(ga.diagnostics.iter().cloned());
        if sa.infeasible_seeds > 0 {
            diagnostics.push(format!(
                "{} of {} chains started from an infeasible seed",
                sa.infeasible_seeds,
                self.spec.sa.num_chains.max(1)
            ));
        }

        let robustness = if self.spec.quality.assess_robustness {
            let ctx = EvalContext {
                site: &self.spec.site,
                buildings: &self.spec.buildings,
                boundary_margin: self.spec.boundary_margin,
            };
            let analyzer = RobustnessAnalyzer::new(
                &*self.evaluator,
                RobustnessConfig {
                    samples: self.spec.quality.robustness_samples,
                    strength: self.spec.quality.robustness_strength,
                    rotate: false,
                },
            );
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(0x0b0b));
            match analyzer.analyze(&best, &ctx, &mut rng) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(target: "solver", error = %e, "robustness_analysis_failed");
                    diagnostics.push(format!("robustness analysis failed: {e}"));
                    None
                }
            }
        } else {
            None
        };
        self.bus.publish(ProgressEvent {
            elapsed_ms: self.bus.elapsed_ms(),
            phase: Phase::Quality,
            iteration: 0,
            best_fitness: best.fitness.unwrap_or(f64::NEG_INFINITY),
            population_diversity: 0.0,
            operator_mix: Vec::new(),
        });

        let mut operator_stats = BTreeMap::new();
        operator_stats.insert("perturbation".to_string(), perturbation_selector.snapshot());
        operator_stats.insert("mutation".to_string(), mutation_selector.snapshot());
        operator_stats.insert("crossover".to_string(), crossover_selector.snapshot());

        let cancelled = self.cancel.is_cancelled();
        if cancelled {
            diagnostics.push("run cancelled; bundle holds the best observed so far".into());
        }
        info!(
            target: "solver",
            best_fitness = best.fitness.unwrap_or(f64::NEG_INFINITY),
            front = front.len(),
            cancelled,
            sa_ms,
            ga_ms,
            road_ms,
            "run_finished"
        );

        Ok(ResultBundle {
            problem_id: self.spec.problem_id.clone(),
            rng_seed_used: seed,
            cancelled,
            best_solution: best,
            pareto_front: front.members().to_vec(),
            operator_stats,
            compliance,
            robustness,
            road_network,
            timings: Timings {
                sa_ms,
                ga_ms,
                road_ms,
            },
            convergence: ConvergenceTraces {
                sa: PhaseTrace {
                    best: sa.best_trace,
                    average: sa.avg_trace,
                },
                ga: PhaseTrace {
                    best: ga.best_trace,
                    average: ga.avg_trace,
                },
            },
            diagnostics,
        })
    }
}

/// Convenience wrapper: run a spec against an evaluator with defaults.
pub fn solve(
    spec: ProblemSpec,
    evaluator: Arc<dyn Evaluator>,
) -> Result<ResultBundle, SolverError> {
    Orchestrator::new(spec, evaluator).run()
}
