//! Parallel Metropolis exploration. One worker per chain; chains are
//! independent given their RNG substream, sharing only the adaptive
//! selector (mutex) and the progress channel. Chain 0 drives progress
//! publication so event iterations stay monotonic.

use std::sync::Arc;

use crossbeam_channel::unbounded;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use core_evaluate::{EvalContext, Evaluator, FitnessResult};
use core_events::{CancelToken, Phase, ProgressBus, ProgressEvent};
use core_model::{population_diversity, ProblemSpec, Solution};
use core_operators::{AdaptiveSelector, Perturbation};

use crate::error::SolverError;
use crate::seeding::seed_solution;

/// Per-chain archive of improving solutions handed to the GA.
const CHAIN_ARCHIVE: usize = 8;

pub(crate) struct SaOutcome {
    /// All chains' archives merged, best fitness first, truncated to
    /// `ga.population_size / 2` by the caller.
    pub top: Vec<Solution>,
    pub best_trace: Vec<f64>,
    pub avg_trace: Vec<f64>,
    pub stalled_chains: usize,
    pub infeasible_seeds: usize,
    pub diagnostics: Vec<String>,
}

struct ChainResult {
    archive: Vec<Solution>,
    best_trace: Vec<f64>,
    current_trace: Vec<f64>,
    stalled: bool,
    feasible_seed: bool,
    diagnostics: Vec<String>,
}

enum ChainMsg {
    Progress {
        chain: usize,
        iteration: usize,
        best_fitness: f64,
        current: Solution,
    },
    Done(usize, Result<ChainResult, SolverError>),
}

pub(crate) struct SaExplorer<'a> {
    pub spec: &'a ProblemSpec,
    pub evaluator: Arc<dyn Evaluator>,
    pub selector: &'a AdaptiveSelector,
    pub operators: &'a [Perturbation],
    pub bus: &'a ProgressBus,
    pub cancel: &'a CancelToken,
    pub run_seed: u64,
}

impl SaExplorer<'_> {
    pub fn run(&self) -> Result<SaOutcome, SolverError> {
        let num_chains = self.spec.sa.num_chains.max(1);
        let (tx, rx) = unbounded::<ChainMsg>();

        let results: Vec<Result<ChainResult, SolverError>> = std::thread::scope(|scope| {
            for chain in 0..num_chains {
                let tx = tx.clone();
                scope.spawn(move || {
                    let result = self.run_chain(chain, &tx);
                    let _ = tx.send(ChainMsg::Done(chain, result));
                });
            }
            drop(tx);

            // coordinator: publish progress from chain 0's cadence with a
            // cross-chain view of best fitness and diversity
            let mut currents: Vec<Option<Solution>> = vec![None; num_chains];
            let mut global_best = f64::NEG_INFINITY;
            let mut done: Vec<Option<Result<ChainResult, SolverError>>> =
                (0..num_chains).map(|_| None).collect();
            for msg in rx.iter() {
                match msg {
                    ChainMsg::Progress {
                        chain,
                        iteration,
                        best_fitness,
                        current,
                    } => {
                        currents[chain] = Some(current);
                        global_best = global_best.max(best_fitness);
                        if chain == 0 && self.bus.has_subscribers() {
                            let population: Vec<Solution> =
                                currents.iter().flatten().cloned().collect();
                            self.bus.publish(ProgressEvent {
                                elapsed_ms: self.bus.elapsed_ms(),
                                phase: Phase::Sa,
                                iteration,
                                best_fitness: global_best,
                                population_diversity: population_diversity(&population),
                                operator_mix: self.selector.mix(),
                            });
                        }
                    }
                    ChainMsg::Done(chain, result) => {
                        done[chain] = Some(result);
                    }
                }
            }
            done.into_iter().flatten().collect()
        });

        let mut outcome = SaOutcome {
            top: Vec::new(),
            best_trace: Vec::new(),
            avg_trace: Vec::new(),
            stalled_chains: 0,
            infeasible_seeds: 0,
            diagnostics: Vec::new(),
        };
        let mut chain_results = Vec::with_capacity(results.len());
        for result in results {
            chain_results.push(result?);
        }

        let iterations = chain_results
            .iter()
            .map(|c| c.best_trace.len())
            .max()
            .unwrap_or(0);
        for i in 0..iterations {
            let mut best = f64::NEG_INFINITY;
            let mut sum = 0.0;
            let mut n = 0usize;
            for c in &chain_results {
                // chains that stopped early hold their last value
                let idx = i.min(c.best_trace.len().saturating_sub(1));
                if let Some(v) = c.best_trace.get(idx) {
                    best = best.max(*v);
                }
                if let Some(v) = c.current_trace.get(idx) {
                    sum += v;
                    n += 1;
                }
            }
            outcome.best_trace.push(best);
            outcome
                .avg_trace
                .push(if n > 0 { sum / n as f64 } else { 0.0 });
        }

        for mut c in chain_results {
            outcome.top.append(&mut c.archive);
            outcome.stalled_chains += c.stalled as usize;
            outcome.infeasible_seeds += !c.feasible_seed as usize;
            outcome.diagnostics.append(&mut c.diagnostics);
        }
        outcome.top.sort_by(|a, b| {
            b.fitness
                .unwrap_or(f64::NEG_INFINITY)
                .partial_cmp(&a.fitness.unwrap_or(f64::NEG_INFINITY))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let keep = (self.spec.ga.population_size / 2).max(1);
        outcome.top.truncate(keep);

        info!(
            target: "solver.sa",
            chains = num_chains,
            kept = outcome.top.len(),
            stalled = outcome.stalled_chains,
            best = outcome.best_trace.last().copied().unwrap_or(f64::NEG_INFINITY),
            "sa_done"
        );
        Ok(outcome)
    }

    fn run_chain(
        &self,
        chain: usize,
        tx: &crossbeam_channel::Sender<ChainMsg>,
    ) -> Result<ChainResult, SolverError> {
        let sa = &self.spec.sa;
        let ctx = EvalContext {
            site: &self.spec.site,
            buildings: &self.spec.buildings,
            boundary_margin: self.spec.boundary_margin,
        };
        let mut rng = StdRng::seed_from_u64(self.run_seed.wrapping_add(chain as u64));
        let mut diagnostics = Vec::new();

        let seed = seed_solution(self.spec, &mut rng);
        if !seed.feasible {
            diagnostics.push(format!(
                "chain {chain}: no feasible seed within retry budget, proceeding with least-violating layout"
            ));
        }
        let mut current = seed.solution;
        let feasible_seed = seed.feasible;
        let mut current_fitness = self
            .evaluate(&current, chain, 0, &mut rng, &ctx, &mut diagnostics)?
            .ok_or_else(|| SolverError::Evaluator {
                phase: Phase::Sa,
                fingerprint: current.fingerprint(),
                source: core_evaluate::EvaluatorError::Failure(
                    "initial evaluation failed twice".into(),
                ),
            })?
            .fitness;
        current = current.clone().with_fitness(current_fitness, Default::default());

        let mut best = current.clone();
        let mut best_fitness = current_fitness;
        let mut archive: Vec<Solution> = vec![best.clone()];
        let mut best_trace = Vec::with_capacity(sa.chain_iterations);
        let mut current_trace = Vec::with_capacity(sa.chain_iterations);
        let mut temperature = sa.initial_temp;
        let mut stall = 0usize;
        let mut stalled = false;
        let patience = sa.effective_stall_patience();

        for iteration in 0..sa.chain_iterations {
            if self.cancel.is_cancelled() {
                diagnostics.push(format!("chain {chain}: cancelled at iteration {iteration}"));
                break;
            }
            if stall >= patience {
                debug!(target: "solver.sa", chain, iteration, "chain_stalled_early_stop");
                break;
            }

            let op_idx = self.selector.choose(&mut rng);
            let neighbor = self.operators[op_idx].perturb(
                &current,
                &self.spec.site.bounds,
                self.spec.boundary_margin,
                temperature,
                &mut rng,
            );
            let result = match self.evaluate(
                &neighbor,
                chain,
                iteration,
                &mut rng,
                &ctx,
                &mut diagnostics,
            )? {
                Some(r) => r,
                None => {
                    stalled = true;
                    diagnostics
                        .push(format!("chain {chain}: stalled by evaluator failures at iteration {iteration}"));
                    break;
                }
            };
            let neighbor_fitness = result.fitness;
            let delta = neighbor_fitness - current_fitness;

            // Metropolis: accept improvements outright, worsenings with
            // probability exp(delta / T)
            let accept = delta >= 0.0 || rng.gen::<f64>() < (delta / temperature).exp();
            if accept {
                current = neighbor
                    .clone()
                    .with_fitness(neighbor_fitness, result.objectives.clone());
                current_fitness = neighbor_fitness;
            }
            if neighbor_fitness > best_fitness {
                best = neighbor.with_fitness(neighbor_fitness, result.objectives);
                best_fitness = neighbor_fitness;
                push_bounded(&mut archive, best.clone());
                stall = 0;
            } else {
                stall += 1;
            }
            self.selector.credit(op_idx, delta);

            best_trace.push(best_fitness);
            current_trace.push(current_fitness);
            let _ = tx.send(ChainMsg::Progress {
                chain,
                iteration,
                best_fitness,
                current: current.clone(),
            });

            temperature = (temperature * sa.cooling_rate).max(sa.final_temp);
            if temperature <= sa.final_temp {
                debug!(target: "solver.sa", chain, iteration, "final_temperature_reached");
                break;
            }
        }

        Ok(ChainResult {
            archive,
            best_trace,
            current_trace,
            stalled,
            feasible_seed,
            diagnostics,
        })
    }

    /// Evaluate with the retry-once policy: a failure is retried on a
    /// re-randomized neighbor; a second consecutive failure yields
    /// `Ok(None)` (the chain stalls, the run continues). Non-finite
    /// fitness is fatal.
    fn evaluate(
        &self,
        solution: &Solution,
        chain: usize,
        iteration: usize,
        rng: &mut StdRng,
        ctx: &EvalContext<'_>,
        diagnostics: &mut Vec<String>,
    ) -> Result<Option<FitnessResult>, SolverError> {
        match self.evaluator.evaluate(solution, ctx) {
            Ok(result) => {
                self.ensure_finite(&result, solution, iteration)?;
                Ok(Some(result))
            }
            Err(first) => {
                warn!(
                    target: "solver.sa",
                    chain,
                    iteration,
                    fingerprint = %solution.fingerprint(),
                    error = %first,
                    "evaluator_failure_retrying"
                );
                diagnostics.push(format!(
                    "chain {chain}: evaluator failed on {} ({first}), retrying once",
                    solution.fingerprint()
                ));
                let retry = Perturbation::RandomReset.perturb(
                    solution,
                    &self.spec.site.bounds,
                    self.spec.boundary_margin,
                    1.0,
                    rng,
                );
                match self.evaluator.evaluate(&retry, ctx) {
                    Ok(result) => {
                        self.ensure_finite(&result, &retry, iteration)?;
                        Ok(Some(result))
                    }
                    Err(_) => Ok(None),
                }
            }
        }
    }

    fn ensure_finite(
        &self,
        result: &FitnessResult,
        solution: &Solution,
        iteration: usize,
    ) -> Result<(), SolverError> {
        if !result.is_finite() || !solution.all_finite() {
            return Err(SolverError::Numerical {
                phase: Phase::Sa,
                iteration,
                fingerprint: solution.fingerprint(),
                detail: "non-finite fitness or position".into(),
            });
        }
        Ok(())
    }
}

fn push_bounded(archive: &mut Vec<Solution>, solution: Solution) {
    archive.push(solution);
    if archive.len() > CHAIN_ARCHIVE {
        archive.remove(0);
    }
}
