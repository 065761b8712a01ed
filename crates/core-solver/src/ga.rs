//! Genetic refinement seeded from SA. Selection, crossover and mutation
//! run on the coordinator thread (single RNG, reproducible); child
//! evaluation fans out to a worker pool with a barrier at the end of each
//! generation. Replacement is elitist with NSGA-II ranking plus a reserved
//! share of diversity injections.

use std::sync::{Arc, Mutex};

use crossbeam_channel::unbounded;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use core_evaluate::{EvalContext, Evaluator};
use core_events::{CancelToken, Phase, ProgressBus, ProgressEvent};
use core_model::{population_diversity, ProblemSpec, Solution};
use core_operators::{
    AdaptiveSelector, Crossover, Mutation, Perturbation, ScheduleSet, Selection,
};
use core_quality::ParetoFront;

use crate::error::SolverError;
use crate::nsga::{score_population, ScoredIndividual};
use crate::seeding::seed_solution;

/// Share of post-elite slots reserved for diversity injection.
const DIVERSITY_SHARE: f64 = 0.10;
/// Diversity threshold as a fraction of the site diagonal.
const DIVERSITY_DISTANCE_FACTOR: f64 = 0.05;

pub(crate) struct GaOutcome {
    pub best: Solution,
    pub best_trace: Vec<f64>,
    pub avg_trace: Vec<f64>,
    pub generations_run: usize,
    pub diagnostics: Vec<String>,
}

/// Which selector an operator application should be credited against.
enum CreditTarget {
    Crossover,
    Mutation,
}

struct CreditRecord {
    target: CreditTarget,
    op_idx: usize,
    baseline: f64,
    child_slot: usize,
}

pub(crate) struct GaRefiner<'a> {
    pub spec: &'a ProblemSpec,
    pub evaluator: Arc<dyn Evaluator>,
    pub crossover_selector: &'a AdaptiveSelector,
    pub mutation_selector: &'a AdaptiveSelector,
    pub crossovers: &'a [Crossover],
    pub mutations: &'a [Mutation],
    pub schedules: &'a ScheduleSet,
    pub archive: &'a Mutex<ParetoFront>,
    pub bus: &'a ProgressBus,
    pub cancel: &'a CancelToken,
    pub run_seed: u64,
}

impl GaRefiner<'_> {
    pub fn run(&self, sa_top: Vec<Solution>) -> Result<GaOutcome, SolverError> {
        let ga = &self.spec.ga;
        let mut rng = StdRng::seed_from_u64(self.run_seed.wrapping_add(0x9e37));
        let mut diagnostics = Vec::new();

        let mut population = self.seed_population(sa_top, &mut rng, &mut diagnostics)?;
        let mut best = best_of(&population).cloned().ok_or_else(|| {
            SolverError::Numerical {
                phase: Phase::Ga,
                iteration: 0,
                fingerprint: core_model::Fingerprint(0),
                detail: "empty initial population".into(),
            }
        })?;
        let mut best_fitness = best.fitness.unwrap_or(f64::NEG_INFINITY);

        let mut best_trace = Vec::with_capacity(ga.generations);
        let mut avg_trace = Vec::with_capacity(ga.generations);
        let selection = Selection::Tournament {
            size: ga.tournament_size,
        };
        let patience = ga.effective_stall_patience();
        let mut stall = 0usize;
        let mut generations_run = 0usize;

        for generation in 0..ga.generations {
            if self.cancel.is_cancelled() {
                diagnostics.push(format!("GA cancelled at generation {generation}"));
                break;
            }
            if stall > patience {
                debug!(target: "solver.ga", generation, "stall_patience_exhausted");
                break;
            }
            generations_run = generation + 1;
            let progress = generation as f64 / ga.generations.max(1) as f64;
            let crossover_rate = self
                .schedules
                .value("crossover_rate", progress)
                .unwrap_or(ga.crossover_rate);
            let mutation_rate = self
                .schedules
                .value("mutation_rate", progress)
                .unwrap_or(ga.mutation_rate);
            if let Some(tau) = self.schedules.value("softmax_temperature", progress) {
                self.crossover_selector.set_softmax_temperature(tau);
                self.mutation_selector.set_softmax_temperature(tau);
            }

            // selection over the ranked current population
            let scored = score_population(population.clone());
            let parents = selection.select(&scored, ga.population_size.max(2), &mut rng);

            // variation
            let mut children: Vec<Solution> = Vec::with_capacity(ga.population_size);
            let mut credits: Vec<CreditRecord> = Vec::new();
            for pair in parents.chunks(2) {
                let (p1, p2) = match pair {
                    [a, b] => (*a, *b),
                    [a] => (*a, *a),
                    _ => unreachable!("chunks(2) yields 1- or 2-element slices"),
                };
                let parent_baseline = p1.fitness_key_max(p2);
                let (mut c1, mut c2) = if rng.gen::<f64>() < crossover_rate {
                    let op_idx = self.crossover_selector.choose(&mut rng);
                    let (c1, c2) =
                        self.crossovers[op_idx].cross(&p1.solution, &p2.solution, &mut rng);
                    for offset in 0..2 {
                        credits.push(CreditRecord {
                            target: CreditTarget::Crossover,
                            op_idx,
                            baseline: parent_baseline,
                            child_slot: children.len() + offset,
                        });
                    }
                    (c1, c2)
                } else {
                    (p1.solution.clone(), p2.solution.clone())
                };
                for child in [&mut c1, &mut c2] {
                    if rng.gen::<f64>() < mutation_rate {
                        let op_idx = self.mutation_selector.choose(&mut rng);
                        *child = self.mutations[op_idx].mutate(
                            child,
                            &self.spec.site.bounds,
                            self.spec.boundary_margin,
                            &mut rng,
                        );
                        credits.push(CreditRecord {
                            target: CreditTarget::Mutation,
                            op_idx,
                            baseline: parent_baseline,
                            child_slot: children.len(),
                        });
                    }
                    children.push(std::mem::take(child));
                    if children.len() >= ga.population_size {
                        break;
                    }
                }
                if children.len() >= ga.population_size {
                    break;
                }
            }

            // evaluation barrier: generation g+1 never starts before every
            // child of g is scored. Slots keep their index so dropped
            // children do not shift the credit records.
            let child_slots = self.evaluate_slots(children, generation, &mut diagnostics)?;

            for record in &credits {
                if let Some(Some(child)) = child_slots.get(record.child_slot) {
                    let delta = child.fitness.unwrap_or(f64::NEG_INFINITY) - record.baseline;
                    match record.target {
                        CreditTarget::Crossover => {
                            self.crossover_selector.credit(record.op_idx, delta)
                        }
                        CreditTarget::Mutation => self.mutation_selector.credit(record.op_idx, delta),
                    }
                }
            }
            let children: Vec<Solution> = child_slots.into_iter().flatten().collect();

            {
                let mut front = self.archive.lock().expect("pareto archive poisoned");
                for child in &children {
                    front.try_insert(child.clone());
                }
            }

            population = self.replace(population, children, &mut rng, &mut diagnostics)?;

            let generation_best = best_of(&population).cloned();
            if let Some(candidate) = generation_best {
                let f = candidate.fitness.unwrap_or(f64::NEG_INFINITY);
                if f > best_fitness {
                    best = candidate;
                    best_fitness = f;
                    stall = 0;
                } else {
                    stall += 1;
                }
            }
            best_trace.push(best_fitness);
            let avg = population
                .iter()
                .filter_map(|s| s.fitness)
                .sum::<f64>()
                / population.len().max(1) as f64;
            avg_trace.push(avg);

            if self.bus.has_subscribers() {
                let mut mix = Vec::new();
                for (name, p) in self.crossover_selector.mix() {
                    mix.push((format!("crossover:{name}"), p));
                }
                for (name, p) in self.mutation_selector.mix() {
                    mix.push((format!("mutation:{name}"), p));
                }
                self.bus.publish(ProgressEvent {
                    elapsed_ms: self.bus.elapsed_ms(),
                    phase: Phase::Ga,
                    iteration: generation,
                    best_fitness,
                    population_diversity: population_diversity(&population),
                    operator_mix: mix,
                });
            }
        }

        info!(
            target: "solver.ga",
            generations = generations_run,
            best = best_fitness,
            front = self.archive.lock().expect("pareto archive poisoned").len(),
            "ga_done"
        );
        Ok(GaOutcome {
            best,
            best_trace,
            avg_trace,
            generations_run,
            diagnostics,
        })
    }

    /// 50% SA elites, 30% mutated variants of them, 20% fresh random
    /// layouts.
    fn seed_population(
        &self,
        sa_top: Vec<Solution>,
        rng: &mut StdRng,
        diagnostics: &mut Vec<String>,
    ) -> Result<Vec<Solution>, SolverError> {
        let target = self.spec.ga.population_size.max(2);
        let mut population: Vec<Solution> = Vec::with_capacity(target);
        let elite_share = (target / 2).min(sa_top.len());
        population.extend(sa_top.iter().take(elite_share).cloned());

        let variant_share = (target * 3 / 10).max(1);
        if !sa_top.is_empty() {
            for i in 0..variant_share {
                if population.len() >= target {
                    break;
                }
                let base = &sa_top[i % sa_top.len()];
                let variant = Mutation::Gaussian { sigma: 15.0 }.mutate(
                    base,
                    &self.spec.site.bounds,
                    self.spec.boundary_margin,
                    rng,
                );
                population.push(variant);
            }
        }
        while population.len() < target {
            population.push(seed_solution(self.spec, rng).solution);
        }
        self.evaluate_batch(population, 0, diagnostics)
    }

    /// Elitist replacement with NSGA ranking and diversity injection.
    fn replace(
        &self,
        parents: Vec<Solution>,
        children: Vec<Solution>,
        rng: &mut StdRng,
        diagnostics: &mut Vec<String>,
    ) -> Result<Vec<Solution>, SolverError> {
        let ga = &self.spec.ga;
        let target = ga.population_size.max(2);
        let mut pool: Vec<Solution> = parents;
        pool.extend(children);
        pool.sort_by(|a, b| {
            b.fitness
                .unwrap_or(f64::NEG_INFINITY)
                .partial_cmp(&a.fitness.unwrap_or(f64::NEG_INFINITY))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let elite_size = ga.elite_size.min(target);
        let mut next: Vec<Solution> = pool.iter().take(elite_size).cloned().collect();
        let rest: Vec<Solution> = pool.into_iter().skip(elite_size).collect();

        let slots = target - next.len();
        let diversity_slots = ((slots as f64) * DIVERSITY_SHARE).round() as usize;
        let nsga_slots = slots - diversity_slots;

        // rank the remainder and fill by (rank, crowding)
        let mut scored = score_population(rest);
        scored.sort_by(|a, b| {
            a.rank.cmp(&b.rank).then_with(|| {
                b.crowding
                    .partial_cmp(&a.crowding)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
        });
        let mut remainder: Vec<ScoredIndividual> = Vec::new();
        for individual in scored {
            if next.len() < elite_size + nsga_slots {
                next.push(individual.solution);
            } else {
                remainder.push(individual);
            }
        }

        // diversity injection: far-from-elite leftovers, topped up with
        // fresh random layouts
        if diversity_slots > 0 {
            let threshold = DIVERSITY_DISTANCE_FACTOR
                * (self.spec.site.bounds.width().powi(2)
                    + self.spec.site.bounds.height().powi(2))
                .sqrt();
            let elites: Vec<Solution> = next.iter().take(elite_size).cloned().collect();
            let mut injected = 0usize;
            for individual in remainder {
                if injected >= diversity_slots {
                    break;
                }
                let min_distance = elites
                    .iter()
                    .map(|e| solution_distance(e, &individual.solution))
                    .fold(f64::INFINITY, f64::min);
                if min_distance > threshold {
                    next.push(individual.solution);
                    injected += 1;
                }
            }
            if injected < diversity_slots {
                let fresh: Vec<Solution> = (injected..diversity_slots)
                    .map(|_| seed_solution(self.spec, rng).solution)
                    .collect();
                let fresh = self.evaluate_batch(fresh, usize::MAX, diagnostics)?;
                next.extend(fresh);
            }
        }
        next.truncate(target);
        Ok(next)
    }

    /// Evaluate every unevaluated solution, batched across workers; the
    /// call returns only when the whole batch is scored. Children whose
    /// evaluation fails twice are dropped with a diagnostic.
    fn evaluate_batch(
        &self,
        solutions: Vec<Solution>,
        generation: usize,
        diagnostics: &mut Vec<String>,
    ) -> Result<Vec<Solution>, SolverError> {
        Ok(self
            .evaluate_slots(solutions, generation, diagnostics)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Like `evaluate_batch` but preserves slot indices: a dropped child
    /// leaves a `None` hole instead of shifting its successors.
    fn evaluate_slots(
        &self,
        solutions: Vec<Solution>,
        generation: usize,
        diagnostics: &mut Vec<String>,
    ) -> Result<Vec<Option<Solution>>, SolverError> {
        let ctx = EvalContext {
            site: &self.spec.site,
            buildings: &self.spec.buildings,
            boundary_margin: self.spec.boundary_margin,
        };
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(solutions.len().max(1));

        let (tx, rx) = unbounded::<(usize, Result<Option<Solution>, SolverError>)>();
        std::thread::scope(|scope| {
            for worker in 0..workers {
                let tx = tx.clone();
                let ctx = ctx;
                let jobs: Vec<(usize, Solution)> = solutions
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i % workers == worker)
                    .map(|(i, s)| (i, s.clone()))
                    .collect();
                scope.spawn(move || {
                    let mut retry_rng = StdRng::seed_from_u64(
                        self.run_seed
                            .wrapping_add(0x5bd1)
                            .wrapping_add(generation as u64)
                            .wrapping_mul(31)
                            .wrapping_add(worker as u64),
                    );
                    for (index, solution) in jobs {
                        let outcome = self.evaluate_one(solution, &ctx, &mut retry_rng);
                        let _ = tx.send((index, outcome));
                    }
                });
            }
            drop(tx);
        });

        let mut slots: Vec<Option<Solution>> = vec![None; solutions.len()];
        for (index, outcome) in rx.iter() {
            match outcome? {
                Some(solution) => slots[index] = Some(solution),
                None => diagnostics.push(format!(
                    "generation {generation}: dropped a child after repeated evaluator failures"
                )),
            }
        }
        Ok(slots)
    }

    /// Retry-once policy mirroring the SA chains.
    fn evaluate_one(
        &self,
        solution: Solution,
        ctx: &EvalContext<'_>,
        retry_rng: &mut StdRng,
    ) -> Result<Option<Solution>, SolverError> {
        if solution.fitness.is_some() {
            return Ok(Some(solution));
        }
        let first = match self.evaluator.evaluate(&solution, ctx) {
            Ok(result) => {
                if !result.is_finite() || !solution.all_finite() {
                    return Err(SolverError::Numerical {
                        phase: Phase::Ga,
                        iteration: 0,
                        fingerprint: solution.fingerprint(),
                        detail: "non-finite fitness or position".into(),
                    });
                }
                return Ok(Some(
                    solution.with_fitness(result.fitness, result.objectives),
                ));
            }
            Err(e) => e,
        };
        // re-randomize one placement and try once more
        let retry = Perturbation::RandomReset.perturb(
            &solution,
            &self.spec.site.bounds,
            self.spec.boundary_margin,
            1.0,
            retry_rng,
        );
        match self.evaluator.evaluate(&retry, ctx) {
            Ok(result) => {
                if !result.is_finite() || !retry.all_finite() {
                    return Err(SolverError::Numerical {
                        phase: Phase::Ga,
                        iteration: 0,
                        fingerprint: retry.fingerprint(),
                        detail: "non-finite fitness or position".into(),
                    });
                }
                Ok(Some(retry.with_fitness(result.fitness, result.objectives)))
            }
            Err(_) => {
                debug!(
                    target: "solver.ga",
                    fingerprint = %solution.fingerprint(),
                    error = %first,
                    "child_dropped_after_retry"
                );
                Ok(None)
            }
        }
    }
}

fn best_of(population: &[Solution]) -> Option<&Solution> {
    population.iter().max_by(|a, b| {
        a.fitness
            .unwrap_or(f64::NEG_INFINITY)
            .partial_cmp(&b.fitness.unwrap_or(f64::NEG_INFINITY))
            .unwrap_or(std::cmp::Ordering::Equal)
    })
}

/// Mean distance between corresponding placements.
fn solution_distance(a: &Solution, b: &Solution) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for (id, pa) in &a.positions {
        if let Some(pb) = b.positions.get(id) {
            total += pa.distance(pb);
            count += 1;
        }
    }
    if count == 0 {
        f64::INFINITY
    } else {
        total / count as f64
    }
}

impl ScoredIndividual {
    fn fitness_key_max(&self, other: &ScoredIndividual) -> f64 {
        self.solution
            .fitness
            .unwrap_or(f64::NEG_INFINITY)
            .max(other.solution.fitness.unwrap_or(f64::NEG_INFINITY))
    }
}
