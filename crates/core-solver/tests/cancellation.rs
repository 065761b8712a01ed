//! Cancellation semantics: a run with an absurd generation budget must
//! return promptly once cancelled, carrying the best observed so far.

use std::sync::Arc;
use std::time::{Duration, Instant};

use core_evaluate::DispersionEvaluator;
use core_model::{Bounds, Building, BuildingKind, ProblemSpec, Site};
use core_solver::Orchestrator;

fn endless_spec() -> ProblemSpec {
    let mut spec = ProblemSpec::new(
        "endless",
        vec![
            Building::new("a", BuildingKind::Residential, 1000.0, 2),
            Building::new("b", BuildingKind::Educational, 1500.0, 3),
            Building::new("c", BuildingKind::Library, 800.0, 2),
        ],
        Site::new(Bounds::new(0.0, 0.0, 300.0, 300.0)),
    );
    spec.sa.num_chains = 2;
    spec.sa.chain_iterations = 200;
    spec.ga.population_size = 20;
    spec.ga.generations = 10_000;
    spec.ga.stall_patience = Some(10_000); // never stall-stop
    spec.rng_seed = Some(7);
    spec
}

#[test]
fn wall_clock_budget_cancels_the_run() {
    let mut spec = endless_spec();
    spec.wall_clock_budget_ms = Some(500);
    let started = Instant::now();
    let bundle = Orchestrator::new(spec, Arc::new(DispersionEvaluator))
        .run()
        .expect("cancelled runs still return a bundle");
    let elapsed = started.elapsed();

    assert!(bundle.cancelled);
    assert!(bundle.best_solution.fitness.is_some());
    assert_eq!(bundle.best_solution.len(), 3);
    // generous ceiling: the run must wind down generations promptly
    assert!(elapsed < Duration::from_secs(10), "took {elapsed:?}");
    assert!(bundle
        .diagnostics
        .iter()
        .any(|d| d.contains("cancelled")));
}

#[test]
fn external_cancellation_returns_partial_results() {
    let orchestrator = Orchestrator::new(endless_spec(), Arc::new(DispersionEvaluator));
    let token = orchestrator.cancel_token();
    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        token.cancel();
    });
    let bundle = orchestrator.run().expect("cancelled runs still return");
    canceller.join().unwrap();

    assert!(bundle.cancelled);
    assert!(bundle.best_solution.fitness.is_some());
    // the convergence traces hold whatever completed before the cut
    assert!(!bundle.convergence.sa.best.is_empty());
}

#[test]
fn progress_events_stay_monotonic_per_phase() {
    let mut spec = endless_spec();
    spec.ga.generations = 30;
    let orchestrator = Orchestrator::new(spec, Arc::new(DispersionEvaluator));
    let rx = orchestrator.subscribe();
    let bundle = orchestrator.run().unwrap();
    assert!(!bundle.cancelled);

    let mut last_per_phase: std::collections::BTreeMap<String, usize> = Default::default();
    while let Ok(event) = rx.try_recv() {
        let key = event.phase.to_string();
        if let Some(last) = last_per_phase.get(&key) {
            assert!(
                event.iteration >= *last,
                "{key} iteration went backwards: {} -> {}",
                last,
                event.iteration
            );
        }
        last_per_phase.insert(key, event.iteration);
    }
    assert!(last_per_phase.contains_key("SA"));
    assert!(last_per_phase.contains_key("GA"));
}
