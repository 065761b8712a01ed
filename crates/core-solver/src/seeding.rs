//! Initial-solution construction. Seeding is the one place the solver
//! repairs: uniform draws are retried until the boundary and minimum
//! distance constraints hold, and after the retry budget the least
//! violating draw is kept (the compliance report will show the user what
//! the solver saw).

use rand::rngs::StdRng;

use core_model::{ProblemSpec, Solution};
use core_operators::uniform_point;

/// Repair retry budget per seed.
const SEED_RETRIES: usize = 100;

pub(crate) struct SeedOutcome {
    pub solution: Solution,
    pub feasible: bool,
}

/// Count constraint defects of a candidate seed: pairwise min-distance
/// shortfalls plus gateway-clearance hits.
fn defects(spec: &ProblemSpec, solution: &Solution) -> usize {
    let min_distance = spec.quality.compliance.min_distance;
    let points: Vec<_> = solution.positions.values().collect();
    let mut count = 0;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if points[i].distance(points[j]) < min_distance {
                count += 1;
            }
        }
    }
    for gateway in &spec.site.gateways {
        for p in &points {
            if gateway.position.distance(p) < gateway.clearance {
                count += 1;
            }
        }
    }
    for p in &points {
        if !spec.site.contains(p, spec.boundary_margin) {
            count += 1;
        }
    }
    count
}

/// Draw one seed, repairing up to the retry budget.
pub(crate) fn seed_solution(spec: &ProblemSpec, rng: &mut StdRng) -> SeedOutcome {
    let mut best: Option<(usize, Solution)> = None;
    for _ in 0..SEED_RETRIES {
        let candidate = Solution::from_pairs(spec.buildings.iter().map(|b| {
            let p = b
                .position
                .unwrap_or_else(|| uniform_point(&spec.site.bounds, spec.boundary_margin, rng));
            (b.id.clone(), p)
        }));
        let d = defects(spec, &candidate);
        if d == 0 {
            return SeedOutcome {
                solution: candidate,
                feasible: true,
            };
        }
        if best.as_ref().map(|(bd, _)| d < *bd).unwrap_or(true) {
            best = Some((d, candidate));
        }
    }
    let (_, solution) = best.expect("retry loop always yields a candidate");
    SeedOutcome {
        solution,
        feasible: false,
    }
}
