//! NSGA-II machinery: fast non-dominated sorting and crowding distance,
//! shared by the GA's replacement step and by tournament tie-breaking.

use core_model::Solution;
use core_operators::Ranked;
use core_quality::dominates;

/// A solution annotated with its dominance rank (0 = best front) and
/// crowding distance within that front.
#[derive(Debug, Clone)]
pub(crate) struct ScoredIndividual {
    pub solution: Solution,
    pub rank: usize,
    pub crowding: f64,
}

impl Ranked for ScoredIndividual {
    fn fitness_key(&self) -> f64 {
        self.solution.fitness.unwrap_or(f64::NEG_INFINITY)
    }

    fn dominance_rank(&self) -> usize {
        self.rank
    }

    fn crowding(&self) -> f64 {
        self.crowding
    }
}

/// Objective vector used for dominance; falls back to scalar fitness for
/// single-objective evaluators.
pub(crate) fn objective_vector(solution: &Solution) -> Vec<f64> {
    if solution.objectives.is_empty() {
        solution.fitness.map(|f| vec![f]).unwrap_or_default()
    } else {
        solution.objective_vector()
    }
}

/// Fronts of indices, best first.
pub(crate) fn fast_nondominated_sort(objectives: &[Vec<f64>]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for i in 0..n {
        for j in (i + 1)..n {
            if dominates(&objectives[i], &objectives[j]) {
                dominated_by[i].push(j);
                domination_count[j] += 1;
            } else if dominates(&objectives[j], &objectives[i]) {
                dominated_by[j].push(i);
                domination_count[i] += 1;
            }
        }
    }
    for i in 0..n {
        if domination_count[i] == 0 {
            fronts[0].push(i);
        }
    }
    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next = Vec::new();
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        fronts.push(next);
        current += 1;
    }
    fronts.pop(); // the trailing empty front
    fronts
}

/// Crowding distance per member of one front. Boundary members get
/// infinity so they always survive.
pub(crate) fn crowding_distances(front: &[Vec<f64>]) -> Vec<f64> {
    let n = front.len();
    if n == 0 {
        return Vec::new();
    }
    if n <= 2 {
        return vec![f64::INFINITY; n];
    }
    let dims = front[0].len();
    let mut distance = vec![0.0f64; n];
    for d in 0..dims {
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            front[a][d]
                .partial_cmp(&front[b][d])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let span = front[order[n - 1]][d] - front[order[0]][d];
        distance[order[0]] = f64::INFINITY;
        distance[order[n - 1]] = f64::INFINITY;
        if span <= 0.0 {
            continue;
        }
        for w in 1..(n - 1) {
            let lo = front[order[w - 1]][d];
            let hi = front[order[w + 1]][d];
            distance[order[w]] += (hi - lo) / span;
        }
    }
    distance
}

/// Annotate a population with ranks and crowding.
pub(crate) fn score_population(population: Vec<Solution>) -> Vec<ScoredIndividual> {
    let objectives: Vec<Vec<f64>> = population.iter().map(objective_vector).collect();
    let fronts = fast_nondominated_sort(&objectives);
    let mut scored: Vec<ScoredIndividual> = population
        .into_iter()
        .map(|solution| ScoredIndividual {
            solution,
            rank: usize::MAX,
            crowding: 0.0,
        })
        .collect();
    for (rank, front) in fronts.iter().enumerate() {
        let front_objs: Vec<Vec<f64>> = front.iter().map(|&i| objectives[i].clone()).collect();
        let crowding = crowding_distances(&front_objs);
        for (slot, &i) in front.iter().enumerate() {
            scored[i].rank = rank;
            scored[i].crowding = crowding[slot];
        }
    }
    // solutions with empty objective vectors never entered a front
    for s in &mut scored {
        if s.rank == usize::MAX {
            s.rank = fronts.len();
        }
    }
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_separates_fronts() {
        let objectives = vec![
            vec![1.0, 1.0], // dominated by all others
            vec![3.0, 2.0],
            vec![2.0, 3.0],
            vec![4.0, 4.0], // dominates everything
        ];
        let fronts = fast_nondominated_sort(&objectives);
        assert_eq!(fronts[0], vec![3]);
        assert_eq!(fronts[1], vec![1, 2]);
        assert_eq!(fronts[2], vec![0]);
    }

    #[test]
    fn crowding_rewards_isolation() {
        let front = vec![
            vec![0.0, 4.0],
            vec![1.0, 3.0],
            vec![3.5, 0.5], // isolated interior point
            vec![4.0, 0.0],
            vec![0.5, 3.5],
        ];
        let d = crowding_distances(&front);
        // boundary points are infinite
        assert_eq!(d[0], f64::INFINITY);
        assert_eq!(d[3], f64::INFINITY);
        // the isolated point beats the crowded one
        assert!(d[2] > d[4]);
    }

    #[test]
    fn tiny_fronts_are_all_infinite() {
        assert_eq!(crowding_distances(&[vec![1.0, 2.0]]), vec![f64::INFINITY]);
        assert_eq!(
            crowding_distances(&[vec![1.0, 2.0], vec![2.0, 1.0]]),
            vec![f64::INFINITY, f64::INFINITY]
        );
    }
}
