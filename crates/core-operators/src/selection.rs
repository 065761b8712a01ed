//! Parent selection. Selection is generic over anything exposing a fitness
//! plus optional dominance information, so the same operators serve plain
//! fitness-sorted pools and NSGA-ranked populations.

use rand::rngs::StdRng;
use rand::Rng;

use core_model::Solution;

/// Selection view of an individual. Rank 0 is the best non-dominated
/// front; larger crowding distance is better.
pub trait Ranked {
    fn fitness_key(&self) -> f64;
    fn dominance_rank(&self) -> usize {
        0
    }
    fn crowding(&self) -> f64 {
        f64::INFINITY
    }
}

impl Ranked for Solution {
    fn fitness_key(&self) -> f64 {
        self.fitness.unwrap_or(f64::NEG_INFINITY)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Sample `size` individuals with replacement, keep the best; ties
    /// break by dominance rank, then crowding distance, then coin flip.
    Tournament { size: usize },
    /// Probability proportional to `(f - f_min) * scale + epsilon`.
    RouletteWheel { scale: f64 },
}

impl Selection {
    pub fn name(&self) -> &'static str {
        match self {
            Selection::Tournament { .. } => "tournament",
            Selection::RouletteWheel { .. } => "roulette",
        }
    }

    pub fn select<'a, T: Ranked>(
        &self,
        population: &'a [T],
        n: usize,
        rng: &mut StdRng,
    ) -> Vec<&'a T> {
        if population.is_empty() {
            return Vec::new();
        }
        match self {
            Selection::Tournament { size } => (0..n)
                .map(|_| {
                    let mut best = &population[rng.gen_range(0..population.len())];
                    for _ in 1..(*size).max(1) {
                        let challenger = &population[rng.gen_range(0..population.len())];
                        if beats(challenger, best, rng) {
                            best = challenger;
                        }
                    }
                    best
                })
                .collect(),
            Selection::RouletteWheel { scale } => {
                let f_min = population
                    .iter()
                    .map(Ranked::fitness_key)
                    .fold(f64::INFINITY, f64::min);
                let weights: Vec<f64> = population
                    .iter()
                    .map(|ind| (ind.fitness_key() - f_min) * scale + 1e-9)
                    .collect();
                let total: f64 = weights.iter().sum();
                (0..n)
                    .map(|_| {
                        let mut ticket = rng.gen::<f64>() * total;
                        for (ind, w) in population.iter().zip(&weights) {
                            ticket -= w;
                            if ticket <= 0.0 {
                                return ind;
                            }
                        }
                        // floating-point remainder lands on the last slot
                        population.last().expect("non-empty population")
                    })
                    .collect()
            }
        }
    }
}

fn beats<T: Ranked>(challenger: &T, incumbent: &T, rng: &mut StdRng) -> bool {
    match challenger
        .fitness_key()
        .partial_cmp(&incumbent.fitness_key())
    {
        Some(std::cmp::Ordering::Greater) => true,
        Some(std::cmp::Ordering::Less) => false,
        _ => {
            if challenger.dominance_rank() != incumbent.dominance_rank() {
                challenger.dominance_rank() < incumbent.dominance_rank()
            } else if challenger.crowding() != incumbent.crowding() {
                challenger.crowding() > incumbent.crowding()
            } else {
                rng.gen::<bool>()
            }
        }
    }
}
