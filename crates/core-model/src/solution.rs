//! Candidate solutions: a position per building id plus evaluation
//! artifacts. Operators always produce new solutions by cloning; nothing
//! mutates a solution shared across generations.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Stable within-process identity of a solution's geometry, quantized to
/// 1 m so near-identical layouts share a memoization slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Solution {
    /// Building id -> placed position. `BTreeMap` keeps iteration and
    /// serialization order canonical.
    pub positions: BTreeMap<String, Point>,
    /// Aggregate scalar, higher is better. `None` until evaluated.
    #[serde(default)]
    pub fitness: Option<f64>,
    /// Named objective components from the last evaluation.
    #[serde(default)]
    pub objectives: BTreeMap<String, f64>,
    /// Opaque provenance (e.g. the operator that produced this solution).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Solution {
    pub fn new(positions: BTreeMap<String, Point>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Point)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(id, p)| (id.into(), p)).collect())
    }

    pub fn position(&self, id: &str) -> Option<&Point> {
        self.positions.get(id)
    }

    pub fn set_position(&mut self, id: impl Into<String>, p: Point) {
        self.positions.insert(id.into(), p);
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Record an evaluation result on this solution.
    pub fn with_fitness(mut self, fitness: f64, objectives: BTreeMap<String, f64>) -> Self {
        self.fitness = Some(fitness);
        self.objectives = objectives;
        self
    }

    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Objective values in ascending key order; the dominance frame used by
    /// the Pareto bookkeeping.
    pub fn objective_vector(&self) -> Vec<f64> {
        self.objectives.values().copied().collect()
    }

    /// Any position with a non-finite coordinate marks numerical failure.
    pub fn all_finite(&self) -> bool {
        self.positions.values().all(|p| p.is_finite())
    }

    /// Quantized geometry hash. Positions are rounded to whole metres, so
    /// sub-metre jitter maps to the same fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = DefaultHasher::new();
        for (id, p) in &self.positions {
            id.hash(&mut hasher);
            (p.x.round() as i64).hash(&mut hasher);
            (p.y.round() as i64).hash(&mut hasher);
        }
        Fingerprint(hasher.finish())
    }
}

/// Mean pairwise distance between corresponding placements, averaged over
/// all solution pairs: the population-diversity observable reported in
/// progress events and consumed by adaptive schedules.
pub fn population_diversity(population: &[Solution]) -> f64 {
    if population.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..population.len() {
        for j in (i + 1)..population.len() {
            let a = &population[i];
            let b = &population[j];
            let mut dist = 0.0;
            let mut count = 0usize;
            for (id, pa) in &a.positions {
                if let Some(pb) = b.positions.get(id) {
                    dist += pa.distance(pb);
                    count += 1;
                }
            }
            if count > 0 {
                total += dist / count as f64;
                pairs += 1;
            }
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sol(a: (f64, f64), b: (f64, f64)) -> Solution {
        Solution::from_pairs([("a", Point::new(a.0, a.1)), ("b", Point::new(b.0, b.1))])
    }

    #[test]
    fn fingerprint_quantizes_to_one_metre() {
        let s1 = sol((10.2, 20.4), (30.0, 40.0));
        let s2 = sol((10.4, 20.1), (30.3, 39.8));
        let s3 = sol((11.0, 20.4), (30.0, 40.0));
        assert_eq!(s1.fingerprint(), s2.fingerprint());
        assert_ne!(s1.fingerprint(), s3.fingerprint());
    }

    #[test]
    fn diversity_of_identical_population_is_zero() {
        let pop = vec![sol((1.0, 1.0), (2.0, 2.0)); 4];
        assert_eq!(population_diversity(&pop), 0.0);
    }

    #[test]
    fn diversity_grows_with_spread() {
        let tight = vec![sol((0.0, 0.0), (1.0, 0.0)), sol((0.5, 0.0), (1.5, 0.0))];
        let wide = vec![sol((0.0, 0.0), (1.0, 0.0)), sol((50.0, 0.0), (80.0, 0.0))];
        assert!(population_diversity(&wide) > population_diversity(&tight));
    }

    #[test]
    fn objective_vector_is_key_ordered() {
        let mut s = sol((0.0, 0.0), (1.0, 1.0));
        s.objectives.insert("spread".into(), 2.0);
        s.objectives.insert("access".into(), 1.0);
        assert_eq!(s.objective_vector(), vec![1.0, 2.0]);
    }

    #[test]
    fn non_finite_positions_are_detected() {
        let mut s = sol((0.0, 0.0), (1.0, 1.0));
        assert!(s.all_finite());
        s.set_position("c", Point::new(f64::NAN, 0.0));
        assert!(!s.all_finite());
    }
}
