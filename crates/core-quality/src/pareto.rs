//! Pareto-front bookkeeping. The front is an antichain under dominance:
//! insertion discards dominated candidates and evicts members the new
//! solution dominates. All objectives are maximized (minimization
//! objectives are negated by the evaluator).

use core_model::Solution;

/// `a` dominates `b`: at least as good everywhere, strictly better
/// somewhere. Vectors of different lengths never dominate each other.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    if a.len() != b.len() || a.is_empty() {
        return false;
    }
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParetoFront {
    members: Vec<Solution>,
}

impl ParetoFront {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self) -> &[Solution] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Objective vector used for dominance: the named objectives in key
    /// order, falling back to the scalar fitness.
    fn vector(solution: &Solution) -> Vec<f64> {
        if solution.objectives.is_empty() {
            solution.fitness.map(|f| vec![f]).unwrap_or_default()
        } else {
            solution.objective_vector()
        }
    }

    /// Insert under domination filtering. Returns true when the candidate
    /// joined the front.
    pub fn try_insert(&mut self, candidate: Solution) -> bool {
        let cv = Self::vector(&candidate);
        if cv.is_empty() {
            return false;
        }
        for member in &self.members {
            let mv = Self::vector(member);
            if dominates(&mv, &cv) || mv == cv {
                return false;
            }
        }
        self.members
            .retain(|member| !dominates(&cv, &Self::vector(member)));
        self.members.push(candidate);
        true
    }

    /// Member with the best value of the named objective.
    pub fn extreme(&self, objective: &str) -> Option<&Solution> {
        self.members
            .iter()
            .filter(|s| s.objectives.contains_key(objective))
            .max_by(|a, b| {
                a.objectives[objective]
                    .partial_cmp(&b.objectives[objective])
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Best member by scalar fitness.
    pub fn best_by_fitness(&self) -> Option<&Solution> {
        self.members.iter().max_by(|a, b| {
            a.fitness
                .unwrap_or(f64::NEG_INFINITY)
                .partial_cmp(&b.fitness.unwrap_or(f64::NEG_INFINITY))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Hypervolume dominated by the front with respect to `reference`
    /// (which every member must dominate for a meaningful value). Exact
    /// sweep in 2-D; union-of-boxes inclusion-exclusion recursion in
    /// higher dimensions (fine for the <= 6 objectives this engine runs).
    pub fn hypervolume(&self, reference: &[f64]) -> f64 {
        let points: Vec<Vec<f64>> = self
            .members
            .iter()
            .map(|s| Self::vector(s))
            .filter(|v| v.len() == reference.len())
            .collect();
        if points.is_empty() {
            return 0.0;
        }
        match reference.len() {
            0 => 0.0,
            1 => points
                .iter()
                .map(|p| (p[0] - reference[0]).max(0.0))
                .fold(0.0, f64::max),
            2 => hypervolume_2d(&points, reference),
            _ => union_volume(&points, reference),
        }
    }

    /// Deb's spread indicator over consecutive gaps along the first
    /// objective. 0 is perfectly even; values grow with unevenness.
    pub fn spread(&self) -> f64 {
        let gaps = self.sorted_gaps();
        if gaps.len() < 2 {
            return 0.0;
        }
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
        if mean <= 0.0 {
            return 0.0;
        }
        let d_f = gaps[0];
        let d_l = gaps[gaps.len() - 1];
        let deviation: f64 = gaps.iter().map(|d| (d - mean).abs()).sum();
        (d_f + d_l + deviation) / (d_f + d_l + gaps.len() as f64 * mean)
    }

    /// Schott-style spacing over the same consecutive gaps.
    pub fn spacing(&self) -> f64 {
        let gaps = self.sorted_gaps();
        if gaps.is_empty() {
            return 0.0;
        }
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
        (gaps.iter().map(|d| (mean - d).powi(2)).sum::<f64>() / gaps.len() as f64).sqrt()
    }

    /// Aggregate front quality in [0, 1]:
    /// `0.5 * HV_norm + 0.25 * (1 - spread) + 0.25 * (1 - spacing_rel)`.
    pub fn aggregate_quality(&self, reference: &[f64]) -> f64 {
        if self.members.is_empty() {
            return 0.0;
        }
        let hv = self.hypervolume(reference);
        // normalize by the box spanned by the ideal point
        let mut ideal = vec![f64::NEG_INFINITY; reference.len()];
        for member in &self.members {
            for (k, v) in Self::vector(member).iter().enumerate() {
                if k < ideal.len() && *v > ideal[k] {
                    ideal[k] = *v;
                }
            }
        }
        let ideal_volume: f64 = ideal
            .iter()
            .zip(reference)
            .map(|(i, r)| (i - r).max(0.0))
            .product();
        let hv_norm = if ideal_volume > 0.0 {
            (hv / ideal_volume).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let gaps = self.sorted_gaps();
        let mean_gap = if gaps.is_empty() {
            0.0
        } else {
            gaps.iter().sum::<f64>() / gaps.len() as f64
        };
        let spacing_rel = if mean_gap > 0.0 {
            (self.spacing() / mean_gap).clamp(0.0, 1.0)
        } else {
            0.0
        };
        0.5 * hv_norm
            + 0.25 * (1.0 - self.spread().clamp(0.0, 1.0))
            + 0.25 * (1.0 - spacing_rel)
    }

    /// Euclidean distances between neighbors after sorting by the first
    /// objective.
    fn sorted_gaps(&self) -> Vec<f64> {
        let mut points: Vec<Vec<f64>> = self.members.iter().map(|s| Self::vector(s)).collect();
        if points.len() < 2 {
            return Vec::new();
        }
        points.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(std::cmp::Ordering::Equal));
        points
            .windows(2)
            .map(|w| {
                w[0].iter()
                    .zip(&w[1])
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect()
    }
}

fn hypervolume_2d(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let mut pts: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p[0], p[1]))
        .filter(|(x, y)| *x > reference[0] && *y > reference[1])
        .collect();
    // sweep from the best x down; y rises monotonically along the front
    pts.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    let mut hv = 0.0;
    let mut y_covered = reference[1];
    for (x, y) in pts {
        if y > y_covered {
            hv += (x - reference[0]) * (y - y_covered);
            y_covered = y;
        }
    }
    hv
}

/// Volume of the union of boxes `[reference, p]` via the recursion
/// `|A u R| = |A| + |R| - |R n A|`.
fn union_volume(points: &[Vec<f64>], reference: &[f64]) -> f64 {
    let Some((first, rest)) = points.split_first() else {
        return 0.0;
    };
    let own: f64 = first
        .iter()
        .zip(reference)
        .map(|(v, r)| (v - r).max(0.0))
        .product();
    if rest.is_empty() {
        return own;
    }
    let clipped: Vec<Vec<f64>> = rest
        .iter()
        .map(|p| {
            p.iter()
                .zip(first)
                .map(|(v, cap)| v.min(*cap))
                .collect()
        })
        .collect();
    own + union_volume(rest, reference) - union_volume(&clipped, reference)
}
