//! Built-in evaluators: a dispersion objective usable as a sane default
//! and a constant evaluator for tests and trivial-fitness scenarios.

use std::collections::BTreeMap;

use core_model::Solution;

use crate::{EvalContext, EvalResult, Evaluator, FitnessResult};

/// Sum of squared pairwise distances, normalized by the squared site
/// diagonal so the value is scale-free. Rewards spreading buildings apart.
#[derive(Debug, Clone, Default)]
pub struct DispersionEvaluator;

impl Evaluator for DispersionEvaluator {
    fn evaluate(&self, solution: &Solution, ctx: &EvalContext<'_>) -> EvalResult {
        let points: Vec<_> = solution.positions.values().collect();
        let mut total = 0.0;
        for i in 0..points.len() {
            for j in (i + 1)..points.len() {
                total += points[i].distance_squared(points[j]);
            }
        }
        let diag_sq =
            ctx.site.bounds.width().powi(2) + ctx.site.bounds.height().powi(2);
        let fitness = if diag_sq > 0.0 { total / diag_sq } else { 0.0 };
        let mut objectives = BTreeMap::new();
        objectives.insert("dispersion".to_string(), fitness);
        Ok(FitnessResult {
            fitness,
            objectives,
            violations: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "dispersion"
    }
}

/// Always returns the same fitness. Useful when only constraint reporting
/// matters.
#[derive(Debug, Clone)]
pub struct ConstantEvaluator(pub f64);

impl Evaluator for ConstantEvaluator {
    fn evaluate(&self, _solution: &Solution, _ctx: &EvalContext<'_>) -> EvalResult {
        let mut objectives = BTreeMap::new();
        objectives.insert("constant".to_string(), self.0);
        Ok(FitnessResult {
            fitness: self.0,
            objectives,
            violations: Vec::new(),
        })
    }

    fn name(&self) -> &str {
        "constant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{Bounds, Point, Site};

    fn ctx(site: &Site) -> EvalContext<'_> {
        EvalContext {
            site,
            buildings: &[],
            boundary_margin: 0.0,
        }
    }

    #[test]
    fn dispersion_rewards_spread() {
        let site = Site::new(Bounds::new(0.0, 0.0, 200.0, 200.0));
        let tight = Solution::from_pairs([
            ("a", Point::new(100.0, 100.0)),
            ("b", Point::new(101.0, 100.0)),
        ]);
        let wide = Solution::from_pairs([
            ("a", Point::new(5.0, 5.0)),
            ("b", Point::new(195.0, 195.0)),
        ]);
        let e = DispersionEvaluator;
        let f_tight = e.evaluate(&tight, &ctx(&site)).unwrap().fitness;
        let f_wide = e.evaluate(&wide, &ctx(&site)).unwrap().fitness;
        assert!(f_wide > f_tight);
    }

    #[test]
    fn dispersion_is_deterministic() {
        let site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let sol = Solution::from_pairs([
            ("a", Point::new(10.0, 20.0)),
            ("b", Point::new(80.0, 90.0)),
            ("c", Point::new(40.0, 60.0)),
        ]);
        let e = DispersionEvaluator;
        let f1 = e.evaluate(&sol, &ctx(&site)).unwrap();
        let f2 = e.evaluate(&sol, &ctx(&site)).unwrap();
        assert_eq!(f1, f2);
    }

    #[test]
    fn constant_reports_its_value() {
        let site = Site::new(Bounds::new(0.0, 0.0, 10.0, 10.0));
        let sol = Solution::from_pairs([("a", Point::new(1.0, 1.0))]);
        let r = ConstantEvaluator(7.5).evaluate(&sol, &ctx(&site)).unwrap();
        assert_eq!(r.fitness, 7.5);
        assert!(r.is_finite());
    }
}
