//! Soft-constraint penalization. The optimizer never repairs solutions
//! mid-search; instead this wrapper folds compliance shortfalls into the
//! fitness so the search surface matches what the user is shown.

use core_evaluate::{EvalContext, EvalResult, Evaluator};
use core_model::{Severity, Solution};

use crate::compliance::ComplianceChecker;

/// Penalty weight per violation severity.
fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 1.0,
        Severity::High => 0.5,
        Severity::Medium => 0.2,
        Severity::Low => 0.05,
        Severity::Info => 0.0,
    }
}

pub struct CompliancePenaltyEvaluator<E> {
    inner: E,
    checker: ComplianceChecker,
    /// Scales the total penalty against the inner fitness.
    penalty_weight: f64,
}

impl<E: Evaluator> CompliancePenaltyEvaluator<E> {
    pub fn new(inner: E, checker: ComplianceChecker, penalty_weight: f64) -> Self {
        Self {
            inner,
            checker,
            penalty_weight,
        }
    }
}

impl<E: Evaluator> Evaluator for CompliancePenaltyEvaluator<E> {
    fn evaluate(&self, solution: &Solution, ctx: &EvalContext<'_>) -> EvalResult {
        let mut result = self.inner.evaluate(solution, ctx)?;
        let report = self.checker.check(solution, ctx.site, ctx.buildings);
        let penalty: f64 = report
            .violations
            .iter()
            .map(|v| {
                let shortfall =
                    (v.required - v.measured).abs() / v.required.abs().max(1e-9);
                severity_weight(v.severity) * shortfall.min(2.0)
            })
            .sum();
        result.fitness -= self.penalty_weight * penalty;
        result
            .objectives
            .insert("compliance".to_string(), -penalty);
        result.violations.extend(report.violations);
        Ok(result)
    }

    fn name(&self) -> &str {
        "compliance_penalty"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_config::ComplianceLimits;
    use core_evaluate::ConstantEvaluator;
    use core_model::{Bounds, Building, BuildingKind, Point, Site};

    #[test]
    fn violations_reduce_fitness() {
        let site = Site::new(Bounds::new(0.0, 0.0, 1000.0, 1000.0));
        let buildings = [
            Building::new("a", BuildingKind::Social, 400.0, 2),
            Building::new("b", BuildingKind::Social, 400.0, 2),
        ];
        let checker = ComplianceChecker::new(ComplianceLimits::default(), 5.0);
        let evaluator = CompliancePenaltyEvaluator::new(ConstantEvaluator(1.0), checker, 1.0);
        let ctx = EvalContext {
            site: &site,
            buildings: &buildings,
            boundary_margin: 5.0,
        };

        let clean = Solution::from_pairs([
            ("a", Point::new(300.0, 300.0)),
            ("b", Point::new(700.0, 700.0)),
        ]);
        let crowded = Solution::from_pairs([
            ("a", Point::new(300.0, 300.0)),
            ("b", Point::new(304.0, 300.0)),
        ]);
        let f_clean = evaluator.evaluate(&clean, &ctx).unwrap();
        let f_crowded = evaluator.evaluate(&crowded, &ctx).unwrap();
        assert_eq!(f_clean.fitness, 1.0);
        assert!(f_crowded.fitness < f_clean.fitness);
        assert!(!f_crowded.violations.is_empty());
        assert!(f_crowded.objectives["compliance"] < 0.0);
    }
}
