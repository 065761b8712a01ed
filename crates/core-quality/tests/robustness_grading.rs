//! A nearly-flat fitness surface must grade EXCELLENT with a tight
//! confidence interval.

use core_evaluate::{EvalContext, EvalResult, Evaluator, FitnessResult};
use core_model::{Bounds, Point, Site, Solution};
use core_quality::{RobustnessAnalyzer, RobustnessConfig, RobustnessGrade};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// `f = 1 / (1 + eps * ||S - S0||^2)` against a fixed anchor layout.
struct QuadraticBowl {
    anchor: Solution,
    eps: f64,
}

impl Evaluator for QuadraticBowl {
    fn evaluate(&self, solution: &Solution, _ctx: &EvalContext<'_>) -> EvalResult {
        let displacement: f64 = solution
            .positions
            .iter()
            .filter_map(|(id, p)| {
                self.anchor
                    .positions
                    .get(id)
                    .map(|a| p.distance_squared(a))
            })
            .sum();
        Ok(FitnessResult::scalar(1.0 / (1.0 + self.eps * displacement)))
    }
}

#[test]
fn shallow_bowl_grades_excellent() {
    let site = Site::new(Bounds::new(0.0, 0.0, 500.0, 500.0));
    let anchor = Solution::from_pairs([
        ("a", Point::new(150.0, 150.0)),
        ("b", Point::new(350.0, 350.0)),
    ]);
    let evaluator = QuadraticBowl {
        anchor: anchor.clone(),
        eps: 0.001,
    };
    let analyzer = RobustnessAnalyzer::new(
        &evaluator,
        RobustnessConfig {
            samples: 200,
            strength: 0.05,
            rotate: false,
        },
    );
    let ctx = EvalContext {
        site: &site,
        buildings: &[],
        boundary_margin: 0.0,
    };
    let mut rng = StdRng::seed_from_u64(1);
    let report = analyzer.analyze(&anchor, &ctx, &mut rng).unwrap();

    assert!(
        report.sensitivity_score < 0.05,
        "sensitivity {}",
        report.sensitivity_score
    );
    assert_eq!(report.grade, RobustnessGrade::Excellent);
    let ci_width = report.ci95.1 - report.ci95.0;
    assert!(ci_width < 0.1, "ci width {ci_width}");
    assert_eq!(report.samples, 200);
    assert!(report.worst_case_fitness <= report.baseline_fitness);
    assert!(report.stability_radius > 0.0);
}

#[test]
fn analysis_is_deterministic_given_a_seed() {
    let site = Site::new(Bounds::new(0.0, 0.0, 500.0, 500.0));
    let anchor = Solution::from_pairs([("a", Point::new(250.0, 250.0))]);
    let evaluator = QuadraticBowl {
        anchor: anchor.clone(),
        eps: 0.01,
    };
    let analyzer = RobustnessAnalyzer::new(&evaluator, RobustnessConfig::default());
    let ctx = EvalContext {
        site: &site,
        buildings: &[],
        boundary_margin: 0.0,
    };
    let a = analyzer
        .analyze(&anchor, &ctx, &mut StdRng::seed_from_u64(9))
        .unwrap();
    let b = analyzer
        .analyze(&anchor, &ctx, &mut StdRng::seed_from_u64(9))
        .unwrap();
    assert_eq!(a, b);
}
