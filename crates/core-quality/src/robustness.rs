//! Monte-Carlo robustness analysis: how much fitness degrades when the
//! layout is jittered, and how large a perturbation the solution survives.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_evaluate::{EvalContext, Evaluator, EvaluatorError};
use core_model::{Point, Solution};

/// Position noise per unit strength, metres.
const POSITION_NOISE_SCALE: f64 = 10.0;
/// Rotation noise per unit strength, radians.
const ROTATION_NOISE_SCALE: f64 = std::f64::consts::PI / 6.0;
/// Bisection steps for the stability radius.
const BISECTION_STEPS: usize = 10;
/// Samples per bisection probe.
const PROBE_SAMPLES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustnessConfig {
    pub samples: usize,
    /// Perturbation strength in [0, 1].
    pub strength: f64,
    /// Also apply a global rotation about the layout centroid.
    pub rotate: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            samples: 100,
            strength: 0.1,
            rotate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RobustnessGrade {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl RobustnessGrade {
    pub fn from_sensitivity(sensitivity: f64) -> Self {
        if sensitivity < 0.05 {
            RobustnessGrade::Excellent
        } else if sensitivity < 0.15 {
            RobustnessGrade::Good
        } else if sensitivity < 0.30 {
            RobustnessGrade::Fair
        } else {
            RobustnessGrade::Poor
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustnessReport {
    pub baseline_fitness: f64,
    /// Mean relative fitness loss under perturbation.
    pub sensitivity_score: f64,
    /// 2.5 / 97.5 percentiles of perturbed fitness.
    pub ci95: (f64, f64),
    pub worst_case_fitness: f64,
    pub coefficient_of_variation: f64,
    /// Largest strength in [0, 1] keeping fitness >= half the baseline.
    pub stability_radius: f64,
    pub grade: RobustnessGrade,
    pub samples: usize,
}

pub struct RobustnessAnalyzer<'a> {
    evaluator: &'a dyn Evaluator,
    config: RobustnessConfig,
}

impl<'a> RobustnessAnalyzer<'a> {
    pub fn new(evaluator: &'a dyn Evaluator, config: RobustnessConfig) -> Self {
        Self { evaluator, config }
    }

    pub fn analyze(
        &self,
        solution: &Solution,
        ctx: &EvalContext<'_>,
        rng: &mut StdRng,
    ) -> Result<RobustnessReport, EvaluatorError> {
        let baseline = self.evaluator.evaluate(solution, ctx)?.fitness;
        let samples = self.config.samples.max(1);
        let mut fitnesses = Vec::with_capacity(samples);
        for _ in 0..samples {
            let perturbed = perturb(solution, ctx, self.config.strength, self.config.rotate, rng);
            fitnesses.push(self.evaluator.evaluate(&perturbed, ctx)?.fitness);
        }

        let denom = baseline.abs().max(1e-12);
        let sensitivity = fitnesses
            .iter()
            .map(|f| (baseline - f) / denom)
            .sum::<f64>()
            / samples as f64;

        let mut sorted = fitnesses.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let ci95 = (percentile(&sorted, 0.025), percentile(&sorted, 0.975));
        let worst = sorted[0];
        let mean = fitnesses.iter().sum::<f64>() / samples as f64;
        let variance = fitnesses.iter().map(|f| (f - mean).powi(2)).sum::<f64>()
            / samples as f64;
        let cv = variance.sqrt() / mean.abs().max(1e-12);

        let stability_radius = self.stability_radius(solution, ctx, baseline, rng)?;
        let grade = RobustnessGrade::from_sensitivity(sensitivity);
        debug!(
            target: "quality.robustness",
            sensitivity,
            stability_radius,
            ?grade,
            "robustness_analyzed"
        );
        Ok(RobustnessReport {
            baseline_fitness: baseline,
            sensitivity_score: sensitivity,
            ci95,
            worst_case_fitness: worst,
            coefficient_of_variation: cv,
            stability_radius,
            grade,
            samples,
        })
    }

    /// Binary search over strength for the largest perturbation keeping
    /// mean fitness at or above half the baseline.
    fn stability_radius(
        &self,
        solution: &Solution,
        ctx: &EvalContext<'_>,
        baseline: f64,
        rng: &mut StdRng,
    ) -> Result<f64, EvaluatorError> {
        let threshold = 0.5 * baseline;
        let survives = |strength: f64, rng: &mut StdRng| -> Result<bool, EvaluatorError> {
            let mut total = 0.0;
            for _ in 0..PROBE_SAMPLES {
                let perturbed = perturb(solution, ctx, strength, self.config.rotate, rng);
                total += self.evaluator.evaluate(&perturbed, ctx)?.fitness;
            }
            Ok(total / PROBE_SAMPLES as f64 >= threshold)
        };
        if !survives(1.0, rng)? {
            let (mut lo, mut hi) = (0.0, 1.0);
            for _ in 0..BISECTION_STEPS {
                let mid = (lo + hi) / 2.0;
                if survives(mid, rng)? {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            Ok(lo)
        } else {
            Ok(1.0)
        }
    }
}

/// Gaussian position jitter (sigma = strength * 10 m), optionally with a
/// global rotation about the layout centroid, clamped back into bounds.
fn perturb(
    solution: &Solution,
    ctx: &EvalContext<'_>,
    strength: f64,
    rotate: bool,
    rng: &mut StdRng,
) -> Solution {
    let sigma = strength * POSITION_NOISE_SCALE;
    let mut perturbed = solution.clone();
    perturbed.fitness = None;

    let (rot_sin, rot_cos, centroid) = if rotate && !solution.positions.is_empty() {
        let theta: f64 =
            rng.sample::<f64, _>(StandardNormal) * strength * ROTATION_NOISE_SCALE;
        let n = solution.positions.len() as f64;
        let cx = solution.positions.values().map(|p| p.x).sum::<f64>() / n;
        let cy = solution.positions.values().map(|p| p.y).sum::<f64>() / n;
        (theta.sin(), theta.cos(), Point::new(cx, cy))
    } else {
        (0.0, 1.0, Point::new(0.0, 0.0))
    };

    let inner = ctx.site.bounds.inset(ctx.boundary_margin);
    for p in perturbed.positions.values_mut() {
        let (mut x, mut y) = (p.x, p.y);
        if rotate {
            let (dx, dy) = (x - centroid.x, y - centroid.y);
            x = centroid.x + dx * rot_cos - dy * rot_sin;
            y = centroid.y + dx * rot_sin + dy * rot_cos;
        }
        x += rng.sample::<f64, _>(StandardNormal) * sigma;
        y += rng.sample::<f64, _>(StandardNormal) * sigma;
        *p = inner.clamp(&Point::new(x, y));
    }
    perturbed
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
