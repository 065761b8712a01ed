//! Adaptive streamline integration along the principal eigenvector.
//!
//! The ODE `dp/ds = v(p)` is integrated with a Dormand-Prince 4(5) pair:
//! the embedded fourth-order solution provides a local error estimate, the
//! step is accepted when the estimate is under `tol` and resized by
//! `clip((tol/err)^(1/5), 0.2, 5.0)` either way, clamped to
//! `[min_step, max_step]`.
//!
//! Eigenvector sign is aligned against the incoming direction at every
//! stage evaluation; without that, the +-v ambiguity of eigenvectors makes
//! the integrator oscillate in place.

use core_model::{Point, Polyline, Vec2};
use tracing::trace;

use core_config::RoadConfig;

use crate::field::TensorField;
use crate::index::SegmentIndex;
use crate::FieldError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TracerConfig {
    pub tol: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub max_length: f64,
    pub max_curvature: f64,
    pub proximity_radius: f64,
}

impl From<&RoadConfig> for TracerConfig {
    fn from(road: &RoadConfig) -> Self {
        Self {
            tol: road.tol,
            min_step: road.min_step,
            max_step: road.max_step,
            max_length: road.max_length,
            max_curvature: road.max_curvature,
            proximity_radius: road.proximity_radius,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    OutOfBounds,
    Singularity,
    Curvature,
    MaxLength,
    Proximity,
    /// Step budget exhausted without hitting another condition.
    Stalled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Traced {
    pub polyline: Polyline,
    pub reason: StopReason,
}

pub struct StreamlineTracer<'a> {
    field: &'a TensorField,
    config: TracerConfig,
}

// Dormand-Prince coefficients.
const A2: [f64; 1] = [1.0 / 5.0];
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const A5: [f64; 4] = [
    19372.0 / 6561.0,
    -25360.0 / 2187.0,
    64448.0 / 6561.0,
    -212.0 / 729.0,
];
const A6: [f64; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];
const B5: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];
const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

impl<'a> StreamlineTracer<'a> {
    pub fn new(field: &'a TensorField, config: TracerConfig) -> Self {
        Self { field, config }
    }

    /// Trace a single direction from `seed`. `initial_dir` anchors the
    /// eigenvector sign (gateway seeds force their bearing); when absent
    /// the field's own direction at the seed is used.
    pub fn trace(
        &self,
        seed: Point,
        initial_dir: Option<Vec2>,
        index: &SegmentIndex,
    ) -> Traced {
        let cfg = &self.config;
        let mut points = vec![seed];
        let mut dir = match self.field.principal_direction(&seed, initial_dir) {
            Ok(d) => d,
            Err(e) => {
                return Traced {
                    polyline: Polyline::new(points),
                    reason: stop_reason(e),
                }
            }
        };
        let mut h = cfg.min_step.max(cfg.max_step / 4.0).min(cfg.max_step);
        let mut length = 0.0;
        // generous budget; every useful trace finishes far earlier
        let max_steps = ((cfg.max_length / cfg.min_step) * 4.0) as usize + 16;

        for _ in 0..max_steps {
            if length >= cfg.max_length {
                return self.finish(points, StopReason::MaxLength);
            }
            let current = *points.last().expect("trace always holds the seed");
            let (next, reason) = match self.step(current, dir, &mut h) {
                Ok(next) => (next, None),
                Err(e) => (current, Some(stop_reason(e))),
            };
            if let Some(reason) = reason {
                return self.finish(points, reason);
            }

            let step_vec = Vec2::between(&current, &next);
            let step_len = step_vec.norm();
            if step_len < 1e-9 {
                return self.finish(points, StopReason::Stalled);
            }
            // curvature = turn angle per metre over the last segment
            if points.len() >= 2 {
                let prev = points[points.len() - 2];
                let prev_vec = Vec2::between(&prev, &current);
                let curvature = prev_vec.angle_between(&step_vec) / step_len;
                if curvature > cfg.max_curvature {
                    return self.finish(points, StopReason::Curvature);
                }
            }

            let out_of_bounds = !self.field.bounds().contains(&next);
            points.push(next);
            length += step_len;
            if out_of_bounds {
                // overshoot is at most one step
                return self.finish(points, StopReason::OutOfBounds);
            }
            if index.nearest_within(&next, cfg.proximity_radius).is_some() {
                return self.finish(points, StopReason::Proximity);
            }
            dir = match step_vec.normalized() {
                Some(d) => d,
                None => return self.finish(points, StopReason::Stalled),
            };
        }
        self.finish(points, StopReason::Stalled)
    }

    /// Trace both directions from `seed` and splice. `initial_dir` forces
    /// the forward leg's direction (gateway seeds pass their bearing); the
    /// backward leg always runs opposite to it.
    pub fn trace_bidirectional(
        &self,
        seed: Point,
        initial_dir: Option<Vec2>,
        index: &SegmentIndex,
    ) -> Traced {
        let forward_dir = match initial_dir {
            Some(dir) => dir,
            None => match self.field.principal_direction(&seed, None) {
                Ok(d) => d,
                Err(e) => {
                    return Traced {
                        polyline: Polyline::new(vec![seed]),
                        reason: stop_reason(e),
                    }
                }
            },
        };
        let forward = self.trace(seed, Some(forward_dir), index);
        let backward = self.trace(seed, Some(forward_dir.neg()), index);
        let mut vertices: Vec<Point> = backward.polyline.vertices;
        vertices.reverse();
        vertices.pop(); // the shared seed
        vertices.extend(forward.polyline.vertices);
        Traced {
            polyline: Polyline::new(vertices),
            reason: forward.reason,
        }
    }

    fn finish(&self, points: Vec<Point>, reason: StopReason) -> Traced {
        trace!(
            target: "field.trace",
            vertices = points.len(),
            ?reason,
            "streamline_done"
        );
        Traced {
            polyline: Polyline::new(points),
            reason,
        }
    }

    /// One accepted RK4(5) step. `h` carries the adapted size across
    /// calls. Stage-evaluation failures shrink the step toward `min_step`
    /// before giving up, so a trace does not die on an intermediate point
    /// that pokes past the boundary.
    fn step(&self, p: Point, dir: Vec2, h: &mut f64) -> Result<Point, FieldError> {
        let cfg = &self.config;
        loop {
            match self.attempt(p, dir, *h) {
                Ok((next, err)) => {
                    let err = err.max(1e-12);
                    let factor = ((cfg.tol / err).powf(0.2)).clamp(0.2, 5.0);
                    if err <= cfg.tol || *h <= cfg.min_step {
                        *h = (*h * factor).clamp(cfg.min_step, cfg.max_step);
                        return Ok(next);
                    }
                    *h = (*h * factor).clamp(cfg.min_step, cfg.max_step);
                }
                Err(e) => {
                    if *h > cfg.min_step {
                        *h = (*h / 2.0).max(cfg.min_step);
                    } else {
                        return Err(e);
                    }
                }
            }
        }
    }

    /// Evaluate the Dormand-Prince stages once at step size `h`.
    fn attempt(&self, p: Point, dir: Vec2, h: f64) -> Result<(Point, f64), FieldError> {
        let f = |q: &Point| self.field.principal_direction(q, Some(dir));
        let k1 = f(&p)?;
        let k2 = f(&p.translate(k1.scale(h * A2[0])))?;
        let k3 = f(&p.translate(k1.scale(h * A3[0]).add_v(k2.scale(h * A3[1]))))?;
        let k4 = f(&p.translate(
            k1.scale(h * A4[0])
                .add_v(k2.scale(h * A4[1]))
                .add_v(k3.scale(h * A4[2])),
        ))?;
        let k5 = f(&p.translate(
            k1.scale(h * A5[0])
                .add_v(k2.scale(h * A5[1]))
                .add_v(k3.scale(h * A5[2]))
                .add_v(k4.scale(h * A5[3])),
        ))?;
        let k6 = f(&p.translate(
            k1.scale(h * A6[0])
                .add_v(k2.scale(h * A6[1]))
                .add_v(k3.scale(h * A6[2]))
                .add_v(k4.scale(h * A6[3]))
                .add_v(k5.scale(h * A6[4])),
        ))?;
        let fifth = k1
            .scale(B5[0])
            .add_v(k3.scale(B5[2]))
            .add_v(k4.scale(B5[3]))
            .add_v(k5.scale(B5[4]))
            .add_v(k6.scale(B5[5]));
        let next = p.translate(fifth.scale(h));
        let k7 = f(&next).unwrap_or(fifth);
        let fourth = k1
            .scale(B4[0])
            .add_v(k3.scale(B4[2]))
            .add_v(k4.scale(B4[3]))
            .add_v(k5.scale(B4[4]))
            .add_v(k6.scale(B4[5]))
            .add_v(k7.scale(B4[6]));
        let err = Vec2::new(
            (fifth.x - fourth.x) * h,
            (fifth.y - fourth.y) * h,
        )
        .norm();
        Ok((next, err))
    }
}

fn stop_reason(e: FieldError) -> StopReason {
    match e {
        FieldError::OutOfBounds { .. } => StopReason::OutOfBounds,
        FieldError::Singularity { .. } => StopReason::Singularity,
    }
}

/// Small vector helper local to the tracer stages.
trait AddV {
    fn add_v(self, other: Vec2) -> Vec2;
}

impl AddV for Vec2 {
    fn add_v(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }
}
