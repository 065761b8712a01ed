//! Single-source contributions to the composite field. Every basis decays
//! radially with a Gaussian envelope `w(d) = exp(-(d/r)^2)` where `r` is
//! its influence radius.

use core_model::{Point, Vec2};

use crate::tensor::Tensor2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BasisKind {
    /// Anisotropic grid aligned with `angle`.
    Grid {
        angle: f64,
        lambda_major: f64,
        lambda_minor: f64,
    },
    /// Major eigenvector points away from the center. Singular exactly at
    /// the center, where the contribution is zero.
    Radial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Basis {
    pub kind: BasisKind,
    pub center: Point,
    /// Influence radius, m. Must be positive.
    pub radius: f64,
    pub weight: f64,
}

impl Basis {
    pub fn grid(center: Point, angle: f64, radius: f64, weight: f64) -> Self {
        Self {
            kind: BasisKind::Grid {
                angle,
                lambda_major: 1.0,
                lambda_minor: 0.3,
            },
            center,
            radius,
            weight,
        }
    }

    pub fn radial(center: Point, radius: f64, weight: f64) -> Self {
        Self {
            kind: BasisKind::Radial,
            center,
            radius,
            weight,
        }
    }

    pub fn tensor_at(&self, p: &Point) -> Tensor2 {
        let d = self.center.distance(p);
        let falloff = (-(d / self.radius).powi(2)).exp();
        let w = self.weight * falloff;
        match self.kind {
            BasisKind::Grid {
                angle,
                lambda_major,
                lambda_minor,
            } => Tensor2::from_orientation(angle, lambda_major, lambda_minor).scale(w),
            BasisKind::Radial => match Vec2::between(&self.center, p).normalized() {
                Some(u) => Tensor2::from_direction(u).scale(w),
                None => Tensor2::ZERO,
            },
        }
    }
}
