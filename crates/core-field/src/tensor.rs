//! Symmetric 2x2 tensors and their closed-form eigen decomposition.

use core_model::Vec2;

/// Eigenvalue-gap threshold below which a tensor counts as degenerate
/// (isotropic): there is no meaningful principal direction.
pub const EIGEN_EPSILON: f64 = 1e-6;

/// Symmetric tensor stored by its three free components.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tensor2 {
    pub xx: f64,
    pub yy: f64,
    pub xy: f64,
}

/// Principal decomposition of a non-degenerate tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eigen {
    pub lambda_major: f64,
    pub lambda_minor: f64,
    /// Unit eigenvector of the larger eigenvalue. Sign is arbitrary;
    /// callers align it against the previous sample for continuity.
    pub major: Vec2,
}

impl Tensor2 {
    pub const ZERO: Tensor2 = Tensor2 {
        xx: 0.0,
        yy: 0.0,
        xy: 0.0,
    };

    /// `R(theta) . diag(l_major, l_minor) . R(theta)^T`
    pub fn from_orientation(theta: f64, lambda_major: f64, lambda_minor: f64) -> Self {
        let (s, c) = theta.sin_cos();
        Self {
            xx: lambda_major * c * c + lambda_minor * s * s,
            yy: lambda_major * s * s + lambda_minor * c * c,
            xy: (lambda_major - lambda_minor) * s * c,
        }
    }

    /// Outer product `u u^T` of a unit direction.
    pub fn from_direction(u: Vec2) -> Self {
        Self {
            xx: u.x * u.x,
            yy: u.y * u.y,
            xy: u.x * u.y,
        }
    }

    pub fn add(&self, other: &Tensor2) -> Tensor2 {
        Tensor2 {
            xx: self.xx + other.xx,
            yy: self.yy + other.yy,
            xy: self.xy + other.xy,
        }
    }

    pub fn scale(&self, s: f64) -> Tensor2 {
        Tensor2 {
            xx: self.xx * s,
            yy: self.yy * s,
            xy: self.xy * s,
        }
    }

    /// Frobenius norm.
    pub fn norm(&self) -> f64 {
        (self.xx * self.xx + self.yy * self.yy + 2.0 * self.xy * self.xy).sqrt()
    }

    /// Closed-form eigen decomposition. Returns `None` when the eigenvalue
    /// gap is below [`EIGEN_EPSILON`] (singularity for tracing purposes).
    pub fn eigen(&self) -> Option<Eigen> {
        let mean = (self.xx + self.yy) / 2.0;
        let half_diff = (self.xx - self.yy) / 2.0;
        let disc = (half_diff * half_diff + self.xy * self.xy).sqrt();
        if 2.0 * disc < EIGEN_EPSILON {
            return None;
        }
        let lambda_major = mean + disc;
        let lambda_minor = mean - disc;
        // (xy, l1 - xx) is orthogonal to (A - l1 I)'s first row; when xy
        // vanishes the tensor is already diagonal
        let major = if self.xy.abs() > 1e-12 {
            Vec2::new(self.xy, lambda_major - self.xx)
        } else if self.xx >= self.yy {
            Vec2::new(1.0, 0.0)
        } else {
            Vec2::new(0.0, 1.0)
        };
        major.normalized().map(|major| Eigen {
            lambda_major,
            lambda_minor,
            major,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagonal_tensor_eigen() {
        let t = Tensor2 {
            xx: 3.0,
            yy: 1.0,
            xy: 0.0,
        };
        let e = t.eigen().unwrap();
        assert_eq!(e.lambda_major, 3.0);
        assert_eq!(e.lambda_minor, 1.0);
        assert_eq!(e.major, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn orientation_round_trips_through_eigen() {
        for theta in [0.3, 1.1, -0.7, 2.5] {
            let t = Tensor2::from_orientation(theta, 2.0, 0.5);
            let e = t.eigen().unwrap();
            assert!((e.lambda_major - 2.0).abs() < 1e-9);
            assert!((e.lambda_minor - 0.5).abs() < 1e-9);
            // eigenvector matches the orientation up to sign
            let expect = Vec2::from_angle(theta);
            let dot = e.major.dot(&expect).abs();
            assert!((dot - 1.0).abs() < 1e-9, "theta {theta}: dot {dot}");
        }
    }

    #[test]
    fn isotropic_tensor_is_degenerate() {
        let t = Tensor2 {
            xx: 1.0,
            yy: 1.0,
            xy: 0.0,
        };
        assert!(t.eigen().is_none());
        assert!(Tensor2::ZERO.eigen().is_none());
    }

    #[test]
    fn direction_outer_product_recovers_direction() {
        let u = Vec2::from_angle(0.9);
        let e = Tensor2::from_direction(u).eigen().unwrap();
        assert!((e.major.dot(&u).abs() - 1.0).abs() < 1e-9);
        assert!((e.lambda_major - 1.0).abs() < 1e-9);
        assert!(e.lambda_minor.abs() < 1e-9);
    }

    #[test]
    fn superposition_is_componentwise() {
        let a = Tensor2::from_orientation(0.0, 1.0, 0.2);
        let b = Tensor2::from_orientation(1.0, 0.5, 0.1);
        let sum = a.add(&b).scale(2.0);
        assert!((sum.xx - 2.0 * (a.xx + b.xx)).abs() < 1e-12);
        assert!((sum.xy - 2.0 * (a.xy + b.xy)).abs() < 1e-12);
    }
}
