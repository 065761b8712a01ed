//! Semantic tensor field and streamline tracing.
//!
//! A 2x2 symmetric tensor field is assembled over a regular grid by
//! superposing basis contributions (a background grid aligned with the
//! dominant site orientation, one radial basis per placed building, one
//! grid basis per gateway). Roads are integral curves of the principal
//! eigenvector, traced with an adaptive Runge-Kutta 4(5) step.
//!
//! Numerical hazards are eigen degeneracy and curvature blow-up at field
//! discontinuities; both are guarded by explicit epsilons and step-size
//! clamping. Everything is f64: mixing precisions across the tracer causes
//! premature termination.

pub mod basis;
pub mod field;
pub mod index;
pub mod tensor;
pub mod tracer;

pub use basis::{Basis, BasisKind};
pub use field::{ImportanceTable, TensorField};
pub use index::SegmentIndex;
pub use tensor::{Eigen, Tensor2, EIGEN_EPSILON};
pub use tracer::{StopReason, StreamlineTracer, Traced, TracerConfig};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("sample point ({x}, {y}) outside field bounds")]
    OutOfBounds { x: f64, y: f64 },
    #[error("tensor singularity at ({x}, {y})")]
    Singularity { x: f64, y: f64 },
}
