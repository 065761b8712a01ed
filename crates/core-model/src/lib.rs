//! Value types shared by every other crate: geometry primitives, buildings,
//! the site and its gateways, candidate solutions, constraint violations,
//! and the `ProblemSpec` input record with its validation pass.
//!
//! Everything here is constructed once per optimization and read-only to the
//! solver (solutions are the exception: operators produce new ones by
//! cloning, never by mutating a shared instance). Maps are `BTreeMap` so
//! iteration order and JSON serialization are canonical.

pub mod building;
pub mod geometry;
pub mod problem;
pub mod site;
pub mod solution;
pub mod violation;

pub use building::{Building, BuildingConstraints, BuildingKind};
pub use geometry::{
    closest_point_on_segment, point_segment_distance, segment_intersection, Bounds, Point,
    Polygon, Polyline, Vec2,
};
pub use problem::{ProblemSpec, ValidationError};
pub use site::{Gateway, GatewayKind, Site};
pub use solution::{population_diversity, Fingerprint, Solution};
pub use violation::{BilingualText, Citation, ConstraintViolation, Severity};
