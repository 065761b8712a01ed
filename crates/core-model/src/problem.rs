//! The `ProblemSpec` input record and its validation pass. Validation runs
//! before any computation; everything it rejects would otherwise surface as
//! a confusing mid-run failure.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_config::{AdaptiveConfig, GaConfig, QualityConfig, RoadConfig, SaConfig};

use crate::building::Building;
use crate::site::Site;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("problem contains no buildings")]
    EmptyBuildings,
    #[error("duplicate building id `{0}`")]
    DuplicateBuildingId(String),
    #[error("building `{id}` has non-positive area {area}")]
    NonPositiveArea { id: String, area: f64 },
    #[error("building `{id}` has zero floors")]
    ZeroFloors { id: String },
    #[error("degenerate site: {width} x {height}")]
    DegenerateSite { width: f64, height: f64 },
    #[error("boundary ring has fewer than 3 vertices")]
    DegenerateBoundary,
    #[error("boundary ring self-intersects")]
    SelfIntersectingBoundary,
    #[error("gateway `{id}` has negative clearance {clearance}")]
    NegativeClearance { id: String, clearance: f64 },
    #[error("boundary margin {0} is negative")]
    NegativeMargin(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSpec {
    pub problem_id: String,
    pub buildings: Vec<Building>,
    pub site: Site,
    #[serde(default)]
    pub sa: SaConfig,
    #[serde(default)]
    pub ga: GaConfig,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    #[serde(default)]
    pub road: RoadConfig,
    #[serde(default)]
    pub quality: QualityConfig,
    /// Weight per named objective, passed through to the evaluator.
    #[serde(default)]
    pub objective_weights: BTreeMap<String, f64>,
    /// Positions must stay inside the bounds inset by this margin, m.
    #[serde(default = "ProblemSpec::default_boundary_margin")]
    pub boundary_margin: f64,
    /// Run seed; `None` draws from system entropy.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub wall_clock_budget_ms: Option<u64>,
}

impl ProblemSpec {
    const fn default_boundary_margin() -> f64 {
        5.0
    }

    pub fn new(problem_id: impl Into<String>, buildings: Vec<Building>, site: Site) -> Self {
        Self {
            problem_id: problem_id.into(),
            buildings,
            site,
            sa: SaConfig::default(),
            ga: GaConfig::default(),
            adaptive: AdaptiveConfig::default(),
            road: RoadConfig::default(),
            quality: QualityConfig::default(),
            objective_weights: BTreeMap::new(),
            boundary_margin: Self::default_boundary_margin(),
            rng_seed: None,
            wall_clock_budget_ms: None,
        }
    }

    /// Reject malformed input. Infeasibility (e.g. clearances covering the
    /// whole site) is deliberately NOT validation: the solver runs and the
    /// compliance report carries what it saw.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.buildings.is_empty() {
            return Err(ValidationError::EmptyBuildings);
        }
        let mut seen = BTreeSet::new();
        for b in &self.buildings {
            if !seen.insert(b.id.as_str()) {
                return Err(ValidationError::DuplicateBuildingId(b.id.clone()));
            }
            if !(b.area > 0.0) {
                return Err(ValidationError::NonPositiveArea {
                    id: b.id.clone(),
                    area: b.area,
                });
            }
            if b.floors == 0 {
                return Err(ValidationError::ZeroFloors { id: b.id.clone() });
            }
        }
        let (w, h) = (self.site.bounds.width(), self.site.bounds.height());
        if !(w > 0.0 && h > 0.0) {
            return Err(ValidationError::DegenerateSite {
                width: w,
                height: h,
            });
        }
        if let Some(poly) = &self.site.boundary {
            if poly.len() < 3 {
                return Err(ValidationError::DegenerateBoundary);
            }
            if poly.self_intersects() {
                return Err(ValidationError::SelfIntersectingBoundary);
            }
        }
        for g in &self.site.gateways {
            if g.clearance < 0.0 {
                return Err(ValidationError::NegativeClearance {
                    id: g.id.clone(),
                    clearance: g.clearance,
                });
            }
        }
        if self.boundary_margin < 0.0 {
            return Err(ValidationError::NegativeMargin(self.boundary_margin));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::building::BuildingKind;
    use crate::geometry::{Bounds, Point, Polygon};

    fn spec() -> ProblemSpec {
        ProblemSpec::new(
            "t",
            vec![
                Building::new("a", BuildingKind::Residential, 2000.0, 4),
                Building::new("b", BuildingKind::Educational, 2500.0, 3),
            ],
            Site::new(Bounds::new(0.0, 0.0, 200.0, 200.0)),
        )
    }

    #[test]
    fn valid_spec_passes() {
        assert_eq!(spec().validate(), Ok(()));
    }

    #[test]
    fn empty_buildings_rejected() {
        let mut s = spec();
        s.buildings.clear();
        assert_eq!(s.validate(), Err(ValidationError::EmptyBuildings));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut s = spec();
        s.buildings
            .push(Building::new("a", BuildingKind::Dining, 100.0, 1));
        assert_eq!(
            s.validate(),
            Err(ValidationError::DuplicateBuildingId("a".into()))
        );
    }

    #[test]
    fn degenerate_site_rejected() {
        let mut s = spec();
        s.site.bounds = Bounds::new(0.0, 0.0, 0.0, 200.0);
        assert!(matches!(
            s.validate(),
            Err(ValidationError::DegenerateSite { .. })
        ));
    }

    #[test]
    fn bad_area_and_floors_rejected() {
        let mut s = spec();
        s.buildings[0].area = -5.0;
        assert!(matches!(
            s.validate(),
            Err(ValidationError::NonPositiveArea { .. })
        ));
        let mut s = spec();
        s.buildings[1].floors = 0;
        assert!(matches!(s.validate(), Err(ValidationError::ZeroFloors { .. })));
    }

    #[test]
    fn self_intersecting_boundary_rejected() {
        let mut s = spec();
        s.site.boundary = Some(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(200.0, 200.0),
            Point::new(200.0, 0.0),
            Point::new(0.0, 200.0),
        ]));
        assert_eq!(s.validate(), Err(ValidationError::SelfIntersectingBoundary));
    }

    #[test]
    fn spec_round_trips_through_json() {
        let s = spec();
        let json = serde_json::to_string(&s).unwrap();
        let back: ProblemSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
