//! Building specifications. A building is immutable input to the solver;
//! its candidate position lives in `Solution`, the optional `position` here
//! records a pre-existing (kept) placement.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Closed set of campus building types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    Residential,
    Educational,
    Administrative,
    Health,
    Social,
    Library,
    Dining,
    Sports,
    Commercial,
    Research,
}

impl BuildingKind {
    pub const ALL: [BuildingKind; 10] = [
        BuildingKind::Residential,
        BuildingKind::Educational,
        BuildingKind::Administrative,
        BuildingKind::Health,
        BuildingKind::Social,
        BuildingKind::Library,
        BuildingKind::Dining,
        BuildingKind::Sports,
        BuildingKind::Commercial,
        BuildingKind::Research,
    ];

    /// Default field-assembly importance. Central, traffic-drawing programs
    /// weigh more; values stay within [0.2, 1.5] so no single building can
    /// dominate the tensor field.
    pub fn default_importance(&self) -> f64 {
        match self {
            BuildingKind::Educational => 1.2,
            BuildingKind::Library => 1.1,
            BuildingKind::Administrative => 1.0,
            BuildingKind::Social => 1.0,
            BuildingKind::Dining => 0.9,
            BuildingKind::Health => 0.9,
            BuildingKind::Commercial => 0.8,
            BuildingKind::Research => 0.8,
            BuildingKind::Residential => 0.7,
            BuildingKind::Sports => 0.6,
        }
    }
}

/// Per-building overrides for the compliance thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildingConstraints {
    pub min_distance: Option<f64>,
    pub setback: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    /// Stable identifier, unique within a problem.
    pub id: String,
    pub kind: BuildingKind,
    /// Total floor area, m^2. Must be positive.
    pub area: f64,
    /// Storey count, >= 1.
    pub floors: u32,
    /// Pre-existing placement (kept buildings); new buildings carry `None`.
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub constraints: Option<BuildingConstraints>,
}

impl Building {
    pub fn new(id: impl Into<String>, kind: BuildingKind, area: f64, floors: u32) -> Self {
        Self {
            id: id.into(),
            kind,
            area,
            floors,
            position: None,
            constraints: None,
        }
    }

    /// Ground-floor area, m^2.
    pub fn footprint(&self) -> f64 {
        self.area / self.floors.max(1) as f64
    }

    /// Equivalent-circle radius of the footprint, m.
    pub fn radius(&self) -> f64 {
        (self.footprint() / std::f64::consts::PI).sqrt()
    }

    /// Height derived from the storey count, m.
    pub fn height(&self, floor_height: f64) -> f64 {
        self.floors as f64 * floor_height
    }
}
