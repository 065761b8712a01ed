//! Road network composition on top of the tensor field tracer.
//!
//! Gateways seed the major roads first (their bases already shape the
//! field, so the arteries follow the access axes); building centroids seed
//! the minor roads, whose loose endpoints snap onto nearby majors. All
//! polylines are Ramer-Douglas-Peucker simplified before the intersection
//! graph and its Kansky connectivity indices are computed.

pub mod builder;
pub mod graph;
pub mod simplify;

pub use builder::RoadNetworkBuilder;
pub use graph::{network_stats, NetworkStats};
pub use simplify::simplify;

use serde::{Deserialize, Serialize};

use core_model::Polyline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadKind {
    Major,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Road {
    #[serde(rename = "type")]
    pub kind: RoadKind,
    pub vertices: Polyline,
}

impl Road {
    pub fn length(&self) -> f64 {
        self.vertices.length()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoadNetwork {
    pub roads: Vec<Road>,
    pub stats: NetworkStats,
}

impl RoadNetwork {
    pub fn total_length(&self) -> f64 {
        self.roads.iter().map(Road::length).sum()
    }
}
