//! Intersection graph over the road polylines and the Kansky connectivity
//! indices computed from it. Vertices are road endpoints plus pairwise
//! crossings (deduplicated on a decimetre grid); each crossing splits the
//! roads it lies on into additional edges.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use core_model::{segment_intersection, Point};

use crate::{Road, RoadKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NetworkStats {
    pub major_count: usize,
    pub minor_count: usize,
    pub total_length: f64,
    pub vertices: usize,
    pub edges: usize,
    /// Kansky beta = E / V.
    pub beta: f64,
    /// Kansky gamma = E / (3 (V - 2)).
    pub gamma: f64,
    /// Kansky alpha = (E - V + 1) / (2V - 5).
    pub alpha: f64,
}

fn quantize(p: &Point) -> (i64, i64) {
    ((p.x * 10.0).round() as i64, (p.y * 10.0).round() as i64)
}

pub fn network_stats(roads: &[Road]) -> NetworkStats {
    let mut vertex_keys: BTreeSet<(i64, i64)> = BTreeSet::new();
    // crossings found on each road, used to count edge splits
    let mut crossings_per_road = vec![0usize; roads.len()];

    for road in roads {
        if let (Some(first), Some(last)) =
            (road.vertices.vertices.first(), road.vertices.vertices.last())
        {
            vertex_keys.insert(quantize(first));
            vertex_keys.insert(quantize(last));
        }
    }

    for i in 0..roads.len() {
        for j in (i + 1)..roads.len() {
            for (a, b) in roads[i].vertices.segments() {
                for (c, d) in roads[j].vertices.segments() {
                    if let Some(p) = segment_intersection(&a, &b, &c, &d) {
                        if vertex_keys.insert(quantize(&p)) {
                            crossings_per_road[i] += 1;
                            crossings_per_road[j] += 1;
                        }
                    }
                }
            }
        }
    }

    let usable = roads.iter().filter(|r| r.vertices.len() >= 2).count();
    let vertices = vertex_keys.len();
    let edges: usize = roads
        .iter()
        .zip(&crossings_per_road)
        .filter(|(r, _)| r.vertices.len() >= 2)
        .map(|(_, crossings)| crossings + 1)
        .sum();

    let v = vertices as f64;
    let e = edges as f64;
    let beta = if vertices > 0 { e / v } else { 0.0 };
    let gamma = if vertices > 2 { e / (3.0 * (v - 2.0)) } else { 0.0 };
    let alpha = if 2.0 * v - 5.0 > 0.0 {
        ((e - v + 1.0) / (2.0 * v - 5.0)).max(0.0)
    } else {
        0.0
    };

    NetworkStats {
        major_count: roads
            .iter()
            .filter(|r| r.kind == RoadKind::Major && r.vertices.len() >= 2)
            .count(),
        minor_count: usable
            - roads
                .iter()
                .filter(|r| r.kind == RoadKind::Major && r.vertices.len() >= 2)
                .count(),
        total_length: roads.iter().map(Road::length).sum(),
        vertices,
        edges,
        beta,
        gamma,
        alpha,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::Polyline;

    fn road(kind: RoadKind, pts: &[(f64, f64)]) -> Road {
        Road {
            kind,
            vertices: Polyline::new(pts.iter().map(|(x, y)| Point::new(*x, *y)).collect()),
        }
    }

    #[test]
    fn single_road_stats() {
        let roads = [road(RoadKind::Major, &[(0.0, 0.0), (100.0, 0.0)])];
        let stats = network_stats(&roads);
        assert_eq!(stats.vertices, 2);
        assert_eq!(stats.edges, 1);
        assert_eq!(stats.beta, 0.5);
        assert_eq!(stats.gamma, 0.0);
        assert_eq!(stats.total_length, 100.0);
    }

    #[test]
    fn crossing_roads_add_a_vertex_and_split_edges() {
        let roads = [
            road(RoadKind::Major, &[(0.0, 50.0), (100.0, 50.0)]),
            road(RoadKind::Minor, &[(50.0, 0.0), (50.0, 100.0)]),
        ];
        let stats = network_stats(&roads);
        // 4 endpoints + 1 crossing
        assert_eq!(stats.vertices, 5);
        // each road split into 2
        assert_eq!(stats.edges, 4);
        assert!((stats.beta - 0.8).abs() < 1e-12);
        assert!((stats.gamma - 4.0 / 9.0).abs() < 1e-12);
        assert_eq!(stats.alpha, 0.0);
        assert_eq!(stats.major_count, 1);
        assert_eq!(stats.minor_count, 1);
    }

    #[test]
    fn empty_network_is_all_zero() {
        let stats = network_stats(&[]);
        assert_eq!(stats.vertices, 0);
        assert_eq!(stats.edges, 0);
        assert_eq!(stats.beta, 0.0);
    }

    #[test]
    fn beta_is_never_negative() {
        let roads = [
            road(RoadKind::Major, &[(0.0, 0.0), (10.0, 0.0)]),
            road(RoadKind::Major, &[(0.0, 5.0), (10.0, 5.0)]),
        ];
        let stats = network_stats(&roads);
        assert!(stats.beta >= 0.0);
        assert!(stats.alpha >= 0.0);
    }
}
