//! The site: bounding box, optional boundary ring, and gateways.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point, Polygon, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GatewayKind {
    #[default]
    Main,
    Secondary,
    Service,
}

/// A point of site access. `bearing` is the outward-normal direction in
/// radians; roads enter the site along the opposite direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: String,
    pub position: Point,
    pub bearing: f64,
    #[serde(default)]
    pub kind: GatewayKind,
    /// Buildings may not be placed within this radius, m.
    #[serde(default = "Gateway::default_clearance")]
    pub clearance: f64,
}

impl Gateway {
    const fn default_clearance() -> f64 {
        15.0
    }

    /// Unit direction pointing into the site.
    pub fn inward_direction(&self) -> Vec2 {
        Vec2::from_angle(self.bearing + std::f64::consts::PI)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub bounds: Bounds,
    #[serde(default)]
    pub boundary: Option<Polygon>,
    #[serde(default)]
    pub gateways: Vec<Gateway>,
}

impl Site {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            boundary: None,
            gateways: Vec::new(),
        }
    }

    /// Usable site area: the boundary polygon when present, else the box.
    pub fn area(&self) -> f64 {
        match &self.boundary {
            Some(poly) if poly.len() >= 3 => poly.area(),
            _ => self.bounds.area(),
        }
    }

    /// True when `p` lies inside the bounds inset by `margin` and, when a
    /// boundary ring exists, inside the ring as well.
    pub fn contains(&self, p: &Point, margin: f64) -> bool {
        if !self.bounds.inset(margin).contains(p) {
            return false;
        }
        match &self.boundary {
            Some(poly) if poly.len() >= 3 => poly.contains(p),
            _ => true,
        }
    }

    /// Dominant orientation for the background field: the longest boundary
    /// edge, or the long axis of the bounding box when no ring is given.
    pub fn dominant_orientation(&self) -> f64 {
        if let Some(poly) = &self.boundary {
            if let Some(bearing) = poly.longest_edge_bearing() {
                return bearing;
            }
        }
        if self.bounds.height() > self.bounds.width() {
            std::f64::consts::FRAC_PI_2
        } else {
            0.0
        }
    }

    /// The main gateway, falling back to the first one.
    pub fn main_gateway(&self) -> Option<&Gateway> {
        self.gateways
            .iter()
            .find(|g| g.kind == GatewayKind::Main)
            .or_else(|| self.gateways.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_honours_margin_and_ring() {
        let mut site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        assert!(site.contains(&Point::new(50.0, 50.0), 5.0));
        assert!(!site.contains(&Point::new(2.0, 50.0), 5.0));

        site.boundary = Some(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(0.0, 100.0),
        ]));
        // inside the box but outside the triangular ring
        assert!(!site.contains(&Point::new(90.0, 90.0), 5.0));
        assert!(site.contains(&Point::new(20.0, 20.0), 5.0));
    }

    #[test]
    fn dominant_orientation_prefers_boundary() {
        let mut site = Site::new(Bounds::new(0.0, 0.0, 10.0, 100.0));
        assert_eq!(site.dominant_orientation(), std::f64::consts::FRAC_PI_2);
        site.boundary = Some(Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(80.0, 0.0),
            Point::new(80.0, 10.0),
            Point::new(0.0, 10.0),
        ]));
        assert!(site.dominant_orientation().abs() < 1e-9);
    }

    #[test]
    fn gateway_inward_direction_opposes_bearing() {
        let g = Gateway {
            id: "g1".into(),
            position: Point::new(0.0, 50.0),
            bearing: std::f64::consts::PI, // outward normal points -x
            kind: GatewayKind::Main,
            clearance: 15.0,
        };
        let inward = g.inward_direction();
        assert!((inward.x - 1.0).abs() < 1e-12);
        assert!(inward.y.abs() < 1e-12);
    }

    #[test]
    fn main_gateway_lookup() {
        let mut site = Site::new(Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert!(site.main_gateway().is_none());
        site.gateways.push(Gateway {
            id: "svc".into(),
            position: Point::new(0.0, 5.0),
            bearing: 0.0,
            kind: GatewayKind::Service,
            clearance: 10.0,
        });
        assert_eq!(site.main_gateway().unwrap().id, "svc");
        site.gateways.push(Gateway {
            id: "main".into(),
            position: Point::new(10.0, 5.0),
            bearing: 0.0,
            kind: GatewayKind::Main,
            clearance: 10.0,
        });
        assert_eq!(site.main_gateway().unwrap().id, "main");
    }
}
