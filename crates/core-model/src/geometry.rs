//! Planar geometry in site-local metric coordinates (metres, f64
//! throughout). Points serialize as `[x, y]` pairs to keep the on-disk
//! representation compact and canonical.

use serde::{Deserialize, Serialize};

/// A position in the site frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn translate(&self, v: Vec2) -> Point {
        Point::new(self.x + v.x, self.y + v.y)
    }

    pub fn to_vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Point {
    fn from(v: [f64; 2]) -> Self {
        Point::new(v[0], v[1])
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// A direction or displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_angle(theta: f64) -> Self {
        Self::new(theta.cos(), theta.sin())
    }

    pub fn between(from: &Point, to: &Point) -> Self {
        Self::new(to.x - from.x, to.y - from.y)
    }

    pub fn dot(&self, other: &Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector, or `None` for (near-)zero input.
    pub fn normalized(&self) -> Option<Vec2> {
        let n = self.norm();
        if n < 1e-12 {
            None
        } else {
            Some(Vec2::new(self.x / n, self.y / n))
        }
    }

    pub fn scale(&self, s: f64) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }

    pub fn neg(&self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }

    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Unsigned angle between two vectors, in [0, pi].
    pub fn angle_between(&self, other: &Vec2) -> f64 {
        let denom = self.norm() * other.norm();
        if denom < 1e-12 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0).acos()
    }
}

/// Axis-aligned site bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Bounds {
    pub const fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.x_min && p.x <= self.x_max && p.y >= self.y_min && p.y <= self.y_max
    }

    /// Shrink by `margin` on every side. A margin larger than the half-extent
    /// collapses the box to its center line rather than inverting.
    pub fn inset(&self, margin: f64) -> Bounds {
        let m_x = margin.min(self.width() / 2.0);
        let m_y = margin.min(self.height() / 2.0);
        Bounds::new(
            self.x_min + m_x,
            self.y_min + m_y,
            self.x_max - m_x,
            self.y_max - m_y,
        )
    }

    pub fn clamp(&self, p: &Point) -> Point {
        Point::new(
            p.x.clamp(self.x_min, self.x_max),
            p.y.clamp(self.y_min, self.y_max),
        )
    }

    /// Distance from `p` to the nearest edge; negative when outside.
    pub fn edge_distance(&self, p: &Point) -> f64 {
        let dx = (p.x - self.x_min).min(self.x_max - p.x);
        let dy = (p.y - self.y_min).min(self.y_max - p.y);
        dx.min(dy)
    }
}

/// An ordered closed ring. The duplicate closing vertex is optional on
/// input and stripped on construction (including deserialization).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Point>", into = "Vec<Point>")]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl From<Vec<Point>> for Polygon {
    fn from(vertices: Vec<Point>) -> Self {
        Polygon::new(vertices)
    }
}

impl From<Polygon> for Vec<Point> {
    fn from(polygon: Polygon) -> Self {
        polygon.vertices
    }
}

impl Polygon {
    pub fn new(mut vertices: Vec<Point>) -> Self {
        if vertices.len() >= 2 {
            let first = vertices[0];
            let last = vertices[vertices.len() - 1];
            if first.distance(&last) < 1e-9 {
                vertices.pop();
            }
        }
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges as (start, end) pairs including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area; positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        let mut acc = 0.0;
        for (a, b) in self.edges() {
            acc += a.x * b.y - b.x * a.y;
        }
        acc / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Ray-cast point-in-polygon test. Points exactly on an edge count as
    /// inside.
    pub fn contains(&self, p: &Point) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        for (a, b) in self.edges() {
            if point_segment_distance(p, &a, &b) < 1e-9 {
                return true;
            }
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let t = (p.y - a.y) / (b.y - a.y);
                if p.x < a.x + t * (b.x - a.x) {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// True when any two non-adjacent edges cross.
    pub fn self_intersects(&self) -> bool {
        let edges: Vec<(Point, Point)> = self.edges().collect();
        let n = edges.len();
        for i in 0..n {
            for j in (i + 1)..n {
                // skip shared-vertex adjacency (including the wrap pair)
                if j == i + 1 || (i == 0 && j == n - 1) {
                    continue;
                }
                if segment_intersection(&edges[i].0, &edges[i].1, &edges[j].0, &edges[j].1)
                    .is_some()
                {
                    return true;
                }
            }
        }
        false
    }

    /// Bearing of the longest edge, used as the dominant site orientation.
    pub fn longest_edge_bearing(&self) -> Option<f64> {
        self.edges()
            .max_by(|(a1, b1), (a2, b2)| {
                a1.distance_squared(b1)
                    .partial_cmp(&a2.distance_squared(b2))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(a, b)| Vec2::between(&a, &b).angle())
    }

    /// Minimum distance from `p` to the ring.
    pub fn distance(&self, p: &Point) -> f64 {
        self.edges()
            .map(|(a, b)| point_segment_distance(p, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }
}

/// An open chain of vertices, the road primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Polyline {
    pub vertices: Vec<Point>,
}

impl Polyline {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .sum()
    }

    pub fn segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.vertices.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Closest point on segment `ab` to `p`.
pub fn closest_point_on_segment(p: &Point, a: &Point, b: &Point) -> Point {
    let ab = Vec2::between(a, b);
    let len_sq = ab.dot(&ab);
    if len_sq < 1e-18 {
        return *a;
    }
    let t = (Vec2::between(a, p).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a.translate(ab.scale(t))
}

pub fn point_segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    p.distance(&closest_point_on_segment(p, a, b))
}

/// Proper intersection point of segments `ab` and `cd`, if any. Collinear
/// overlaps return `None`; road graphs treat them as shared geometry.
pub fn segment_intersection(a: &Point, b: &Point, c: &Point, d: &Point) -> Option<Point> {
    let r = Vec2::between(a, b);
    let s = Vec2::between(c, d);
    let denom = r.x * s.y - r.y * s.x;
    if denom.abs() < 1e-12 {
        return None;
    }
    let ac = Vec2::between(a, c);
    let t = (ac.x * s.y - ac.y * s.x) / denom;
    let u = (ac.x * r.y - ac.y * r.x) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a.translate(r.scale(t)))
    } else {
        None
    }
}
