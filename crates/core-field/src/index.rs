//! Uniform-grid spatial index over emitted road segments, used for the
//! tracer's proximity-termination test and for endpoint snapping.

use std::collections::HashMap;

use core_model::{closest_point_on_segment, Point, Polyline};

pub struct SegmentIndex {
    cell: f64,
    cells: HashMap<(i64, i64), Vec<(Point, Point)>>,
}

impl SegmentIndex {
    /// `cell` should be at least the query radius so a 3x3 neighborhood
    /// covers every candidate.
    pub fn new(cell: f64) -> Self {
        Self {
            cell: cell.max(1e-6),
            cells: HashMap::new(),
        }
    }

    fn key(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell).floor() as i64,
            (y / self.cell).floor() as i64,
        )
    }

    pub fn insert_segment(&mut self, a: Point, b: Point) {
        let (ka, kb) = (self.key(a.x, a.y), self.key(b.x, b.y));
        for kx in ka.0.min(kb.0)..=ka.0.max(kb.0) {
            for ky in ka.1.min(kb.1)..=ka.1.max(kb.1) {
                self.cells.entry((kx, ky)).or_default().push((a, b));
            }
        }
    }

    pub fn insert_polyline(&mut self, polyline: &Polyline) {
        for (a, b) in polyline.segments() {
            self.insert_segment(a, b);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Closest indexed point within `radius` of `p`, with its distance.
    pub fn nearest_within(&self, p: &Point, radius: f64) -> Option<(Point, f64)> {
        let reach = (radius / self.cell).ceil() as i64;
        let center = self.key(p.x, p.y);
        let mut best: Option<(Point, f64)> = None;
        for kx in (center.0 - reach)..=(center.0 + reach) {
            for ky in (center.1 - reach)..=(center.1 + reach) {
                if let Some(segments) = self.cells.get(&(kx, ky)) {
                    for (a, b) in segments {
                        let q = closest_point_on_segment(p, a, b);
                        let d = p.distance(&q);
                        if d <= radius && best.map(|(_, bd)| d < bd).unwrap_or(true) {
                            best = Some((q, d));
                        }
                    }
                }
            }
        }
        best
    }
}
