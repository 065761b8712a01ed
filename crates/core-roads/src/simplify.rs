//! Ramer-Douglas-Peucker polyline simplification.

use core_model::{point_segment_distance, Point, Polyline};

/// Reduce `polyline` to the minimal vertex chain whose deviation from the
/// original stays under `epsilon`.
pub fn simplify(polyline: &Polyline, epsilon: f64) -> Polyline {
    let v = &polyline.vertices;
    if v.len() <= 2 {
        return polyline.clone();
    }
    let mut keep = vec![false; v.len()];
    keep[0] = true;
    keep[v.len() - 1] = true;
    rdp(v, 0, v.len() - 1, epsilon, &mut keep);
    Polyline::new(
        v.iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(p, _)| *p)
            .collect(),
    )
}

fn rdp(v: &[Point], first: usize, last: usize, epsilon: f64, keep: &mut [bool]) {
    if last <= first + 1 {
        return;
    }
    let mut max_dist = 0.0;
    let mut max_idx = first;
    for i in (first + 1)..last {
        let d = point_segment_distance(&v[i], &v[first], &v[last]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }
    if max_dist > epsilon {
        keep[max_idx] = true;
        rdp(v, first, max_idx, epsilon, keep);
        rdp(v, max_idx, last, epsilon, keep);
    }
}
