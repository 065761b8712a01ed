//! Recombination operators. Building ids are identities, not a
//! permutation: crossover exchanges the positions two parents assign to
//! the same id, so every child is a valid id -> position mapping by
//! construction.

use rand::rngs::StdRng;
use rand::Rng;

use core_model::Solution;

#[derive(Debug, Clone, PartialEq)]
pub enum Crossover {
    /// Per building id, exchange the parents' positions with
    /// `swap_probability`.
    Uniform { swap_probability: f64 },
    /// Partition ids (in sorted order) into `segments` contiguous groups
    /// and exchange whole groups with probability 1/2 each.
    PartiallyMatched { segments: usize },
}

impl Crossover {
    pub fn name(&self) -> &'static str {
        match self {
            Crossover::Uniform { .. } => "uniform",
            Crossover::PartiallyMatched { .. } => "pmx",
        }
    }

    pub fn cross(&self, p1: &Solution, p2: &Solution, rng: &mut StdRng) -> (Solution, Solution) {
        let mut c1 = fresh_child(p1);
        let mut c2 = fresh_child(p2);
        match self {
            Crossover::Uniform { swap_probability } => {
                let ids: Vec<String> = p1.positions.keys().cloned().collect();
                for id in ids {
                    if rng.gen::<f64>() < *swap_probability {
                        exchange(&mut c1, &mut c2, p1, p2, &id);
                    }
                }
            }
            Crossover::PartiallyMatched { segments } => {
                let ids: Vec<String> = p1.positions.keys().cloned().collect();
                let n_segments = (*segments).clamp(1, ids.len().max(1));
                let seg_len = ids.len().div_ceil(n_segments);
                for chunk in ids.chunks(seg_len.max(1)) {
                    if rng.gen::<f64>() < 0.5 {
                        for id in chunk {
                            exchange(&mut c1, &mut c2, p1, p2, id);
                        }
                    }
                }
            }
        }
        c1.tag("operator", self.name());
        c2.tag("operator", self.name());
        (c1, c2)
    }
}

fn fresh_child(parent: &Solution) -> Solution {
    let mut child = parent.clone();
    child.fitness = None;
    child.objectives.clear();
    child
}

fn exchange(c1: &mut Solution, c2: &mut Solution, p1: &Solution, p2: &Solution, id: &str) {
    // ids present in only one parent keep that parent's placement
    if let (Some(a), Some(b)) = (p1.positions.get(id), p2.positions.get(id)) {
        c1.positions.insert(id.to_string(), *b);
        c2.positions.insert(id.to_string(), *a);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::Point;
    use rand::SeedableRng;

    fn parents() -> (Solution, Solution) {
        let p1 = Solution::from_pairs([
            ("a", Point::new(0.0, 0.0)),
            ("b", Point::new(1.0, 1.0)),
            ("c", Point::new(2.0, 2.0)),
            ("d", Point::new(3.0, 3.0)),
        ]);
        let p2 = Solution::from_pairs([
            ("a", Point::new(10.0, 10.0)),
            ("b", Point::new(11.0, 11.0)),
            ("c", Point::new(12.0, 12.0)),
            ("d", Point::new(13.0, 13.0)),
        ]);
        (p1, p2)
    }

    #[test]
    fn uniform_zero_probability_is_identity() {
        let (p1, p2) = parents();
        let mut rng = StdRng::seed_from_u64(5);
        let (c1, c2) = Crossover::Uniform {
            swap_probability: 0.0,
        }
        .cross(&p1, &p2, &mut rng);
        assert_eq!(c1.positions, p1.positions);
        assert_eq!(c2.positions, p2.positions);
    }

    #[test]
    fn uniform_unit_probability_swaps_parents() {
        let (p1, p2) = parents();
        let mut rng = StdRng::seed_from_u64(5);
        let (c1, c2) = Crossover::Uniform {
            swap_probability: 1.0,
        }
        .cross(&p1, &p2, &mut rng);
        assert_eq!(c1.positions, p2.positions);
        assert_eq!(c2.positions, p1.positions);
    }

    #[test]
    fn pmx_children_are_complete_mappings() {
        let (p1, p2) = parents();
        let mut rng = StdRng::seed_from_u64(17);
        for segments in 1..=4 {
            let (c1, c2) = Crossover::PartiallyMatched { segments }.cross(&p1, &p2, &mut rng);
            for child in [&c1, &c2] {
                assert_eq!(child.len(), p1.len());
                for id in p1.positions.keys() {
                    let p = child.positions[id];
                    assert!(p == p1.positions[id] || p == p2.positions[id]);
                }
            }
            // children remain complements of each other
            for id in p1.positions.keys() {
                let took_p2 = c1.positions[id] == p2.positions[id];
                let comp = if took_p2 { p1.positions[id] } else { p2.positions[id] };
                assert_eq!(c2.positions[id], comp);
            }
        }
    }

    #[test]
    fn pmx_exchanges_whole_segments() {
        let (p1, p2) = parents();
        let mut rng = StdRng::seed_from_u64(2);
        // two segments over four ids: [a, b] and [c, d]
        let (c1, _) = Crossover::PartiallyMatched { segments: 2 }.cross(&p1, &p2, &mut rng);
        let ab_from_p2 = c1.positions["a"] == p2.positions["a"];
        assert_eq!(c1.positions["b"] == p2.positions["b"], ab_from_p2);
        let cd_from_p2 = c1.positions["c"] == p2.positions["c"];
        assert_eq!(c1.positions["d"] == p2.positions["d"], cd_from_p2);
    }
}
