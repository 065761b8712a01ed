//! Temperature-independent variation for the genetic phase. The variants
//! mirror the perturbation family with a fixed step size.

use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::StandardNormal;

use core_model::{Bounds, Point, Solution};

use crate::perturbation::{pick_id, swap_two};
use crate::uniform_point;

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Gaussian { sigma: f64 },
    Swap,
    RandomReset,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Gaussian { .. } => "gaussian",
            Mutation::Swap => "swap",
            Mutation::RandomReset => "random_reset",
        }
    }

    pub fn mutate(
        &self,
        sol: &Solution,
        bounds: &Bounds,
        margin: f64,
        rng: &mut StdRng,
    ) -> Solution {
        let mut next = sol.clone();
        next.fitness = None;
        next.objectives.clear();
        if next.positions.is_empty() {
            return next;
        }
        match self {
            Mutation::Gaussian { sigma } => {
                let id = pick_id(&next, rng);
                let p = next.positions[&id];
                let dx: f64 = rng.sample::<f64, _>(StandardNormal) * sigma;
                let dy: f64 = rng.sample::<f64, _>(StandardNormal) * sigma;
                let moved = bounds.inset(margin).clamp(&Point::new(p.x + dx, p.y + dy));
                next.positions.insert(id, moved);
            }
            Mutation::Swap => swap_two(&mut next, rng),
            Mutation::RandomReset => {
                let id = pick_id(&next, rng);
                let p = uniform_point(bounds, margin, rng);
                next.positions.insert(id, p);
            }
        }
        next.tag("operator", self.name());
        next
    }
}
