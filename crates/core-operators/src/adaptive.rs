//! Adaptive operator selection with credit assignment.
//!
//! The selector owns one stats slot per operator name and biases future
//! choices toward operators that recently produced fitness improvements.
//! Credit: `improvement = max(0, f_child - f_parent)`; an application is a
//! success iff the improvement is strictly positive. Rewards are the mean
//! improvement over a sliding window so stale early luck decays.
//!
//! All mutable state sits behind a single mutex. Parallel SA chains should
//! accumulate `(operator, improvement)` pairs locally and fold them in at
//! chain completion via `credit_batch`, which keeps single-chain runs
//! bit-reproducible and the lock cold.

use std::collections::VecDeque;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use core_config::AdaptiveStrategy;

/// Sliding reward window length.
const REWARD_WINDOW: usize = 50;
/// Adaptive-pursuit learning rate.
const PURSUIT_BETA: f64 = 0.1;
/// UCB exploration constant.
const UCB_C: f64 = std::f64::consts::SQRT_2;
/// Softmax temperature floor.
const TAU_FLOOR: f64 = 1e-3;

#[derive(Debug, Clone)]
struct Slot {
    uses: u64,
    successes: u64,
    total_improvement: f64,
    window: VecDeque<f64>,
    probability: f64,
}

impl Slot {
    fn new(initial_probability: f64) -> Self {
        Self {
            uses: 0,
            successes: 0,
            total_improvement: 0.0,
            window: VecDeque::with_capacity(REWARD_WINDOW),
            probability: initial_probability,
        }
    }

    fn reward(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.window.iter().sum::<f64>() / self.window.len() as f64
        }
    }

    fn push(&mut self, improvement: f64) {
        self.uses += 1;
        if improvement > 0.0 {
            self.successes += 1;
        }
        self.total_improvement += improvement;
        if self.window.len() == REWARD_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(improvement.max(0.0));
    }
}

/// Per-operator counters exported into the result bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorStatsSnapshot {
    pub name: String,
    pub uses: u64,
    pub successes: u64,
    pub mean_improvement: f64,
    pub reward: f64,
    pub probability: f64,
}

struct State {
    slots: Vec<Slot>,
    softmax_tau: f64,
}

pub struct AdaptiveSelector {
    strategy: AdaptiveStrategy,
    enabled: bool,
    names: Vec<String>,
    state: Mutex<State>,
}

impl AdaptiveSelector {
    pub fn new(strategy: AdaptiveStrategy, enabled: bool, names: Vec<String>) -> Self {
        let k = names.len().max(1);
        let slots = (0..names.len())
            .map(|_| Slot::new(1.0 / k as f64))
            .collect();
        Self {
            strategy,
            enabled,
            names,
            state: Mutex::new(State {
                slots,
                softmax_tau: 1.0,
            }),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Scheduled softmax temperature; ignored by other strategies.
    pub fn set_softmax_temperature(&self, tau: f64) {
        self.lock().softmax_tau = tau.max(TAU_FLOOR);
    }

    /// Pick the index of the operator to apply next.
    pub fn choose(&self, rng: &mut StdRng) -> usize {
        let k = self.names.len();
        if k <= 1 {
            return 0;
        }
        if !self.enabled {
            return rng.gen_range(0..k);
        }
        let state = self.lock();
        match self.strategy {
            AdaptiveStrategy::Uniform => {
                drop(state);
                rng.gen_range(0..k)
            }
            AdaptiveStrategy::Greedy => argmax(state.slots.iter().map(Slot::reward)),
            AdaptiveStrategy::AdaptivePursuit => {
                let probs: Vec<f64> = state.slots.iter().map(|s| s.probability).collect();
                drop(state);
                sample_discrete(&probs, rng)
            }
            AdaptiveStrategy::Ucb => {
                let total: u64 = state.slots.iter().map(|s| s.uses).sum();
                // unused arms first, in index order
                if let Some(idx) = state.slots.iter().position(|s| s.uses == 0) {
                    return idx;
                }
                let ln_total = ((total.max(1)) as f64).ln();
                argmax(
                    state
                        .slots
                        .iter()
                        .map(|s| s.reward() + UCB_C * (ln_total / s.uses as f64).sqrt()),
                )
            }
            AdaptiveStrategy::Softmax => {
                let tau = state.softmax_tau;
                let max_r = state
                    .slots
                    .iter()
                    .map(Slot::reward)
                    .fold(f64::NEG_INFINITY, f64::max);
                let weights: Vec<f64> = state
                    .slots
                    .iter()
                    .map(|s| ((s.reward() - max_r) / tau).exp())
                    .collect();
                drop(state);
                sample_discrete(&weights, rng)
            }
        }
    }

    /// Record the outcome of one operator application.
    pub fn credit(&self, index: usize, improvement: f64) {
        let mut state = self.lock();
        if index >= state.slots.len() {
            return;
        }
        state.slots[index].push(improvement);
        if self.strategy == AdaptiveStrategy::AdaptivePursuit {
            pursuit_update(&mut state.slots);
        }
    }

    /// Fold in credits accumulated locally by a worker.
    pub fn credit_batch(&self, credits: &[(usize, f64)]) {
        let mut state = self.lock();
        for (index, improvement) in credits {
            if *index < state.slots.len() {
                state.slots[*index].push(*improvement);
            }
        }
        if self.strategy == AdaptiveStrategy::AdaptivePursuit && !credits.is_empty() {
            pursuit_update(&mut state.slots);
        }
    }

    /// Selection probabilities the next `choose` would use, for progress
    /// reporting.
    pub fn mix(&self) -> Vec<(String, f64)> {
        let k = self.names.len();
        if k == 0 {
            return Vec::new();
        }
        if !self.enabled {
            return self
                .names
                .iter()
                .map(|n| (n.clone(), 1.0 / k as f64))
                .collect();
        }
        let state = self.lock();
        let probs: Vec<f64> = match self.strategy {
            AdaptiveStrategy::Uniform => vec![1.0 / k as f64; k],
            AdaptiveStrategy::Greedy | AdaptiveStrategy::Ucb => {
                let best = argmax(state.slots.iter().map(Slot::reward));
                (0..k).map(|i| if i == best { 1.0 } else { 0.0 }).collect()
            }
            AdaptiveStrategy::AdaptivePursuit => {
                state.slots.iter().map(|s| s.probability).collect()
            }
            AdaptiveStrategy::Softmax => {
                let tau = state.softmax_tau;
                let weights: Vec<f64> = state
                    .slots
                    .iter()
                    .map(|s| (s.reward() / tau).exp())
                    .collect();
                let total: f64 = weights.iter().sum();
                weights.iter().map(|w| w / total).collect()
            }
        };
        self.names.iter().cloned().zip(probs).collect()
    }

    pub fn snapshot(&self) -> Vec<OperatorStatsSnapshot> {
        let state = self.lock();
        self.names
            .iter()
            .zip(&state.slots)
            .map(|(name, slot)| OperatorStatsSnapshot {
                name: name.clone(),
                uses: slot.uses,
                successes: slot.successes,
                mean_improvement: if slot.uses == 0 {
                    0.0
                } else {
                    slot.total_improvement / slot.uses as f64
                },
                reward: slot.reward(),
                probability: slot.probability,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("adaptive selector state poisoned")
    }
}

/// Pursuit: push the best operator's probability toward `p_max` and all
/// others toward `p_min = 0.1 / K`.
fn pursuit_update(slots: &mut [Slot]) {
    let k = slots.len();
    if k < 2 {
        return;
    }
    let p_min = 0.1 / k as f64;
    let p_max = 1.0 - (k - 1) as f64 * p_min;
    let best = argmax(slots.iter().map(Slot::reward));
    for (i, slot) in slots.iter_mut().enumerate() {
        let target = if i == best { p_max } else { p_min };
        slot.probability += PURSUIT_BETA * (target - slot.probability);
    }
    let total: f64 = slots.iter().map(|s| s.probability).sum();
    for slot in slots.iter_mut() {
        slot.probability /= total;
    }
}

fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

fn sample_discrete(weights: &[f64], rng: &mut StdRng) -> usize {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.gen_range(0..weights.len());
    }
    let mut ticket = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        ticket -= w;
        if ticket <= 0.0 {
            return i;
        }
    }
    weights.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn selector(strategy: AdaptiveStrategy) -> AdaptiveSelector {
        AdaptiveSelector::new(
            strategy,
            true,
            vec!["good".into(), "bad".into()],
        )
    }

    #[test]
    fn greedy_locks_onto_rewarding_operator() {
        let sel = selector(AdaptiveStrategy::Greedy);
        for _ in 0..10 {
            sel.credit(0, 0.5);
            sel.credit(1, 0.0);
        }
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(sel.choose(&mut rng), 0);
        }
    }

    #[test]
    fn ucb_tries_every_arm_first() {
        let sel = selector(AdaptiveStrategy::Ucb);
        let mut rng = StdRng::seed_from_u64(1);
        let first = sel.choose(&mut rng);
        sel.credit(first, 0.1);
        let second = sel.choose(&mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn disabled_selector_is_uniform() {
        let sel = AdaptiveSelector::new(
            AdaptiveStrategy::Greedy,
            false,
            vec!["a".into(), "b".into(), "c".into()],
        );
        let mix = sel.mix();
        for (_, p) in mix {
            assert!((p - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn snapshot_tracks_counters() {
        let sel = selector(AdaptiveStrategy::Uniform);
        sel.credit(0, 0.2);
        sel.credit(0, 0.0);
        sel.credit(1, -0.1);
        let snap = sel.snapshot();
        assert_eq!(snap[0].uses, 2);
        assert_eq!(snap[0].successes, 1);
        assert_eq!(snap[1].uses, 1);
        assert_eq!(snap[1].successes, 0);
        assert!((snap[0].mean_improvement - 0.1).abs() < 1e-12);
    }

    #[test]
    fn batch_credit_equals_sequential_credit() {
        let a = selector(AdaptiveStrategy::Uniform);
        let b = selector(AdaptiveStrategy::Uniform);
        let credits = vec![(0, 0.1), (1, 0.0), (0, 0.3)];
        for (i, d) in &credits {
            a.credit(*i, *d);
        }
        b.credit_batch(&credits);
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn pursuit_probabilities_stay_normalized() {
        let sel = selector(AdaptiveStrategy::AdaptivePursuit);
        for _ in 0..100 {
            sel.credit(0, 0.01);
            sel.credit(1, 0.0);
        }
        let total: f64 = sel.mix().iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
