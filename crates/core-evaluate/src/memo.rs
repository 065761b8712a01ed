//! Bounded evaluation cache. Keys are quantized fingerprints, so layouts
//! within a metre of each other share a slot; eviction is oldest-insertion
//! once the capacity is reached. Hit/miss counters are process-wide
//! telemetry inspectable in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use core_model::{Fingerprint, Solution};

use crate::{EvalContext, EvalResult, Evaluator, FitnessResult};

pub static MEMO_HITS: AtomicU64 = AtomicU64::new(0);
pub static MEMO_MISSES: AtomicU64 = AtomicU64::new(0);

struct Cache {
    map: HashMap<Fingerprint, FitnessResult>,
    order: VecDeque<Fingerprint>,
}

pub struct MemoEvaluator<E> {
    inner: E,
    capacity: usize,
    cache: Mutex<Cache>,
}

impl<E: Evaluator> MemoEvaluator<E> {
    pub fn new(inner: E, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            cache: Mutex::new(Cache {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect("memo cache poisoned").map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Evaluator> Evaluator for MemoEvaluator<E> {
    fn evaluate(&self, solution: &Solution, ctx: &EvalContext<'_>) -> EvalResult {
        let key = solution.fingerprint();
        {
            let cache = self.cache.lock().expect("memo cache poisoned");
            if let Some(hit) = cache.map.get(&key) {
                MEMO_HITS.fetch_add(1, Ordering::Relaxed);
                return Ok(hit.clone());
            }
        }
        // the lock is never held across the inner call
        MEMO_MISSES.fetch_add(1, Ordering::Relaxed);
        let result = self.inner.evaluate(solution, ctx)?;
        let mut cache = self.cache.lock().expect("memo cache poisoned");
        if !cache.map.contains_key(&key) {
            if cache.map.len() >= self.capacity {
                if let Some(oldest) = cache.order.pop_front() {
                    cache.map.remove(&oldest);
                    tracing::trace!(target: "evaluate.memo", evicted = %oldest, "memo_evicted");
                }
            }
            cache.order.push_back(key);
            cache.map.insert(key, result.clone());
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvaluatorError;
    use core_model::{Bounds, Point, Site};
    use std::sync::atomic::AtomicUsize;

    struct CountingEvaluator {
        calls: AtomicUsize,
    }

    impl Evaluator for CountingEvaluator {
        fn evaluate(&self, solution: &Solution, _ctx: &EvalContext<'_>) -> EvalResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FitnessResult::scalar(
                solution.positions.values().map(|p| p.x).sum(),
            ))
        }
    }

    fn ctx(site: &Site) -> EvalContext<'_> {
        EvalContext {
            site,
            buildings: &[],
            boundary_margin: 0.0,
        }
    }

    #[test]
    fn repeated_evaluation_hits_the_cache() {
        let site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let memo = MemoEvaluator::new(
            CountingEvaluator {
                calls: AtomicUsize::new(0),
            },
            16,
        );
        let sol = Solution::from_pairs([("a", Point::new(10.0, 10.0))]);
        let f1 = memo.evaluate(&sol, &ctx(&site)).unwrap();
        let f2 = memo.evaluate(&sol, &ctx(&site)).unwrap();
        assert_eq!(f1, f2);
        assert_eq!(memo.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn sub_metre_jitter_shares_a_slot() {
        let site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let memo = MemoEvaluator::new(
            CountingEvaluator {
                calls: AtomicUsize::new(0),
            },
            16,
        );
        let a = Solution::from_pairs([("a", Point::new(10.2, 10.0))]);
        let b = Solution::from_pairs([("a", Point::new(10.4, 10.1))]);
        memo.evaluate(&a, &ctx(&site)).unwrap();
        memo.evaluate(&b, &ctx(&site)).unwrap();
        assert_eq!(memo.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn capacity_is_bounded() {
        let site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let memo = MemoEvaluator::new(
            CountingEvaluator {
                calls: AtomicUsize::new(0),
            },
            4,
        );
        for i in 0..10 {
            let sol = Solution::from_pairs([("a", Point::new(i as f64 * 5.0, 0.0))]);
            memo.evaluate(&sol, &ctx(&site)).unwrap();
        }
        assert!(memo.len() <= 4);
    }

    struct FailingEvaluator;

    impl Evaluator for FailingEvaluator {
        fn evaluate(&self, _: &Solution, _: &EvalContext<'_>) -> EvalResult {
            Err(EvaluatorError::Failure("boom".into()))
        }
    }

    #[test]
    fn errors_are_not_cached() {
        let site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let memo = MemoEvaluator::new(FailingEvaluator, 4);
        let sol = Solution::from_pairs([("a", Point::new(1.0, 1.0))]);
        assert!(memo.evaluate(&sol, &ctx(&site)).is_err());
        assert!(memo.is_empty());
    }
}
