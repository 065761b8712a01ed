//! Parameter schedules: value-over-progress curves used for mutation rate,
//! temperature, crossover rate, and the softmax selector temperature.
//! Progress is `current_step / total_steps` clamped to [0, 1].

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    Constant(f64),
    Linear {
        from: f64,
        to: f64,
    },
    /// Geometric interpolation `from * (to/from)^p`; requires `from` and
    /// `to` to share a sign and be non-zero, otherwise falls back to
    /// linear.
    Exponential {
        from: f64,
        to: f64,
    },
    Cosine {
        from: f64,
        to: f64,
        cycles: f64,
    },
    /// Linear baseline steered by run signals: low diversity or a long
    /// best-fitness plateau pushes the value back toward `from`.
    Adaptive {
        from: f64,
        to: f64,
        diversity_weight: f64,
        convergence_weight: f64,
    },
}

impl Schedule {
    pub fn value(&self, progress: f64) -> f64 {
        let p = progress.clamp(0.0, 1.0);
        match self {
            Schedule::Constant(v) => *v,
            Schedule::Linear { from, to } => from + (to - from) * p,
            Schedule::Exponential { from, to } => {
                if *from != 0.0 && from.signum() == to.signum() {
                    from * (to / from).powf(p)
                } else {
                    from + (to - from) * p
                }
            }
            Schedule::Cosine { from, to, cycles } => {
                to + 0.5 * (from - to) * (1.0 + (std::f64::consts::PI * p * cycles).cos())
            }
            Schedule::Adaptive { from, to, .. } => from + (to - from) * p,
        }
    }

    /// Like `value`, but the adaptive variant blends in run signals:
    /// `diversity` and `plateau` are normalized to [0, 1] by the caller
    /// (plateau = stalled steps / patience).
    pub fn value_with_signals(&self, progress: f64, diversity: f64, plateau: f64) -> f64 {
        match self {
            Schedule::Adaptive {
                from,
                to,
                diversity_weight,
                convergence_weight,
            } => {
                let base = self.value(progress);
                // starving diversity or a stuck best both argue for more
                // exploration, i.e. a value closer to `from`
                let pressure = (diversity_weight * (1.0 - diversity.clamp(0.0, 1.0))
                    + convergence_weight * plateau.clamp(0.0, 1.0))
                .clamp(0.0, 1.0);
                base + (from - base) * pressure
            }
            _ => self.value(progress),
        }
    }
}

/// Named schedule registry with the engine defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSet {
    curves: BTreeMap<String, Schedule>,
}

impl Default for ScheduleSet {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ScheduleSet {
    pub fn empty() -> Self {
        Self {
            curves: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut set = Self::empty();
        set.insert("mutation_rate", Schedule::Linear { from: 0.30, to: 0.045 });
        set.insert(
            "temperature",
            Schedule::Exponential {
                from: 1000.0,
                to: 0.1,
            },
        );
        set.insert("crossover_rate", Schedule::Linear { from: 0.80, to: 0.56 });
        set.insert(
            "softmax_temperature",
            Schedule::Exponential { from: 1.0, to: 0.1 },
        );
        set
    }

    /// Insert or replace a named curve.
    pub fn insert(&mut self, name: impl Into<String>, schedule: Schedule) {
        self.curves.insert(name.into(), schedule);
    }

    pub fn get(&self, name: &str) -> Option<&Schedule> {
        self.curves.get(name)
    }

    pub fn value(&self, name: &str, progress: f64) -> Option<f64> {
        self.curves.get(name).map(|s| s.value(progress))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.curves.keys().map(String::as_str)
    }
}
