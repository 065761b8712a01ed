//! Named operator construction. The registry maps `(family, name)` to a
//! factory closure producing an operator instance from a parameter record;
//! embedders can register custom operators at runtime, duplicates within a
//! family are refused.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::crossover::Crossover;
use crate::mutation::Mutation;
use crate::perturbation::Perturbation;
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperatorFamily {
    Perturbation,
    Mutation,
    Crossover,
    Selection,
}

impl std::fmt::Display for OperatorFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OperatorFamily::Perturbation => "perturbation",
            OperatorFamily::Mutation => "mutation",
            OperatorFamily::Crossover => "crossover",
            OperatorFamily::Selection => "selection",
        };
        f.write_str(s)
    }
}

/// Flat numeric parameter record handed to factories. Missing keys fall
/// back to the factory's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperatorParams(pub BTreeMap<String, f64>);

impl OperatorParams {
    pub fn with(mut self, key: impl Into<String>, value: f64) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn get_or(&self, key: &str, default: f64) -> f64 {
        self.0.get(key).copied().unwrap_or(default)
    }
}

/// A constructed operator of any family.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorKind {
    Perturbation(Perturbation),
    Mutation(Mutation),
    Crossover(Crossover),
    Selection(Selection),
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("operator `{name}` already registered in family {family}")]
    Duplicate {
        family: OperatorFamily,
        name: String,
    },
    #[error("unknown operator `{name}` in family {family}")]
    Unknown {
        family: OperatorFamily,
        name: String,
    },
    #[error("operator `{name}` does not belong to family {family}")]
    FamilyMismatch {
        family: OperatorFamily,
        name: String,
    },
}

/// Factory closure producing an operator instance from a parameter record.
pub type Factory = Arc<dyn Fn(&OperatorParams) -> OperatorKind + Send + Sync>;

pub struct OperatorRegistry {
    factories: BTreeMap<(OperatorFamily, String), Factory>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl OperatorRegistry {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// All built-in operators under their canonical names.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        let entries: Vec<(OperatorFamily, &str, Factory)> = vec![
            (
                OperatorFamily::Perturbation,
                "gaussian",
                Arc::new(|p: &OperatorParams| {
                    OperatorKind::Perturbation(Perturbation::Gaussian {
                        min_sigma: p.get_or("min_sigma", 1.0),
                        scale_factor: p.get_or("scale_factor", 0.5),
                    })
                }),
            ),
            (
                OperatorFamily::Perturbation,
                "swap",
                Arc::new(|_: &OperatorParams| OperatorKind::Perturbation(Perturbation::Swap)),
            ),
            (
                OperatorFamily::Perturbation,
                "random_reset",
                Arc::new(|_: &OperatorParams| {
                    OperatorKind::Perturbation(Perturbation::RandomReset)
                }),
            ),
            (
                OperatorFamily::Mutation,
                "gaussian",
                Arc::new(|p: &OperatorParams| {
                    OperatorKind::Mutation(Mutation::Gaussian {
                        sigma: p.get_or("sigma", 10.0),
                    })
                }),
            ),
            (
                OperatorFamily::Mutation,
                "swap",
                Arc::new(|_: &OperatorParams| OperatorKind::Mutation(Mutation::Swap)),
            ),
            (
                OperatorFamily::Mutation,
                "random_reset",
                Arc::new(|_: &OperatorParams| OperatorKind::Mutation(Mutation::RandomReset)),
            ),
            (
                OperatorFamily::Crossover,
                "uniform",
                Arc::new(|p: &OperatorParams| {
                    OperatorKind::Crossover(Crossover::Uniform {
                        swap_probability: p.get_or("swap_probability", 0.5),
                    })
                }),
            ),
            (
                OperatorFamily::Crossover,
                "pmx",
                Arc::new(|p: &OperatorParams| {
                    OperatorKind::Crossover(Crossover::PartiallyMatched {
                        segments: p.get_or("segments", 2.0).max(1.0) as usize,
                    })
                }),
            ),
            (
                OperatorFamily::Selection,
                "tournament",
                Arc::new(|p: &OperatorParams| {
                    OperatorKind::Selection(Selection::Tournament {
                        size: p.get_or("size", 3.0).max(1.0) as usize,
                    })
                }),
            ),
            (
                OperatorFamily::Selection,
                "roulette",
                Arc::new(|p: &OperatorParams| {
                    OperatorKind::Selection(Selection::RouletteWheel {
                        scale: p.get_or("scale", 1.0),
                    })
                }),
            ),
        ];
        for (family, name, factory) in entries {
            reg.register(family, name, factory)
                .expect("built-in names are unique");
        }
        reg
    }

    pub fn register(
        &mut self,
        family: OperatorFamily,
        name: impl Into<String>,
        factory: Factory,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let key = (family, name.clone());
        if self.factories.contains_key(&key) {
            return Err(RegistryError::Duplicate { family, name });
        }
        tracing::debug!(target: "operators", %family, name = key.1.as_str(), "operator_registered");
        self.factories.insert(key, factory);
        Ok(())
    }

    pub fn create(
        &self,
        family: OperatorFamily,
        name: &str,
        params: &OperatorParams,
    ) -> Result<OperatorKind, RegistryError> {
        self.factories
            .get(&(family, name.to_string()))
            .map(|f| f(params))
            .ok_or_else(|| RegistryError::Unknown {
                family,
                name: name.to_string(),
            })
    }

    /// Names registered in a family, sorted.
    pub fn names(&self, family: OperatorFamily) -> Vec<String> {
        self.factories
            .keys()
            .filter(|(f, _)| *f == family)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn create_perturbation(
        &self,
        name: &str,
        params: &OperatorParams,
    ) -> Result<Perturbation, RegistryError> {
        match self.create(OperatorFamily::Perturbation, name, params)? {
            OperatorKind::Perturbation(op) => Ok(op),
            _ => Err(RegistryError::FamilyMismatch {
                family: OperatorFamily::Perturbation,
                name: name.to_string(),
            }),
        }
    }

    pub fn create_mutation(
        &self,
        name: &str,
        params: &OperatorParams,
    ) -> Result<Mutation, RegistryError> {
        match self.create(OperatorFamily::Mutation, name, params)? {
            OperatorKind::Mutation(op) => Ok(op),
            _ => Err(RegistryError::FamilyMismatch {
                family: OperatorFamily::Mutation,
                name: name.to_string(),
            }),
        }
    }

    pub fn create_crossover(
        &self,
        name: &str,
        params: &OperatorParams,
    ) -> Result<Crossover, RegistryError> {
        match self.create(OperatorFamily::Crossover, name, params)? {
            OperatorKind::Crossover(op) => Ok(op),
            _ => Err(RegistryError::FamilyMismatch {
                family: OperatorFamily::Crossover,
                name: name.to_string(),
            }),
        }
    }
}
