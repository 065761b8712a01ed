//! Solver configuration: typed records for every tunable the engine
//! recognises, plus TOML file discovery and loading.
//!
//! Every field carries a serde default so a partial `siteplan.toml` (or a
//! partial `ProblemSpec` JSON section) parses cleanly; unknown fields are
//! ignored to allow forward evolution without warnings. Defaults live in
//! `const fn` helpers next to each struct so the same values back both
//! `Default` impls and serde.
//!
//! Precedence: a config file supplies baseline values, the `ProblemSpec`
//! sections override them. Merging is whole-section (a spec that carries an
//! `sa` section replaces the file's `sa` section entirely).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::info;

/// Simulated-annealing phase parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SaConfig {
    /// Number of independent Metropolis chains run in parallel workers.
    pub num_chains: usize,
    /// Iterations per chain.
    pub chain_iterations: usize,
    pub initial_temp: f64,
    pub final_temp: f64,
    /// Geometric cooling factor applied once per iteration.
    pub cooling_rate: f64,
    /// Early-stop patience in iterations; `None` means `chain_iterations / 4`.
    pub stall_patience: Option<usize>,
}

impl SaConfig {
    const fn default_num_chains() -> usize {
        4
    }
    const fn default_chain_iterations() -> usize {
        500
    }

    /// Patience actually applied by the explorer.
    pub fn effective_stall_patience(&self) -> usize {
        self.stall_patience
            .unwrap_or((self.chain_iterations / 4).max(1))
    }
}

impl Default for SaConfig {
    fn default() -> Self {
        Self {
            num_chains: Self::default_num_chains(),
            chain_iterations: Self::default_chain_iterations(),
            initial_temp: 1000.0,
            final_temp: 0.1,
            cooling_rate: 0.95,
            stall_patience: None,
        }
    }
}

/// Genetic-refinement phase parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GaConfig {
    pub population_size: usize,
    pub generations: usize,
    /// Initial crossover rate; scheduled down over the run.
    pub crossover_rate: f64,
    /// Initial per-child mutation rate; scheduled down over the run.
    pub mutation_rate: f64,
    pub elite_size: usize,
    pub tournament_size: usize,
    /// Early-stop patience in generations; `None` means `generations / 4`.
    pub stall_patience: Option<usize>,
}

impl GaConfig {
    pub fn effective_stall_patience(&self) -> usize {
        self.stall_patience.unwrap_or((self.generations / 4).max(1))
    }
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            generations: 50,
            crossover_rate: 0.80,
            mutation_rate: 0.30,
            elite_size: 5,
            tournament_size: 3,
            stall_patience: None,
        }
    }
}

/// Strategy used by the adaptive operator selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveStrategy {
    Uniform,
    Greedy,
    #[default]
    AdaptivePursuit,
    Ucb,
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// When false the selector uses a fixed uniform mix regardless of strategy.
    pub enabled: bool,
    pub strategy: AdaptiveStrategy,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: AdaptiveStrategy::default(),
        }
    }
}

/// Streamline tracer and road composition parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoadConfig {
    /// Target number of major-road seeds (gateways are used first).
    pub n_major_roads: usize,
    /// Maximum arc length per streamline, metres.
    pub max_length: f64,
    /// Integrator step bounds, metres.
    pub min_step: f64,
    pub max_step: f64,
    /// Local error tolerance for the adaptive RK step.
    pub tol: f64,
    /// Termination curvature, radians per metre.
    pub max_curvature: f64,
    /// Stop when this close to an already emitted road, metres.
    pub proximity_radius: f64,
    /// Ramer-Douglas-Peucker tolerance, metres.
    pub simplify_epsilon: f64,
    /// Tensor field grid resolution, metres per cell.
    pub field_resolution: f64,
}

impl Default for RoadConfig {
    fn default() -> Self {
        Self {
            n_major_roads: 4,
            max_length: 500.0,
            min_step: 1.0,
            max_step: 20.0,
            tol: 1e-3,
            max_curvature: 0.15,
            proximity_radius: 8.0,
            simplify_epsilon: 2.0,
            field_resolution: 10.0,
        }
    }
}

/// Regulatory thresholds used by the compliance checker. Values are the
/// campus-domain defaults; any of them can be overridden per problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComplianceLimits {
    /// Minimum pairwise centroid distance, metres.
    pub min_distance: f64,
    /// Fire-separation floor, metres; the effective requirement per pair is
    /// `max(fire_separation_min, max_pair_height / 2)`.
    pub fire_separation_min: f64,
    pub max_coverage_ratio: f64,
    pub max_far: f64,
    pub min_green_ratio: f64,
    /// Maximum building height, metres.
    pub max_height: f64,
    /// Storey height used to derive building height from floor count.
    pub floor_height: f64,
    pub front_setback: f64,
    pub side_setback: f64,
}

impl Default for ComplianceLimits {
    fn default() -> Self {
        Self {
            min_distance: 30.0,
            fire_separation_min: 6.0,
            max_coverage_ratio: 0.3,
            max_far: 1.5,
            min_green_ratio: 0.3,
            max_height: 30.0,
            floor_height: 3.5,
            front_setback: 5.0,
            side_setback: 3.0,
        }
    }
}

/// Quality-engine parameters (robustness analysis + compliance limits).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub robustness_samples: usize,
    /// Perturbation strength in [0, 1]; position noise is `strength * 10` m.
    pub robustness_strength: f64,
    /// Robustness is costly (`samples` re-evaluations); off unless asked for.
    pub assess_robustness: bool,
    pub compliance: ComplianceLimits,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            robustness_samples: 100,
            robustness_strength: 0.1,
            assess_robustness: false,
            compliance: ComplianceLimits::default(),
        }
    }
}

/// Root of `siteplan.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigFile {
    pub sa: SaConfig,
    pub ga: GaConfig,
    pub adaptive: AdaptiveConfig,
    pub road: RoadConfig,
    pub quality: QualityConfig,
}

/// Loaded configuration plus provenance.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Original file contents when a file was found.
    pub raw: Option<String>,
    pub file: ConfigFile,
}

/// Best-effort config path following platform conventions: a local
/// `siteplan.toml` wins, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("siteplan.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("siteplan").join("siteplan.toml");
    }
    PathBuf::from("siteplan.toml")
}

/// Load configuration from `path` (or the discovered location). A missing
/// file yields defaults; a present-but-malformed file is an error so typos
/// do not silently fall back.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let file = toml::from_str::<ConfigFile>(&content)
                .with_context(|| format!("parsing config file {}", path.display()))?;
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config {
                raw: Some(content),
                file,
            })
        }
        Err(_) => {
            info!(target: "config", path = %path.display(), "config_defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let sa = SaConfig::default();
        assert_eq!(sa.num_chains, 4);
        assert_eq!(sa.chain_iterations, 500);
        assert_eq!(sa.effective_stall_patience(), 125);

        let ga = GaConfig::default();
        assert_eq!(ga.population_size, 50);
        assert_eq!(ga.elite_size, 5);
        assert_eq!(ga.tournament_size, 3);

        let road = RoadConfig::default();
        assert_eq!(road.max_length, 500.0);
        assert_eq!(road.proximity_radius, 8.0);

        let limits = ComplianceLimits::default();
        assert_eq!(limits.min_distance, 30.0);
        assert_eq!(limits.max_height, 30.0);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[sa]\nnum_chains = 1\nchain_iterations = 50").unwrap();
        writeln!(f, "[adaptive]\nstrategy = \"ucb\"").unwrap();
        let cfg = load_from(Some(f.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.sa.num_chains, 1);
        assert_eq!(cfg.file.sa.chain_iterations, 50);
        // untouched sections keep defaults
        assert_eq!(cfg.file.ga.population_size, 50);
        assert_eq!(cfg.file.adaptive.strategy, AdaptiveStrategy::Ucb);
        assert!(cfg.file.adaptive.enabled);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = load_from(Some(PathBuf::from("/nonexistent/siteplan.toml"))).unwrap();
        assert!(cfg.raw.is_none());
        assert_eq!(cfg.file, ConfigFile::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "[sa]\nnum_chains = \"four\"").unwrap();
        assert!(load_from(Some(f.path().to_path_buf())).is_err());
    }

    #[test]
    fn stall_patience_override_wins() {
        let sa = SaConfig {
            stall_patience: Some(7),
            ..SaConfig::default()
        };
        assert_eq!(sa.effective_stall_patience(), 7);
        let ga = GaConfig {
            generations: 2,
            ..GaConfig::default()
        };
        assert_eq!(ga.effective_stall_patience(), 1);
    }
}
