//! Solution quality: Pareto-front bookkeeping with quality indicators,
//! Monte-Carlo robustness analysis, and the regulatory compliance checker
//! with cited, bilingual violations.

pub mod compliance;
pub mod pareto;
pub mod penalty;
pub mod robustness;

pub use compliance::{ComplianceChecker, ComplianceReport, ComplianceStatus};
pub use pareto::{dominates, ParetoFront};
pub use penalty::CompliancePenaltyEvaluator;
pub use robustness::{RobustnessAnalyzer, RobustnessConfig, RobustnessGrade, RobustnessReport};
