//! Constraint violation records emitted by the compliance checker and by
//! evaluator constraint reports. Violations are immutable once created and
//! aggregate into reports sorted most-severe first.

use serde::{Deserialize, Serialize};

/// Severity ladder. Ordering is most-severe-first so a plain sort on the
/// discriminant ranks reports the way reviewers read them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];
}

/// Pointer into the regulation a rule enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub document: String,
    pub article: String,
    #[serde(default)]
    pub clause: Option<String>,
    /// Exact regulation text the rule encodes.
    pub text: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Explanation in the two report languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    pub en: String,
    pub tr: String,
}

impl BilingualText {
    pub fn new(en: impl Into<String>, tr: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            tr: tr.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Rule identifier, e.g. `fire_separation`.
    pub rule: String,
    pub severity: Severity,
    /// Buildings involved; pairwise rules list both ids.
    pub buildings: Vec<String>,
    pub measured: f64,
    pub required: f64,
    pub unit: String,
    #[serde(default)]
    pub citation: Option<Citation>,
    pub explanation: BilingualText,
    #[serde(default)]
    pub remediation: Vec<String>,
}

impl ConstraintViolation {
    /// Severity-first ordering key; within a severity, larger shortfalls
    /// come first.
    pub fn sort_key(&self) -> (Severity, i64) {
        let shortfall = (self.required - self.measured).abs();
        (self.severity, -(shortfall * 1000.0) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(severity: Severity, measured: f64) -> ConstraintViolation {
        ConstraintViolation {
            rule: "min_distance".into(),
            severity,
            buildings: vec!["a".into(), "b".into()],
            measured,
            required: 30.0,
            unit: "m".into(),
            citation: None,
            explanation: BilingualText::new("too close", "cok yakin"),
            remediation: vec![],
        }
    }

    #[test]
    fn severity_orders_most_severe_first() {
        let mut v = vec![
            violation(Severity::Low, 29.0),
            violation(Severity::Critical, 5.0),
            violation(Severity::Medium, 20.0),
        ];
        v.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        assert_eq!(v[0].severity, Severity::Critical);
        assert_eq!(v[2].severity, Severity::Low);
    }

    #[test]
    fn within_severity_larger_shortfall_first() {
        let mut v = vec![violation(Severity::High, 28.0), violation(Severity::High, 10.0)];
        v.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        assert_eq!(v[0].measured, 10.0);
    }
}
