//! Four single-storey buildings crowded into a 20x20 site: every pair
//! violates the fire-separation rule.

use core_config::ComplianceLimits;
use core_model::{Bounds, Building, BuildingKind, Point, Site, Solution};
use core_quality::{ComplianceChecker, ComplianceStatus};

#[test]
fn six_pairs_six_fire_violations() {
    let site = Site::new(Bounds::new(0.0, 0.0, 20.0, 20.0));
    let buildings: Vec<Building> = (0..4)
        .map(|i| Building::new(format!("b{i}"), BuildingKind::Residential, 100.0, 1))
        .collect();
    // all four within a 5 m cluster: every centroid pair is under 6 m
    let solution = Solution::from_pairs([
        ("b0", Point::new(8.0, 8.0)),
        ("b1", Point::new(11.0, 8.0)),
        ("b2", Point::new(8.0, 11.0)),
        ("b3", Point::new(11.0, 11.0)),
    ]);

    let checker = ComplianceChecker::new(ComplianceLimits::default(), 0.0);
    let report = checker.check(&solution, &site, &buildings);

    let fire: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.rule == "fire_separation")
        .collect();
    assert_eq!(fire.len(), 6, "one violation per pair");
    assert_eq!(report.status, ComplianceStatus::NonCompliantCritical);
    for v in &fire {
        assert!(v.measured < v.required);
        assert_eq!(v.buildings.len(), 2);
        assert!(v.citation.is_some());
        // bilingual explanations are populated
        assert!(!v.explanation.en.is_empty());
        assert!(!v.explanation.tr.is_empty());
    }
}

#[test]
fn report_is_idempotent_and_serializable() {
    let site = Site::new(Bounds::new(0.0, 0.0, 20.0, 20.0));
    let buildings = vec![
        Building::new("a", BuildingKind::Residential, 100.0, 1),
        Building::new("b", BuildingKind::Residential, 100.0, 1),
    ];
    let solution = Solution::from_pairs([
        ("a", Point::new(9.0, 10.0)),
        ("b", Point::new(12.0, 10.0)),
    ]);
    let checker = ComplianceChecker::new(ComplianceLimits::default(), 0.0);
    let first = checker.check(&solution, &site, &buildings);
    let second = checker.check(&solution, &site, &buildings);
    assert_eq!(first, second);

    let json = serde_json::to_string(&first).unwrap();
    let back: core_quality::ComplianceReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back, first);
}
