//! Regulatory compliance checking. Each rule measures the layout against a
//! threshold from `ComplianceLimits`, cites the regulation it encodes, and
//! explains the finding in English and Turkish. The checker is pure: the
//! same solution always yields the same report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use core_config::ComplianceLimits;
use core_model::{
    BilingualText, Building, Citation, ConstraintViolation, Point, Severity, Site, Solution,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    FullyCompliant,
    NonCompliantLow,
    NonCompliantHigh,
    NonCompliantCritical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub status: ComplianceStatus,
    /// Violation count per severity.
    pub counts: BTreeMap<Severity, usize>,
    /// Sorted most-severe first.
    pub violations: Vec<ConstraintViolation>,
}

impl ComplianceReport {
    pub fn is_compliant(&self) -> bool {
        self.status == ComplianceStatus::FullyCompliant
    }
}

pub struct ComplianceChecker {
    limits: ComplianceLimits,
    boundary_margin: f64,
}

impl ComplianceChecker {
    pub fn new(limits: ComplianceLimits, boundary_margin: f64) -> Self {
        Self {
            limits,
            boundary_margin,
        }
    }

    /// Run the full rule set over the placed buildings.
    pub fn check(&self, solution: &Solution, site: &Site, buildings: &[Building]) -> ComplianceReport {
        let placed: Vec<(&Building, Point)> = buildings
            .iter()
            .filter_map(|b| {
                solution
                    .position(&b.id)
                    .copied()
                    .or(b.position)
                    .map(|p| (b, p))
            })
            .collect();

        let mut violations = Vec::new();
        self.check_pairwise(&placed, &mut violations);
        self.check_site_boundary(&placed, site, &mut violations);
        self.check_gateway_clearance(&placed, site, &mut violations);
        self.check_ratios(buildings, site, &mut violations);
        self.check_heights(buildings, &mut violations);
        self.check_setbacks(&placed, site, &mut violations);

        violations.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
        for v in &violations {
            *counts.entry(v.severity).or_default() += 1;
        }
        let status = status_of(&counts);
        debug!(
            target: "quality.compliance",
            violations = violations.len(),
            ?status,
            "compliance_checked"
        );
        ComplianceReport {
            status,
            counts,
            violations,
        }
    }

    fn check_pairwise(
        &self,
        placed: &[(&Building, Point)],
        violations: &mut Vec<ConstraintViolation>,
    ) {
        for i in 0..placed.len() {
            for j in (i + 1)..placed.len() {
                let (a, pa) = placed[i];
                let (b, pb) = placed[j];
                let distance = pa.distance(&pb);

                let min_required = [
                    a.constraints.and_then(|c| c.min_distance),
                    b.constraints.and_then(|c| c.min_distance),
                    Some(self.limits.min_distance),
                ]
                .into_iter()
                .flatten()
                .fold(0.0f64, f64::max);
                if distance < min_required {
                    violations.push(ConstraintViolation {
                        rule: "min_distance".into(),
                        severity: Severity::Medium,
                        buildings: vec![a.id.clone(), b.id.clone()],
                        measured: distance,
                        required: min_required,
                        unit: "m".into(),
                        citation: Some(imar_citation(
                            "Madde 21",
                            "Binalar arasinda birakilacak asgari mesafeler parsel ve yapi duzenine gore belirlenir.",
                        )),
                        explanation: BilingualText::new(
                            format!(
                                "Buildings `{}` and `{}` are {distance:.1} m apart; at least {min_required:.1} m is required.",
                                a.id, b.id
                            ),
                            format!(
                                "`{}` ve `{}` yapilari arasindaki mesafe {distance:.1} m; en az {min_required:.1} m olmalidir.",
                                a.id, b.id
                            ),
                        ),
                        remediation: vec![format!(
                            "Move `{}` or `{}` at least {:.1} m apart",
                            a.id,
                            b.id,
                            min_required - distance
                        )],
                    });
                }

                let taller = a
                    .height(self.limits.floor_height)
                    .max(b.height(self.limits.floor_height));
                let fire_required = self.limits.fire_separation_min.max(taller / 2.0);
                if distance < fire_required {
                    violations.push(ConstraintViolation {
                        rule: "fire_separation".into(),
                        severity: Severity::Critical,
                        buildings: vec![a.id.clone(), b.id.clone()],
                        measured: distance,
                        required: fire_required,
                        unit: "m".into(),
                        citation: Some(Citation {
                            document: "Binalarin Yangindan Korunmasi Hakkinda Yonetmelik".into(),
                            article: "Madde 22".into(),
                            clause: None,
                            text: "Bitisik olmayan binalar arasinda yangin guvenlik mesafesi birakilmasi zorunludur."
                                .into(),
                            url: None,
                        }),
                        explanation: BilingualText::new(
                            format!(
                                "Fire separation between `{}` and `{}` is {distance:.1} m; {fire_required:.1} m is required.",
                                a.id, b.id
                            ),
                            format!(
                                "`{}` ve `{}` arasindaki yangin guvenlik mesafesi {distance:.1} m; {fire_required:.1} m gereklidir.",
                                a.id, b.id
                            ),
                        ),
                        remediation: vec![
                            format!("Increase the gap between `{}` and `{}`", a.id, b.id),
                            "Reduce floor counts to lower the required separation".into(),
                        ],
                    });
                }
            }
        }
    }

    fn check_site_boundary(
        &self,
        placed: &[(&Building, Point)],
        site: &Site,
        violations: &mut Vec<ConstraintViolation>,
    ) {
        for (b, p) in placed {
            let edge_distance = site.bounds.edge_distance(p);
            let inside_ring = match &site.boundary {
                Some(poly) if poly.len() >= 3 => poly.contains(p),
                _ => true,
            };
            if edge_distance < self.boundary_margin || !inside_ring {
                violations.push(ConstraintViolation {
                    rule: "site_boundary".into(),
                    severity: Severity::High,
                    buildings: vec![b.id.clone()],
                    measured: edge_distance,
                    required: self.boundary_margin,
                    unit: "m".into(),
                    citation: Some(imar_citation(
                        "Madde 5",
                        "Yapilar parsel sinirlari icinde kalmak zorundadir.",
                    )),
                    explanation: BilingualText::new(
                        format!(
                            "Building `{}` sits {edge_distance:.1} m from the site edge; the margin is {:.1} m.",
                            b.id, self.boundary_margin
                        ),
                        format!(
                            "`{}` yapisi parsel sinirina {edge_distance:.1} m mesafede; sinir payi {:.1} m olmalidir.",
                            b.id, self.boundary_margin
                        ),
                    ),
                    remediation: vec![format!("Move `{}` inward", b.id)],
                });
            }
        }
    }

    fn check_gateway_clearance(
        &self,
        placed: &[(&Building, Point)],
        site: &Site,
        violations: &mut Vec<ConstraintViolation>,
    ) {
        for gateway in &site.gateways {
            for (b, p) in placed {
                let distance = gateway.position.distance(p);
                if distance < gateway.clearance {
                    violations.push(ConstraintViolation {
                        rule: "gateway_clearance".into(),
                        severity: Severity::High,
                        buildings: vec![b.id.clone()],
                        measured: distance,
                        required: gateway.clearance,
                        unit: "m".into(),
                        citation: Some(imar_citation(
                            "Madde 26",
                            "Tasit ve yaya girisleri onunde gerekli manevra alanlari bos birakilir.",
                        )),
                        explanation: BilingualText::new(
                            format!(
                                "Building `{}` is {distance:.1} m from gateway `{}`; clearance is {:.1} m.",
                                b.id, gateway.id, gateway.clearance
                            ),
                            format!(
                                "`{}` yapisi `{}` girisine {distance:.1} m mesafede; en az {:.1} m bos birakilmalidir.",
                                b.id, gateway.id, gateway.clearance
                            ),
                        ),
                        remediation: vec![format!(
                            "Move `{}` outside the clearance of gateway `{}`",
                            b.id, gateway.id
                        )],
                    });
                }
            }
        }
    }

    fn check_ratios(
        &self,
        buildings: &[Building],
        site: &Site,
        violations: &mut Vec<ConstraintViolation>,
    ) {
        let site_area = site.area();
        if site_area <= 0.0 {
            return;
        }
        let all_ids: Vec<String> = buildings.iter().map(|b| b.id.clone()).collect();
        let footprint_total: f64 = buildings.iter().map(Building::footprint).sum();
        let floor_area_total: f64 = buildings.iter().map(|b| b.area).sum();

        let coverage = footprint_total / site_area;
        if coverage > self.limits.max_coverage_ratio {
            violations.push(ConstraintViolation {
                rule: "coverage_ratio".into(),
                severity: Severity::High,
                buildings: all_ids.clone(),
                measured: coverage,
                required: self.limits.max_coverage_ratio,
                unit: "ratio".into(),
                citation: Some(imar_citation(
                    "Madde 5/1-t",
                    "Taban alani katsayisi (TAKS), parsel uzerinde yapilabilecek taban alaninin parsel alanina oranidir.",
                )),
                explanation: BilingualText::new(
                    format!(
                        "Site coverage is {:.2}; the maximum is {:.2}.",
                        coverage, self.limits.max_coverage_ratio
                    ),
                    format!(
                        "Taban alani katsayisi {:.2}; en fazla {:.2} olabilir.",
                        coverage, self.limits.max_coverage_ratio
                    ),
                ),
                remediation: vec!["Reduce footprints or add floors".into()],
            });
        }

        let far = floor_area_total / site_area;
        if far > self.limits.max_far {
            violations.push(ConstraintViolation {
                rule: "far".into(),
                severity: Severity::High,
                buildings: all_ids.clone(),
                measured: far,
                required: self.limits.max_far,
                unit: "ratio".into(),
                citation: Some(imar_citation(
                    "Madde 5/1-ggg",
                    "Yapi insaat alaninin parsel alanina orani emsal (KAKS) degerini asamaz.",
                )),
                explanation: BilingualText::new(
                    format!("Floor-area ratio is {:.2}; the maximum is {:.2}.", far, self.limits.max_far),
                    format!("Emsal degeri {:.2}; en fazla {:.2} olabilir.", far, self.limits.max_far),
                ),
                remediation: vec!["Reduce total floor area".into()],
            });
        }

        let green = (site_area - footprint_total) / site_area;
        if green < self.limits.min_green_ratio {
            violations.push(ConstraintViolation {
                rule: "green_space".into(),
                severity: Severity::Medium,
                buildings: all_ids,
                measured: green,
                required: self.limits.min_green_ratio,
                unit: "ratio".into(),
                citation: Some(Citation {
                    document: "Mekansal Planlar Yapim Yonetmeligi".into(),
                    article: "Madde 12".into(),
                    clause: None,
                    text: "Planlarda asgari yesil alan standartlarinin karsilanmasi esastir.".into(),
                    url: None,
                }),
                explanation: BilingualText::new(
                    format!(
                        "Green-space ratio is {:.2}; at least {:.2} is required.",
                        green, self.limits.min_green_ratio
                    ),
                    format!(
                        "Yesil alan orani {:.2}; en az {:.2} olmalidir.",
                        green, self.limits.min_green_ratio
                    ),
                ),
                remediation: vec!["Reduce footprints to free up open space".into()],
            });
        }
    }

    fn check_heights(&self, buildings: &[Building], violations: &mut Vec<ConstraintViolation>) {
        for b in buildings {
            let height = b.height(self.limits.floor_height);
            if height > self.limits.max_height {
                violations.push(ConstraintViolation {
                    rule: "building_height".into(),
                    severity: Severity::High,
                    buildings: vec![b.id.clone()],
                    measured: height,
                    required: self.limits.max_height,
                    unit: "m".into(),
                    citation: Some(imar_citation(
                        "Madde 28",
                        "Bina yukseklikleri plan ve yonetmelikte belirlenen azami degerleri asamaz.",
                    )),
                    explanation: BilingualText::new(
                        format!(
                            "Building `{}` is {height:.1} m tall ({} floors); the maximum is {:.1} m.",
                            b.id, b.floors, self.limits.max_height
                        ),
                        format!(
                            "`{}` yapisinin yuksekligi {height:.1} m ({} kat); en fazla {:.1} m olabilir.",
                            b.id, b.floors, self.limits.max_height
                        ),
                    ),
                    remediation: vec![format!("Reduce `{}` to at most {} floors", b.id, (self.limits.max_height / self.limits.floor_height) as u32)],
                });
            }
        }
    }

    /// The bounds edge nearest the main gateway is the front; it takes the
    /// front setback, the remaining edges take the side setback.
    fn check_setbacks(
        &self,
        placed: &[(&Building, Point)],
        site: &Site,
        violations: &mut Vec<ConstraintViolation>,
    ) {
        let bounds = &site.bounds;
        let front_edge = site.main_gateway().map(|g| {
            let edges = [
                (g.position.x - bounds.x_min).abs(),
                (bounds.x_max - g.position.x).abs(),
                (g.position.y - bounds.y_min).abs(),
                (bounds.y_max - g.position.y).abs(),
            ];
            edges
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(i, _)| i)
                .unwrap_or(0)
        });
        for (b, p) in placed {
            let side_required = b
                .constraints
                .and_then(|c| c.setback)
                .unwrap_or(self.limits.side_setback);
            let distances = [
                p.x - bounds.x_min,
                bounds.x_max - p.x,
                p.y - bounds.y_min,
                bounds.y_max - p.y,
            ];
            for (edge, distance) in distances.iter().enumerate() {
                let (required, label_en, label_tr) = if Some(edge) == front_edge {
                    (
                        b.constraints
                            .and_then(|c| c.setback)
                            .unwrap_or(self.limits.front_setback),
                        "front",
                        "on",
                    )
                } else {
                    (side_required, "side", "yan")
                };
                if *distance < required {
                    violations.push(ConstraintViolation {
                        rule: "setbacks".into(),
                        severity: Severity::Medium,
                        buildings: vec![b.id.clone()],
                        measured: *distance,
                        required,
                        unit: "m".into(),
                        citation: Some(imar_citation(
                            "Madde 23",
                            "Yapilarin on, yan ve arka bahce mesafeleri yonetmelikte belirtilen degerlerden az olamaz.",
                        )),
                        explanation: BilingualText::new(
                            format!(
                                "Building `{}` keeps {distance:.1} m {label_en} setback; {required:.1} m is required.",
                                b.id
                            ),
                            format!(
                                "`{}` yapisinin {label_tr} bahce mesafesi {distance:.1} m; en az {required:.1} m olmalidir.",
                                b.id
                            ),
                        ),
                        remediation: vec![format!("Shift `{}` away from the boundary", b.id)],
                    });
                }
            }
        }
    }
}

fn imar_citation(article: &str, text: &str) -> Citation {
    Citation {
        document: "Planli Alanlar Imar Yonetmeligi".into(),
        article: article.into(),
        clause: None,
        text: text.into(),
        url: Some("https://www.mevzuat.gov.tr/mevzuat?MevzuatNo=23722".into()),
    }
}

fn status_of(counts: &BTreeMap<Severity, usize>) -> ComplianceStatus {
    let have = |s: Severity| counts.get(&s).copied().unwrap_or(0) > 0;
    if have(Severity::Critical) {
        ComplianceStatus::NonCompliantCritical
    } else if have(Severity::High) {
        ComplianceStatus::NonCompliantHigh
    } else if have(Severity::Medium) || have(Severity::Low) {
        ComplianceStatus::NonCompliantLow
    } else {
        ComplianceStatus::FullyCompliant
    }
}
