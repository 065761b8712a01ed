//! Field assembly and sampling. The field is precomputed on a regular grid
//! of cell centers; arbitrary-point sampling bilinearly interpolates the
//! three free tensor components.

use std::collections::BTreeMap;

use core_model::{Building, BuildingKind, Point, Site, Solution, Vec2};
use tracing::debug;

use crate::basis::Basis;
use crate::tensor::Tensor2;
use crate::FieldError;

/// Background grid-basis weight (dominant site orientation).
const BACKGROUND_WEIGHT: f64 = 0.3;
/// Per-gateway grid-basis weight.
const GATEWAY_WEIGHT: f64 = 0.5;
/// Building influence radius factor over sqrt(area).
const BUILDING_RADIUS_FACTOR: f64 = 1.5;
/// Importance weights are clamped to this range so no building dominates.
const IMPORTANCE_RANGE: (f64, f64) = (0.2, 1.5);

/// Per-kind radial-basis weights. The default table comes from
/// `BuildingKind::default_importance`; replacements are clamped.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportanceTable(BTreeMap<BuildingKind, f64>);

impl Default for ImportanceTable {
    fn default() -> Self {
        Self(
            BuildingKind::ALL
                .iter()
                .map(|k| (*k, k.default_importance()))
                .collect(),
        )
    }
}

impl ImportanceTable {
    pub fn get(&self, kind: BuildingKind) -> f64 {
        self.0
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_importance())
    }

    pub fn set(&mut self, kind: BuildingKind, weight: f64) {
        self.0
            .insert(kind, weight.clamp(IMPORTANCE_RANGE.0, IMPORTANCE_RANGE.1));
    }
}

pub struct TensorField {
    bounds: core_model::Bounds,
    resolution: f64,
    nx: usize,
    ny: usize,
    cells: Vec<Tensor2>,
}

impl TensorField {
    /// Precompute the superposed field of `bases` over `bounds` at the
    /// given resolution (metres per cell).
    pub fn from_bases(bounds: core_model::Bounds, resolution: f64, bases: &[Basis]) -> Self {
        let resolution = resolution.max(0.5);
        let nx = (bounds.width() / resolution).ceil().max(1.0) as usize;
        let ny = (bounds.height() / resolution).ceil().max(1.0) as usize;
        let mut cells = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                let p = Point::new(
                    bounds.x_min + (i as f64 + 0.5) * resolution,
                    bounds.y_min + (j as f64 + 0.5) * resolution,
                );
                let mut t = Tensor2::ZERO;
                for basis in bases {
                    t = t.add(&basis.tensor_at(&p));
                }
                cells.push(t);
            }
        }
        debug!(target: "field", nx, ny, bases = bases.len(), "field_assembled");
        Self {
            bounds,
            resolution,
            nx,
            ny,
            cells,
        }
    }

    /// Campus assembly: background orientation basis, one radial basis per
    /// placed building (influence ~ sqrt(area), weight by importance), one
    /// grid basis per gateway along its bearing.
    pub fn campus(
        site: &Site,
        solution: &Solution,
        buildings: &[Building],
        importance: &ImportanceTable,
        resolution: f64,
    ) -> Self {
        let bounds = site.bounds;
        let diagonal = (bounds.width().powi(2) + bounds.height().powi(2)).sqrt();
        let mut bases = Vec::with_capacity(buildings.len() + site.gateways.len() + 1);
        bases.push(Basis::grid(
            bounds.center(),
            site.dominant_orientation(),
            diagonal,
            BACKGROUND_WEIGHT,
        ));
        for b in buildings {
            if let Some(p) = solution.position(&b.id).copied().or(b.position) {
                bases.push(Basis::radial(
                    p,
                    (b.area.sqrt() * BUILDING_RADIUS_FACTOR).max(resolution),
                    importance.get(b.kind),
                ));
            }
        }
        for g in &site.gateways {
            bases.push(Basis::grid(
                g.position,
                g.bearing,
                diagonal / 2.0,
                GATEWAY_WEIGHT,
            ));
        }
        Self::from_bases(bounds, resolution, &bases)
    }

    pub fn bounds(&self) -> &core_model::Bounds {
        &self.bounds
    }

    /// Stored tensor at grid cell `(i, j)`.
    pub fn cell(&self, i: usize, j: usize) -> Tensor2 {
        self.cells[j * self.nx + i]
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Center of grid cell `(i, j)`.
    pub fn cell_center(&self, i: usize, j: usize) -> Point {
        Point::new(
            self.bounds.x_min + (i as f64 + 0.5) * self.resolution,
            self.bounds.y_min + (j as f64 + 0.5) * self.resolution,
        )
    }

    /// Bilinear sample of the three components at `p`. Outside the bounds
    /// the field is undefined.
    pub fn sample(&self, p: &Point) -> Result<Tensor2, FieldError> {
        if !self.bounds.contains(p) {
            return Err(FieldError::OutOfBounds { x: p.x, y: p.y });
        }
        // fractional cell-center coordinates
        let gx = (p.x - self.bounds.x_min) / self.resolution - 0.5;
        let gy = (p.y - self.bounds.y_min) / self.resolution - 0.5;
        let i0 = gx.floor().clamp(0.0, (self.nx - 1) as f64) as usize;
        let j0 = gy.floor().clamp(0.0, (self.ny - 1) as f64) as usize;
        let i1 = (i0 + 1).min(self.nx - 1);
        let j1 = (j0 + 1).min(self.ny - 1);
        let fx = (gx - i0 as f64).clamp(0.0, 1.0);
        let fy = (gy - j0 as f64).clamp(0.0, 1.0);

        let t00 = self.cell(i0, j0);
        let t10 = self.cell(i1, j0);
        let t01 = self.cell(i0, j1);
        let t11 = self.cell(i1, j1);
        let lerp = |a: f64, b: f64, t: f64| a + (b - a) * t;
        let bilerp = |c00: f64, c10: f64, c01: f64, c11: f64| {
            lerp(lerp(c00, c10, fx), lerp(c01, c11, fx), fy)
        };
        Ok(Tensor2 {
            xx: bilerp(t00.xx, t10.xx, t01.xx, t11.xx),
            yy: bilerp(t00.yy, t10.yy, t01.yy, t11.yy),
            xy: bilerp(t00.xy, t10.xy, t01.xy, t11.xy),
        })
    }

    /// Principal direction at `p`, sign-aligned with `prev` when given so
    /// consecutive samples do not flip.
    pub fn principal_direction(
        &self,
        p: &Point,
        prev: Option<Vec2>,
    ) -> Result<Vec2, FieldError> {
        let tensor = self.sample(p)?;
        let eigen = tensor
            .eigen()
            .ok_or(FieldError::Singularity { x: p.x, y: p.y })?;
        let mut dir = eigen.major;
        if let Some(prev) = prev {
            if dir.dot(&prev) < 0.0 {
                dir = dir.neg();
            }
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{Bounds, Gateway, GatewayKind};

    fn uniform_field() -> TensorField {
        let bases = [Basis::grid(Point::new(50.0, 50.0), 0.0, 1e6, 1.0)];
        TensorField::from_bases(Bounds::new(0.0, 0.0, 100.0, 100.0), 10.0, &bases)
    }

    #[test]
    fn sample_at_cell_centers_matches_stored_values() {
        let site = Site::new(Bounds::new(0.0, 0.0, 100.0, 100.0));
        let solution = Solution::from_pairs([("a", Point::new(30.0, 40.0))]);
        let buildings = [Building::new("a", BuildingKind::Library, 900.0, 1)];
        let field = TensorField::campus(
            &site,
            &solution,
            &buildings,
            &ImportanceTable::default(),
            10.0,
        );
        let (nx, ny) = field.grid_size();
        for j in 0..ny {
            for i in 0..nx {
                let center = field.cell_center(i, j);
                let sampled = field.sample(&center).unwrap();
                let stored = field.cell(i, j);
                assert!((sampled.xx - stored.xx).abs() < 1e-9);
                assert!((sampled.yy - stored.yy).abs() < 1e-9);
                assert!((sampled.xy - stored.xy).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn out_of_bounds_sampling_is_an_error() {
        let field = uniform_field();
        assert!(matches!(
            field.sample(&Point::new(150.0, 50.0)),
            Err(FieldError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn uniform_grid_field_points_along_x() {
        let field = uniform_field();
        let dir = field
            .principal_direction(&Point::new(42.0, 57.0), None)
            .unwrap();
        assert!(dir.x.abs() > 0.999, "{dir:?}");
    }

    #[test]
    fn direction_continuity_prevents_sign_flips() {
        let field = uniform_field();
        let prev = Vec2::new(-1.0, 0.0);
        let dir = field
            .principal_direction(&Point::new(42.0, 57.0), Some(prev))
            .unwrap();
        assert!(dir.dot(&prev) > 0.0);
    }

    #[test]
    fn gateway_basis_dominates_near_gateway() {
        let mut site = Site::new(Bounds::new(0.0, 0.0, 200.0, 200.0));
        site.gateways.push(Gateway {
            id: "north".into(),
            position: Point::new(100.0, 200.0),
            bearing: std::f64::consts::FRAC_PI_2,
            kind: GatewayKind::Main,
            clearance: 10.0,
        });
        let field = TensorField::campus(
            &site,
            &Solution::default(),
            &[],
            &ImportanceTable::default(),
            5.0,
        );
        // near the gateway the field should align with the bearing (+y)
        let dir = field
            .principal_direction(&Point::new(100.0, 190.0), None)
            .unwrap();
        assert!(dir.y.abs() > 0.9, "{dir:?}");
    }

    #[test]
    fn importance_table_is_clamped() {
        let mut table = ImportanceTable::default();
        table.set(BuildingKind::Sports, 99.0);
        assert_eq!(table.get(BuildingKind::Sports), 1.5);
        table.set(BuildingKind::Sports, 0.0);
        assert_eq!(table.get(BuildingKind::Sports), 0.2);
    }
}
