use criterion::{criterion_group, criterion_main, Criterion};

use core_field::{ImportanceTable, SegmentIndex, StreamlineTracer, TensorField, TracerConfig};
use core_model::{Bounds, Building, BuildingKind, Gateway, GatewayKind, Point, Site, Solution};

fn campus_field() -> TensorField {
    let mut site = Site::new(Bounds::new(0.0, 0.0, 500.0, 500.0));
    site.gateways.push(Gateway {
        id: "west".into(),
        position: Point::new(0.0, 250.0),
        bearing: 0.0,
        kind: GatewayKind::Main,
        clearance: 15.0,
    });
    site.gateways.push(Gateway {
        id: "east".into(),
        position: Point::new(500.0, 250.0),
        bearing: std::f64::consts::PI,
        kind: GatewayKind::Secondary,
        clearance: 15.0,
    });
    let buildings: Vec<Building> = (0..8)
        .map(|i| Building::new(format!("b{i}"), BuildingKind::Educational, 2000.0, 3))
        .collect();
    let solution = Solution::from_pairs(buildings.iter().enumerate().map(|(i, b)| {
        let angle = i as f64 / 8.0 * std::f64::consts::TAU;
        (
            b.id.clone(),
            Point::new(250.0 + 120.0 * angle.cos(), 250.0 + 120.0 * angle.sin()),
        )
    }));
    TensorField::campus(
        &site,
        &solution,
        &buildings,
        &ImportanceTable::default(),
        10.0,
    )
}

fn bench_trace(c: &mut Criterion) {
    let field = campus_field();
    let config = TracerConfig {
        tol: 1e-3,
        min_step: 1.0,
        max_step: 20.0,
        max_length: 500.0,
        max_curvature: 0.15,
        proximity_radius: 8.0,
    };
    c.bench_function("streamline_bidirectional", |b| {
        b.iter(|| {
            let tracer = StreamlineTracer::new(&field, config);
            let index = SegmentIndex::new(8.0);
            std::hint::black_box(tracer.trace_bidirectional(Point::new(120.0, 250.0), None, &index))
        })
    });
    c.bench_function("field_assembly", |b| {
        b.iter(|| std::hint::black_box(campus_field()))
    });
}

criterion_group!(benches, bench_trace);
criterion_main!(benches);
