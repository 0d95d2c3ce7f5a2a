use criterion::{black_box, criterion_group, criterion_main, Criterion};
use zone_geometry::{crossing_corridor, point_in_polygon, Line, Point};

fn bench_point_in_polygon(c: &mut Criterion) {
    let poly = vec![
        Point::new(0.0, 0.0),
        Point::new(1920.0, 0.0),
        Point::new(1920.0, 1080.0),
        Point::new(0.0, 1080.0),
    ];
    c.bench_function("point_in_polygon", |b| {
        b.iter(|| point_in_polygon(black_box(960.0), black_box(540.0), black_box(&poly)))
    });
}

fn bench_crossing_corridor(c: &mut Criterion) {
    let line = Line::from_coords(200.0, 700.0, 1700.0, 720.0);
    c.bench_function("crossing_corridor", |b| {
        b.iter(|| crossing_corridor(black_box(900.0), black_box(708.0), black_box(&line), 0.015))
    });
}

criterion_group!(benches, bench_point_in_polygon, bench_crossing_corridor);
criterion_main!(benches);
