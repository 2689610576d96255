//! Performance benchmarks for nav_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nav_core::cache::TileCache;
use nav_core::crop::crop_by_angle;
use nav_core::geodesy::{airline_properties, haversine_distance, Point};
use nav_core::rotation::crop_rotated;
use nav_core::stitch::build_working_tile;
use nav_core::test_helpers::{fake_map, test_cache_config, FakeDownloader, TEST_LAT_DEG, TEST_LON_DEG};
use nav_core::tile_source::DebugTileSource;

fn bench_geodesy(c: &mut Criterion) {
    let jena = Point::new(TEST_LAT_DEG, TEST_LON_DEG);
    let sydney = Point::new(-33.87, 151.21);

    let mut group = c.benchmark_group("geodesy");
    group.bench_function("haversine", |b| {
        b.iter(|| black_box(haversine_distance(black_box(jena), black_box(sydney))))
    });
    group.bench_function("airline_properties", |b| {
        b.iter(|| black_box(airline_properties(black_box(jena), black_box(sydney))))
    });
    group.finish();
}

fn bench_stitching(c: &mut Criterion) {
    let viewports = vec![("320x240", 320, 240), ("800x480", 800, 480), ("1920x1080", 1920, 1080)];

    let mut group = c.benchmark_group("stitch_working_tile");
    for (name, width, height) in viewports {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(width, height),
            |b, &(width, height)| {
                let mut cache =
                    TileCache::new(Box::new(DebugTileSource::new(256)), test_cache_config(256));
                b.iter(|| {
                    black_box(
                        build_working_tile(&mut cache, TEST_LAT_DEG, TEST_LON_DEG, 18, width, height)
                            .expect("stitched"),
                    )
                });
            },
        );
    }
    group.finish();
}

fn bench_cropping(c: &mut Criterion) {
    let mut cache = TileCache::new(Box::new(DebugTileSource::new(256)), test_cache_config(256));
    let working = build_working_tile(&mut cache, TEST_LAT_DEG, TEST_LON_DEG, 18, 1000, 1000)
        .expect("stitched");

    let mut group = c.benchmark_group("crop");
    group.bench_function("straight_480x272", |b| {
        b.iter(|| black_box(crop_by_angle(&working, TEST_LAT_DEG, TEST_LON_DEG, 480, 272)))
    });
    for heading_deg in [30.0_f64, 90.0, 225.0] {
        group.bench_with_input(
            BenchmarkId::new("rotated_480x272", heading_deg),
            &heading_deg,
            |b, &heading_deg| {
                b.iter(|| {
                    black_box(crop_rotated(
                        &working,
                        TEST_LAT_DEG,
                        TEST_LON_DEG,
                        480,
                        272,
                        heading_deg.to_radians(),
                    ))
                })
            },
        );
    }
    group.finish();
}

fn bench_map_tick(c: &mut Criterion) {
    let mut map = fake_map(FakeDownloader::new(256));
    let mut heading_deg = 0.0_f64;
    c.bench_function("map_tick_rotated_480x272", |b| {
        b.iter(|| {
            heading_deg = (heading_deg + 7.0) % 360.0;
            black_box(map.get_rotated_cropped_tile(
                TEST_LAT_DEG,
                TEST_LON_DEG,
                480,
                272,
                heading_deg.to_radians(),
            ))
        })
    });
}

criterion_group!(benches, bench_geodesy, bench_stitching, bench_cropping, bench_map_tick);
criterion_main!(benches);
