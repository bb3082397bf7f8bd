use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tilecast_aggregate::{AggregationKey, AggregationValue, RollupEngine};
use tilecast_core::{tile_id_from_lat_long, Tile};

fn bench_geocode(c: &mut Criterion) {
    c.bench_function("tile_id_from_lat_long", |b| {
        b.iter(|| tile_id_from_lat_long(black_box(51.5074), black_box(-0.1278), black_box(15)));
    });

    let tile = Tile::from_lat_long(51.5074, -0.1278, 15).unwrap();
    c.bench_function("tile_ids_for_all_zoom_levels", |b| {
        b.iter(|| black_box(&tile).ids_for_all_zoom_levels());
    });
}

fn bench_rollup_buckets(c: &mut Criterion) {
    let engine = RollupEngine::default();
    let tile = tile_id_from_lat_long(33.31, 44.36, 15).unwrap();
    let key = AggregationKey::pair("twitter", "bridge", "flood", "alltime", &tile);
    let value = AggregationValue::new(4, 0.7);

    c.bench_function("rollup_buckets_for", |b| {
        b.iter(|| engine.buckets_for(black_box(&key), black_box(&value)));
    });
}

criterion_group!(benches, bench_geocode, bench_rollup_buckets);
criterion_main!(benches);
