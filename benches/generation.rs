//! Benchmarks for city generation and scene compilation.
//!
//! Run with: cargo bench --bench generation

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cityscape::procgen::blocks::split;
use cityscape::procgen::generate_city;
use cityscape::render::instancing::compile;
use cityscape::render::primitives::PrimitiveRegistry;
use cityscape::render::shaders::ShaderRegistry;
use cityscape::simulation::traffic::TrafficConfig;
use cityscape::world::CityGenConfig;

fn benchmark_block_split(c: &mut Criterion) {
    let config = CityGenConfig::default();

    c.bench_function("block_split_1000x1000", |b| {
        let mut seed = 0u64;
        b.iter(|| {
            seed = seed.wrapping_add(1);
            let mut rng = StdRng::seed_from_u64(seed);
            black_box(split(config.bounds(), config.initial_lanes, &[], &mut rng))
        });
    });
}

fn benchmark_full_generation(c: &mut Criterion) {
    let config = CityGenConfig::default();
    let traffic = TrafficConfig::default();

    let mut group = c.benchmark_group("city_generation");
    group.sample_size(20);
    group.bench_function("default_city", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(42);
            black_box(generate_city(&config, &traffic, &mut rng))
        });
    });
    group.finish();
}

fn benchmark_compile(c: &mut Criterion) {
    let city = generate_city(
        &CityGenConfig::default(),
        &TrafficConfig::default(),
        &mut StdRng::seed_from_u64(42),
    );
    let primitives = PrimitiveRegistry::default();
    let shaders = ShaderRegistry::default();

    let mut group = c.benchmark_group("scene_compile");
    group.throughput(Throughput::Elements(
        (city.placeholders.len() + city.cars.len() * 3) as u64,
    ));
    group.bench_function("default_city", |b| {
        b.iter(|| {
            black_box(compile(&city.placeholders, &city.cars, &primitives, &shaders))
        });
    });
    group.finish();
}

fn benchmark_car_update(c: &mut Criterion) {
    let mut cars = generate_city(
        &CityGenConfig::default(),
        &TrafficConfig::default(),
        &mut StdRng::seed_from_u64(42),
    )
    .cars;

    c.bench_function("car_update_frame", |b| {
        b.iter(|| {
            for car in cars.iter_mut() {
                car.update(black_box(1.0 / 60.0));
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_block_split,
    benchmark_full_generation,
    benchmark_compile,
    benchmark_car_update,
);
criterion_main!(benches);
