use criterion::{criterion_group, criterion_main, Criterion};

use gridtown::procgen::buildings::FootprintLibrary;
use gridtown::procgen::{generate_city, CityGenConfig};

fn full_generation(c: &mut Criterion) {
    let config = CityGenConfig::default();
    let library = FootprintLibrary::default();
    let mut group = c.benchmark_group("generation");
    group.sample_size(10);
    group.bench_function("default_city", |b| {
        b.iter(|| generate_city(&config, &library).unwrap())
    });
    group.finish();
}

criterion_group!(benches, full_generation);
criterion_main!(benches);
