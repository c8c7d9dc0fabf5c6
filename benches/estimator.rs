//! Benchmarks for the WoodEnergy estimator

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use woodenergy::{
    compute, LiveSnapshot, MachineProfile, ProductionConfig, SawmillLine, SpeciesCatalog,
};

fn generate_line(count: usize) -> Vec<MachineProfile> {
    (0..count)
        .map(|i| {
            MachineProfile::new(
                format!("machine-{}", i),
                10.0 + (i % 50) as f64,
                0.3 + (i % 7) as f64 * 0.1,
            )
            .with_off_peak(i % 5 == 0)
        })
        .collect()
}

fn bench_standard_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("standard_line");

    let profiles = SawmillLine::Standard.profiles();
    let catalog = SpeciesCatalog::default();
    let Ok(oak) = catalog.get("Oak") else {
        return;
    };
    let monthly = ProductionConfig::monthly_budget(oak.clone(), 1000.0);
    let rentability = ProductionConfig::species_rentability(oak.clone(), 500.0);
    let live = LiveSnapshot::new()
        .with_reading("Head saw", 78.0)
        .with_reading("Kiln", 104.0);

    group.bench_function("monthly_budget", |b| {
        b.iter(|| black_box(compute(&profiles, &monthly, None)))
    });

    group.bench_function("species_rentability_live", |b| {
        b.iter(|| black_box(compute(&profiles, &rentability, Some(&live))))
    });

    group.finish();
}

fn bench_large_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_line");

    let profiles = generate_line(1000);
    let catalog = SpeciesCatalog::default();
    let Ok(beech) = catalog.get("Beech") else {
        return;
    };
    let config = ProductionConfig::monthly_budget(beech.clone(), 1000.0);

    group.throughput(Throughput::Elements(1000));

    group.bench_function("compute_1000_machines", |b| {
        b.iter(|| black_box(compute(&profiles, &config, None)))
    });

    group.finish();
}

criterion_group!(benches, bench_standard_line, bench_large_line);
criterion_main!(benches);
