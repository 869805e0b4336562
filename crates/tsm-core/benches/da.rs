use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use tsm_core::{
    deferred_acceptance, random_path_to_stability, RandomSource, RawPref, SeededRng,
    StrictProfile, TrialOptions,
};

fn random_market(agents: usize, seed: u64) -> StrictProfile {
    let mut rng = SeededRng::new(seed);
    let proposer_names: Vec<String> = (0..agents).map(|i| format!("p{i}")).collect();
    let receiver_names: Vec<String> = (0..agents).map(|i| format!("r{i}")).collect();
    let mut side = |own: &[String], other: &[String]| -> Vec<(String, RawPref)> {
        own.iter()
            .map(|name| {
                let mut prefs: Vec<&str> = other.iter().map(String::as_str).collect();
                rng.shuffle(&mut prefs);
                (name.clone(), RawPref::list(prefs))
            })
            .collect()
    };
    let proposers = side(&proposer_names, &receiver_names);
    let receivers = side(&receiver_names, &proposer_names);
    StrictProfile::new(proposers, receivers).unwrap()
}

fn bench_deferred_acceptance(c: &mut Criterion) {
    let mut group = c.benchmark_group("deferred_acceptance");
    for &size in &[16usize, 64, 128, 256] {
        let profile = random_market(size, 17);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| deferred_acceptance(&profile));
        });
    }
    group.finish();
}

fn bench_random_path_to_stability(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_path_to_stability");
    for &size in &[8usize, 16, 32] {
        let profile = random_market(size, 23);
        let opts = TrialOptions::default();
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| random_path_to_stability(&profile, 10, &opts));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_deferred_acceptance, bench_random_path_to_stability);
criterion_main!(benches);
