use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use timeslide_vt::injection::populations::end_o3_ratesandpops;
use timeslide_vt::{
    calculate_astrophysical_volume, FlatLambdaCdm, RecoveredParameters, VolumeTimeIntegral,
    SECONDS_PER_YEAR,
};

fn bench_vt(c: &mut Criterion) {
    let cosmology = FlatLambdaCdm::planck15();
    let source = end_o3_ratesandpops(&cosmology).unwrap();
    let mut target = source.clone();
    target
        .insert("mass_1", timeslide_vt::Prior::power_law(-3.0, 5.0, 100.0))
        .unwrap();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let (rows, _) = source.sample_n(&mut rng, 2000).unwrap();
    let recovered = RecoveredParameters::from_rows(&rows).unwrap();

    let mut group = c.benchmark_group("vt");
    group.sample_size(20);
    group.bench_function("astrophysical_volume", |b| {
        let half = std::f64::consts::FRAC_PI_2;
        b.iter(|| {
            let v = calculate_astrophysical_volume(0.0, black_box(15_000.0), -half, half, &cosmology);
            black_box(v)
        });
    });

    let vt = VolumeTimeIntegral::new(source, recovered, 100_000, SECONDS_PER_YEAR, &cosmology)
        .unwrap();
    group.bench_function("reweighted_vt_2000", |b| {
        // Reweighting 2000 recovered rows to a steeper mass spectrum.
        b.iter(|| black_box(vt.calculate_vt(Some(&target))))
    });
    group.finish();
}

criterion_group!(benches, bench_vt);
criterion_main!(benches);
