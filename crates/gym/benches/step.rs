use criterion::{criterion_group, criterion_main, Criterion};
use gym::{Env, FightConfig, FightEnv, HitCooldown, JointLimits, JointSpace};
use sim::MockSim;

fn bench_step(c: &mut Criterion) {
    let config = FightConfig { seed: Some(1), ..FightConfig::default() };
    let mut env = FightEnv::new(MockSim::new(), config).unwrap();
    env.reset().unwrap();
    let mut rng = fastrand::Rng::with_seed(1);
    let space = env.action_space();
    c.bench_function("fight_step_mock", |b| {
        b.iter(|| {
            let action = space.sample(&mut rng);
            env.step(&action).unwrap()
        });
    });
}

fn bench_pure(c: &mut Criterion) {
    let space = JointSpace::new(&JointLimits::ERGO_JR);
    let pose = [10.0, -20.0, 30.0, -40.0, 50.0, -60.0];
    c.bench_function("normalize_roundtrip", |b| {
        b.iter(|| space.denormalize(&space.normalize(criterion::black_box(&pose))));
    });

    let mut cooldown = HitCooldown::default();
    let mut rng = fastrand::Rng::with_seed(2);
    c.bench_function("hit_cooldown_observe", |b| {
        b.iter(|| cooldown.observe(rng.bool()));
    });
}

criterion_group!(benches, bench_step, bench_pure);
criterion_main!(benches);
