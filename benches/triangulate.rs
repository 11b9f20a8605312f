use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use trigon::{triangulate, Algorithm, Pslg, Settings};

fn random_pslg(n: usize) -> Pslg {
  let mut rng = SmallRng::seed_from_u64(42);
  let mut pslg = Pslg::new();
  for _ in 0..n {
    pslg.add_point(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0));
  }
  pslg
}

fn bench_constructors(c: &mut Criterion) {
  let mut group = c.benchmark_group("triangulate");
  for &n in &[100usize, 1_000, 10_000] {
    let pslg = random_pslg(n);
    for (name, algorithm) in [
      ("dwyer", Algorithm::Dwyer),
      ("incremental", Algorithm::Incremental),
    ] {
      let mut settings = Settings::default();
      settings.algorithm = algorithm;
      group.bench_with_input(BenchmarkId::new(name, n), &pslg, |b, pslg| {
        b.iter(|| triangulate(pslg, &settings).unwrap())
      });
    }
  }
  group.finish();
}

fn bench_refinement(c: &mut Criterion) {
  let mut pslg = Pslg::new();
  pslg.add_point(0.0, 0.0);
  pslg.add_point(100.0, 0.0);
  pslg.add_point(100.0, 100.0);
  pslg.add_point(0.0, 100.0);
  for i in 0..4 {
    pslg.add_segment(i, (i + 1) % 4, 1);
  }
  let mut settings = Settings::default();
  settings.poly = true;
  settings.quality = true;
  settings.max_area = 10.0;
  c.bench_function("refine_square", |b| {
    b.iter(|| triangulate(&pslg, &settings).unwrap())
  });
}

criterion_group!(benches, bench_constructors, bench_refinement);
criterion_main!(benches);
