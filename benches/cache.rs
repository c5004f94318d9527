use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tiersim::config::PolicyKind;
use tiersim::policy::{BlockStatus, CachePolicy, Policy};

const CAPACITY: usize = 1024;
const KEY_SPACE: u64 = 4096;

fn policy_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_put");
    for kind in [
        PolicyKind::Fifo,
        PolicyKind::Lru,
        PolicyKind::Lfu,
        PolicyKind::Arc,
    ] {
        group.bench_function(kind.to_string(), |b| {
            let mut cache = Policy::new(kind, CAPACITY);
            let mut key = 0u64;
            b.iter(|| {
                key = key.wrapping_mul(6364136223846793005).wrapping_add(1);
                black_box(cache.put(key % KEY_SPACE, BlockStatus::Clean));
            });
        });
    }
    group.finish();
}

fn policy_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy_get");
    for kind in [
        PolicyKind::Fifo,
        PolicyKind::Lru,
        PolicyKind::Lfu,
        PolicyKind::Arc,
    ] {
        group.bench_function(kind.to_string(), |b| {
            let mut cache = Policy::new(kind, CAPACITY);
            for key in 0..CAPACITY as u64 {
                cache.put(key, BlockStatus::Clean);
            }
            let mut key = 0u64;
            b.iter(|| {
                key = key.wrapping_add(7);
                black_box(cache.get(key % CAPACITY as u64));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, policy_put, policy_get);
criterion_main!(benches);
