use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use keyset_hashmap::{KeySet, KeySetMap};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

// Keys of up to `width` elements drawn from a pool of 4096 element strings,
// so rows accumulate many keys and resolution has real intersection work.
fn key(n: u64, width: usize) -> KeySet<String> {
    lcg(n)
        .map(|x| format!("e{:03x}", x % 4096))
        .take(width)
        .collect::<KeySet<String>>()
}

fn reversed(k: &KeySet<String>) -> KeySet<String> {
    let mut elems: Vec<String> = k.iter().cloned().collect();
    elems.reverse();
    elems.into_iter().collect()
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("keyset_map_insert_10k_w4", |b| {
        let keys: Vec<_> = (0..10_000u64).map(|i| key(i.wrapping_mul(3) + 1, 4)).collect();
        b.iter_batched(
            KeySetMap::<String, u64>::new,
            |mut m| {
                for (i, k) in keys.iter().enumerate() {
                    let _ = m.insert(k.clone(), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_get_hit(c: &mut Criterion) {
    c.bench_function("keyset_map_get_hit_permuted", |b| {
        let mut m = KeySetMap::<String, u64>::new();
        let keys: Vec<_> = (0..10_000u64).map(|i| key(i.wrapping_mul(7) + 5, 4)).collect();
        for (i, k) in keys.iter().enumerate() {
            let _ = m.insert(k.clone(), i as u64).unwrap();
        }
        // Query with a different spelling than the one inserted.
        let queries: Vec<_> = keys.iter().map(reversed).collect();
        let mut it = queries.iter().cycle();
        b.iter(|| {
            let q = it.next().unwrap();
            black_box(m.get(q));
        })
    });
}

fn bench_get_miss(c: &mut Criterion) {
    c.bench_function("keyset_map_get_miss", |b| {
        let mut m = KeySetMap::<String, u64>::new();
        for i in 0..10_000u64 {
            let _ = m.insert(key(i.wrapping_mul(11) + 3, 4), i).unwrap();
        }
        // Same element pool, fresh memberships: rows exist but no key matches.
        let mut miss = 0xdead_beefu64;
        b.iter(|| {
            miss = miss.wrapping_add(1);
            let q = key(miss, 5);
            black_box(m.get(&q));
        })
    });
}

fn bench_find_then_handle(c: &mut Criterion) {
    c.bench_function("keyset_map_handle_access", |b| {
        let mut m = KeySetMap::<String, u64>::new();
        let k = key(42, 4);
        let _ = m.insert(k.clone(), 1).unwrap();
        let h = m.find(&k).unwrap();
        b.iter(|| {
            // Resolution already paid; handle access is the fast path.
            black_box(h.value(&m));
        })
    });
}

fn bench_churn(c: &mut Criterion) {
    c.bench_function("keyset_map_churn_insert_remove", |b| {
        let keys: Vec<_> = (0..2_000u64).map(|i| key(i.wrapping_mul(13) + 9, 4)).collect();
        b.iter_batched(
            || {
                let mut m = KeySetMap::<String, u64>::new();
                for (i, k) in keys.iter().enumerate() {
                    let _ = m.insert(k.clone(), i as u64).unwrap();
                }
                m
            },
            |mut m| {
                for k in keys.iter().step_by(2) {
                    black_box(m.remove(k));
                }
                for (i, k) in keys.iter().enumerate().step_by(2) {
                    let _ = m.insert(k.clone(), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_insert, bench_get_hit, bench_get_miss, bench_find_then_handle, bench_churn
}
criterion_main!(benches);
