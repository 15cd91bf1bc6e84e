use codspeed_criterion_compat::{Criterion, black_box, criterion_group, criterion_main};
use lazylist::adapter::IterSource;
use lazylist::{Bindings, LazyList, ListBuilder};
use num_bigint::BigUint;
use num_traits::One;

// ============================================================================
// Access Benchmarks
// ============================================================================

fn bench_index_fresh(c: &mut Criterion) {
    c.bench_function("get 10k from fresh naturals", |b| {
        b.iter(|| black_box(LazyList::count_from(0u64).get(10_000)))
    });
}

fn bench_index_cached(c: &mut Criterion) {
    let n = LazyList::count_from(0u64);
    n.get(10_000);
    c.bench_function("get 10k from forced naturals", |b| {
        b.iter(|| black_box(n.get(black_box(10_000))))
    });
}

fn bench_take(c: &mut Criterion) {
    c.bench_function("take 1000 squares", |b| {
        b.iter(|| black_box(LazyList::tabulate(0u64, |i| i * i).take(1000)))
    });
}

// ============================================================================
// Recursive Sequence Benchmarks
// ============================================================================

fn bench_fibonacci(c: &mut Criterion) {
    c.bench_function("fibonacci 500 (bigint)", |b| {
        b.iter(|| {
            let fib = LazyList::recursive(|me| {
                LazyList::from_values_then(vec![BigUint::one(), BigUint::one()], move || {
                    let f = me.list();
                    f.zip_with(&f.tail(), |a, b| a + b)
                })
            });
            // Walk forward first so head forcing never recurses deeply
            fib.each(Some(500), |_| {});
            black_box(fib.get(500))
        })
    });
}

fn bench_hamming(c: &mut Criterion) {
    c.bench_function("hamming 2000", |b| {
        b.iter(|| {
            let h: LazyList<u64> = LazyList::recursive(|me| {
                LazyList::cons_with(1, move || {
                    let h = me.list();
                    h.map(|x| x * 2).merge(&h.map(|x| x * 3)).merge(&h.map(|x| x * 5))
                })
            });
            black_box(h.get(2000))
        })
    });
}

// ============================================================================
// Combinator Benchmarks
// ============================================================================

fn bench_merge(c: &mut Criterion) {
    c.bench_function("merge evens and odds 5000", |b| {
        b.iter(|| {
            let n = LazyList::count_from(0u64);
            let merged = n.select(|x| x % 2 == 0).merge(&n.select(|x| x % 2 == 1));
            black_box(merged.take(5000))
        })
    });
}

fn bench_product(c: &mut Criterion) {
    c.bench_function("product of naturals 2000", |b| {
        b.iter(|| {
            let n = LazyList::count_from(0u32);
            black_box(n.product(&n).take(2000))
        })
    });
}

fn bench_comprehension(c: &mut Criterion) {
    c.bench_function("comprehension 20x20x20", |b| {
        b.iter(|| {
            let l = ListBuilder::comprehended(|v: &Bindings<u32>| v["a"] + v["b"] + v["c"])
                .bind("a", 0..20u32)
                .bind("b", 0..20u32)
                .bind("c", 0..20u32)
                .filter(|v| v["a"] < v["b"])
                .build()
                .unwrap();
            black_box(l.len())
        })
    });
}

// ============================================================================
// Adapter Benchmarks
// ============================================================================

fn bench_adapters(c: &mut Criterion) {
    let mut group = c.benchmark_group("adapters");
    group.bench_function("cooperative 1000", |b| {
        b.iter(|| black_box(LazyList::from_iterator(0..1000u32).len()))
    });
    group.bench_function("handshake 1000", |b| {
        b.iter(|| black_box(LazyList::from_push(IterSource(0..1000u32)).len()))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_index_fresh,
    bench_index_cached,
    bench_take,
    bench_fibonacci,
    bench_hamming,
    bench_merge,
    bench_product,
    bench_comprehension,
    bench_adapters,
);
criterion_main!(benches);
