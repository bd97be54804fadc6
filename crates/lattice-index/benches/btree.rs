use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lattice_common::{RowId, Value};
use lattice_index::BPlusTree;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn populated_tree(size: i64) -> BPlusTree {
    let mut tree = BPlusTree::new();
    for key in 0..size {
        tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree_insert");
    for size in [1_000i64, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let mut tree = BPlusTree::new();
                for key in 0..size {
                    tree.insert(Value::int(key), RowId::new(key as u64)).unwrap();
                }
                black_box(tree.len())
            });
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let tree = populated_tree(10_000);
    let mut rng = StdRng::seed_from_u64(7);
    c.bench_function("btree_search_10k", |b| {
        b.iter(|| {
            let key = Value::int(rng.gen_range(0..10_000));
            black_box(tree.search(&key).unwrap())
        });
    });
}

fn bench_range(c: &mut Criterion) {
    let tree = populated_tree(10_000);
    let mut rng = StdRng::seed_from_u64(11);
    c.bench_function("btree_range_100_of_10k", |b| {
        b.iter(|| {
            let low = rng.gen_range(0..9_900);
            let hits = tree
                .range_query(&Value::int(low), &Value::int(low + 99))
                .unwrap();
            black_box(hits.len())
        });
    });
}

criterion_group!(benches, bench_insert, bench_search, bench_range);
criterion_main!(benches);
