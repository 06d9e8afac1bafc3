//! Benchmark: bitmap codec, grant resolution and legacy key decryption.
//!
//! Encode and decode run once per login and per token check; the snapshot
//! width is the number of permissions in the system.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use proptest::strategy::{Strategy, ValueTree};
use proptest::test_runner::TestRunner;
use warrant_core::resolve::resolve;
use warrant_core::PermissionBitmap;
use warrant_keys::decrypt_private_key;
use warrant_testkit::generators::subject_grants;
use warrant_testkit::vectors::{encrypted_pems, PASSPHRASE};

fn names(width: usize) -> Vec<String> {
    (0..width).map(|i| format!("perm.{:05}", i)).collect()
}

fn bench_bitmap(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitmap");

    for width in [8usize, 64, 512, 4096] {
        let all = names(width);
        let bitmap = PermissionBitmap::create(&all, 0);
        let held: Vec<&str> = all.iter().step_by(3).map(String::as_str).collect();
        let bits = bitmap.encode(&held);

        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("encode", width), &width, |b, _| {
            b.iter(|| black_box(bitmap.encode(black_box(&all))));
        });
        group.bench_with_input(BenchmarkId::new("decode", width), &width, |b, _| {
            b.iter(|| black_box(bitmap.decode(black_box(&bits))));
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut runner = TestRunner::deterministic();
    let graphs: Vec<_> = (0..64)
        .filter_map(|_| subject_grants().new_tree(&mut runner).ok())
        .map(|tree| tree.current().1)
        .collect();

    c.bench_function("resolve/64_graphs", |b| {
        b.iter(|| {
            for graph in &graphs {
                black_box(resolve(black_box(graph)));
            }
        });
    });
}

fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt_private_key");
    for fixture in encrypted_pems() {
        group.bench_function(fixture.name, |b| {
            b.iter(|| black_box(decrypt_private_key(black_box(fixture.pem), Some(PASSPHRASE))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bitmap, bench_resolve, bench_decrypt);
criterion_main!(benches);
