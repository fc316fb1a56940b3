use conference_core::id_types::ParticipantId;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dashmap::DashMap;

fn bench_clone_string(c: &mut Criterion) {
    let s = "some-long-participant-id-string-1234567890".to_string();
    c.bench_function("clone_string", |b| {
        b.iter(|| {
            let _ = black_box(s.clone());
        })
    });
}

fn bench_clone_strong_id(c: &mut Criterion) {
    let id = ParticipantId::from("some-long-participant-id-string-1234567890");
    c.bench_function("clone_strong_id", |b| {
        b.iter(|| {
            let _ = black_box(id.clone());
        })
    });
}

fn bench_dashmap_insert_string(c: &mut Criterion) {
    let map = DashMap::new();
    let key = "some-long-participant-id-string-1234567890".to_string();

    c.bench_function("dashmap_insert_string", |b| {
        b.iter(|| {
            map.insert(key.clone(), 1);
        })
    });
}

fn bench_dashmap_insert_strong_id(c: &mut Criterion) {
    let map = DashMap::new();
    let key = ParticipantId::from("some-long-participant-id-string-1234567890");

    c.bench_function("dashmap_insert_strong_id", |b| {
        b.iter(|| {
            map.insert(key.clone(), 1);
        })
    });
}

criterion_group!(
    benches,
    bench_clone_string,
    bench_clone_strong_id,
    bench_dashmap_insert_string,
    bench_dashmap_insert_strong_id
);
criterion_main!(benches);
