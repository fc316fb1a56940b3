use std::sync::Arc;

use conference_core::coordinator::RoomCoordinator;
use conference_core::facade::InMemoryFacade;
use conference_core::id_types::{generate_participant_id, RoomId};
use conference_core::room::{Participant, RoomRegistry};
use criterion::{criterion_group, criterion_main, Criterion};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

fn make_participant(room_id: &str) -> Arc<Participant> {
    let (tx, rx) = mpsc::unbounded_channel();
    // Keep the receiver alive for the duration of the benchmark iteration
    // so sends don't immediately fail and get counted as drops.
    std::mem::forget(rx);
    Arc::new(Participant::new(
        generate_participant_id(),
        RoomId::from(room_id),
        tx,
    ))
}

// 1. Benchmark room fan-out: snapshotting a room's member list, the step
// every PRODUCE/LEAVE/NICKNAME_CHANGE notification pays before sending.
fn bench_room_snapshot(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("room_fanout");

    for member_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            criterion::BenchmarkId::new("snapshot_members", member_count),
            member_count,
            |b, &count| {
                let registry = RoomRegistry::new();
                let room = registry.get_or_create(&RoomId::from("bench-room"));
                rt.block_on(async {
                    for _ in 0..count {
                        room.attach(make_participant("bench-room")).await;
                    }
                });

                b.to_async(&rt).iter(|| {
                    let room = room.clone();
                    async move {
                        let members = room.snapshot_members().await;
                        criterion::black_box(members.len());
                    }
                })
            },
        );
    }

    group.finish();
}

// 2. Benchmark the room registry's concurrent map access (DashMap), the
// state-operation hot path for JOIN and LEAVE.
fn bench_room_registry(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("room_registry");

    group.bench_function("attach_detach_cycle", |b| {
        let registry = RoomRegistry::new();
        let room = registry.get_or_create(&RoomId::from("bench-room"));

        b.to_async(&rt).iter(|| {
            let room = room.clone();
            async move {
                let participant = make_participant("bench-room");
                room.attach(participant.clone()).await;
                room.detach(&participant.id).await;
            }
        })
    });

    group.bench_function("get_or_create_existing", |b| {
        let registry = RoomRegistry::new();
        registry.get_or_create(&RoomId::from("bench-room"));

        b.iter(|| {
            let room = registry.get_or_create(&RoomId::from("bench-room"));
            criterion::black_box(room);
        })
    });

    group.finish();
}

// 3. Benchmark the full JOIN handshake against the in-memory facade: the
// pair of round trips every client pays once at connection time.
fn bench_join_handshake(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("join_handshake");

    group.bench_function("two_phase_join", |b| {
        b.to_async(&rt).iter(|| async {
            let coordinator = RoomCoordinator::new(
                Arc::new(RoomRegistry::new()),
                Arc::new(InMemoryFacade::new()),
            );
            let participant = make_participant("bench-room");

            coordinator
                .dispatch(&participant, r#"{"type":"join","roomId":"bench-room"}"#)
                .await;
            coordinator
                .dispatch(
                    &participant,
                    r#"{"type":"join","roomId":"bench-room","rtpCapabilities":{}}"#,
                )
                .await;
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_room_snapshot,
    bench_room_registry,
    bench_join_handshake
);
criterion_main!(benches);
