//! Criterion benchmarks for the guarded-call path.
//!
//! Measures the full bridge bracket (guard entry, engine dispatch, fault
//! check) around small operations, the cost of a host-callback round trip
//! against the neutral no-handler path, and the status codec.
//!
//! Target: the guard bracket and a neutral callback lookup stay cheap
//! enough to disappear next to any real statement execution.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use questline_core::{
    Callback, CallbackTable, ScriptedEngine, Session, SessionConfig,
};

const BENCH_WORLD: &str = "\
= START
print The measuring room.
act Advance|SCORE = SCORE + 1
act Reset|SCORE = 0
";

/// A running session with `BENCH_WORLD` loaded and started.
fn started_session(callbacks: CallbackTable) -> Session {
    let mut session = Session::new(
        Box::new(ScriptedEngine::new()),
        callbacks,
        &SessionConfig::default(),
    );
    session
        .load_world_from_buffer(BENCH_WORLD.as_bytes(), "bench.ql")
        .unwrap();
    session.restart(false).unwrap();
    session
}

// ---------------------------------------------------------------------------
// Guard bracket around small statements
// ---------------------------------------------------------------------------

fn bench_guarded_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("guarded_call");

    group.bench_function("assignment", |b| {
        let mut session = started_session(CallbackTable::new());
        b.iter(|| black_box(session.exec_string("X = X + 1", false).is_ok()));
    });

    group.bench_function("print", |b| {
        let mut session = started_session(CallbackTable::new());
        b.iter(|| {
            session.exec_string("clear & print tick", false).unwrap();
        });
    });

    group.bench_function("selected_action", |b| {
        let mut session = started_session(CallbackTable::new());
        session.set_selected_action(0, false).unwrap();
        b.iter(|| {
            session.execute_selected_action(false).unwrap();
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Callback dispatch: registered handler vs neutral default
// ---------------------------------------------------------------------------

fn bench_callback_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("callback_dispatch");

    // `uptime` asks the host for a millisecond clock on every execution.
    group.bench_function("registered", |b| {
        let mut callbacks = CallbackTable::new();
        callbacks.register(Callback::GetMsCount(Box::new(|_| black_box(42))));
        let mut session = started_session(callbacks);
        b.iter(|| {
            session.exec_string("uptime T", false).unwrap();
        });
    });

    group.bench_function("neutral", |b| {
        let mut session = started_session(CallbackTable::new());
        b.iter(|| {
            session.exec_string("uptime T", false).unwrap();
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Status codec round trip
// ---------------------------------------------------------------------------

fn bench_status_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("status_codec");

    let mut session = started_session(CallbackTable::new());
    for i in 0..64 {
        session
            .exec_string(&format!("V{i} = {i} * 3"), false)
            .unwrap();
    }
    let blob = session.save_to_buffer().unwrap();

    group.bench_function("save", |b| {
        b.iter(|| black_box(session.save_to_buffer().unwrap().len()));
    });

    group.bench_function("load", |b| {
        b.iter(|| {
            session.load_from_buffer(black_box(&blob), false).unwrap();
        });
    });

    group.finish();
}

// ---------------------------------------------------------------------------
// Snapshot reads
// ---------------------------------------------------------------------------

fn bench_snapshot_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot_reads");

    let session = started_session(CallbackTable::new());

    group.bench_function("main_description", |b| {
        b.iter(|| black_box(session.snapshot().main_description().len()));
    });

    group.bench_function("actions", |b| {
        b.iter(|| black_box(session.snapshot().actions().len()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_guarded_call,
    bench_callback_dispatch,
    bench_status_codec,
    bench_snapshot_reads,
);
criterion_main!(benches);
