//! Throughput Benchmark for RedKV
//!
//! Measures the storage engine, the command executor and the RESP codec
//! under various workloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use redkv::commands::CommandHandler;
use redkv::protocol::{decode_command, Command, RespValue};
use redkv::storage::{ListEnd, SetOptions, StorageEngine, Value};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Value::string("small_value"), None);
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = Bytes::from("x".repeat(64 * 1024));
        b.iter(|| {
            let key = Bytes::from(format!("key:{}", i));
            engine.set(key, Value::String(value.clone()), None);
            i += 1;
        });
    });

    group.bench_function("set_nx_with_ttl", |b| {
        let mut i = 0u64;
        let options = SetOptions {
            ttl: Some(Duration::from_secs(3600)),
            ..SetOptions::default()
        };
        b.iter(|| {
            let key = Bytes::from(format!("ttl:{}", i % 10_000));
            black_box(engine.set_with(key, Bytes::from("value"), &options).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..100_000 {
        let key = Bytes::from(format!("key:{}", i));
        engine.set(key, Value::string(format!("value:{}", i)), None);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(engine.get_string(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(engine.get_string(key.as_bytes()).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark INCR operations
fn bench_incr(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("incr");
    group.throughput(Throughput::Elements(1));

    // High contention
    group.bench_function("single_counter", |b| {
        let key = Bytes::from("counter");
        b.iter(|| {
            black_box(engine.incr_by(&key, 1).unwrap());
        });
    });

    group.bench_function("multiple_counters", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = Bytes::from(format!("counter:{}", i % 1000));
            black_box(engine.incr_by(&key, 1).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark container types
fn bench_collections(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    let mut group = c.benchmark_group("collections");
    group.throughput(Throughput::Elements(1));

    group.bench_function("rpush_lpop", |b| {
        let key = Bytes::from("queue");
        b.iter(|| {
            engine
                .push(&key, vec![Bytes::from("job")], ListEnd::Right)
                .unwrap();
            black_box(engine.pop(&key, ListEnd::Left).unwrap());
        });
    });

    group.bench_function("hset", |b| {
        let key = Bytes::from("user:1");
        let mut i = 0u64;
        b.iter(|| {
            let field = Bytes::from(format!("field:{}", i % 100));
            black_box(engine.hset(&key, vec![(field, Bytes::from("v"))]).unwrap());
            i += 1;
        });
    });

    group.bench_function("sadd", |b| {
        let key = Bytes::from("tags");
        let mut i = 0u64;
        b.iter(|| {
            let member = Bytes::from(format!("tag:{}", i % 100));
            black_box(engine.sadd(&key, vec![member]).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let engine = Arc::new(StorageEngine::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let engine = Arc::clone(&engine);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = Bytes::from(format!("key:{}:{}", t, i));
                            engine.set(key.clone(), Value::string("value"), None);
                            let _ = engine.get_string(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(engine.len());
        });
    });

    group.finish();
}

/// Benchmark KEYS pattern matching
fn bench_keys(c: &mut Criterion) {
    let engine = Arc::new(StorageEngine::new());

    for i in 0..1_000 {
        engine.set(Bytes::from(format!("user:{}", i)), Value::string("user_data"), None);
        engine.set(
            Bytes::from(format!("session:{}", i)),
            Value::string("session_data"),
            None,
        );
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_pattern", |b| {
        b.iter(|| black_box(engine.keys(b"user:*")));
    });

    group.bench_function("keys_all", |b| {
        b.iter(|| black_box(engine.keys(b"*")));
    });

    group.finish();
}

/// Benchmark the wire codec and full command execution
fn bench_codec(c: &mut Criterion) {
    let handler = CommandHandler::new(Arc::new(StorageEngine::new()));
    let frame = Command::from_parts(&["SET", "key:1", "value"])
        .unwrap()
        .to_resp()
        .serialize();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(frame.len() as u64));

    group.bench_function("decode_set", |b| {
        b.iter(|| black_box(decode_command(black_box(&frame)).unwrap()));
    });

    group.bench_function("serialize_array", |b| {
        let reply = RespValue::array(
            (0..16)
                .map(|i| RespValue::bulk_string(format!("member:{}", i)))
                .collect(),
        );
        b.iter(|| black_box(reply.serialize()));
    });

    group.bench_function("decode_and_execute", |b| {
        b.iter(|| {
            let (command, _) = decode_command(&frame).unwrap().unwrap();
            black_box(handler.execute(command));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_incr,
    bench_collections,
    bench_concurrent,
    bench_keys,
    bench_codec,
);

criterion_main!(benches);
