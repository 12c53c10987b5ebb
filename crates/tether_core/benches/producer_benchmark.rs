//! # Producer Benchmark
//!
//! ARCHITECT'S CHALLENGE: Prove the driver never waits.
//!
//! This benchmark measures:
//! 1. `report_status` with nobody draining
//! 2. `report_message` across payload sizes, including truncation
//! 3. `report_status` while a consumer thread drains continuously
//!
//! Target: a report costs one uncontended lock plus a bounded copy.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tether_core::{EventAggregator, EventConsumer, EventHandler, MessageSnapshot, Status};

/// Benchmark status reports with no consumer attached
fn bench_status_no_consumer(c: &mut Criterion) {
    let agg = EventAggregator::new(1024);
    let mut i = 0i32;

    c.bench_function("report_status_no_consumer", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            agg.report_status(black_box(Status(i)));
        });
    });
}

/// Benchmark message reports across payload sizes
fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("report_message");
    let capacity = 1024;
    let agg = EventAggregator::new(capacity);

    for size in [16usize, 256, 1024, 4096] {
        let payload = vec![b'm'; size];
        group.throughput(Throughput::Bytes(size.min(capacity) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| agg.report_message(black_box(payload)));
        });
    }

    group.finish();
}

struct Sink;

impl EventHandler for Sink {
    type Error = std::convert::Infallible;

    fn on_status(&mut self, status: Status) -> Result<(), Self::Error> {
        black_box(status);
        Ok(())
    }

    fn on_message_available(&mut self, message: &MessageSnapshot) -> Result<(), Self::Error> {
        black_box(message.len());
        Ok(())
    }
}

/// Benchmark status reports while the consumer is draining
fn bench_status_with_consumer(c: &mut Criterion) {
    let agg = EventAggregator::new(1024);
    let enabled = Arc::new(AtomicBool::new(true));

    let worker = {
        let agg = Arc::clone(&agg);
        let enabled = Arc::clone(&enabled);
        thread::spawn(move || {
            let mut consumer = EventConsumer::new(agg);
            let _ = consumer.run(&mut Sink, &enabled);
        })
    };

    let mut i = 0i32;
    c.bench_function("report_status_with_consumer", |b| {
        b.iter(|| {
            i = i.wrapping_add(1);
            agg.report_status(black_box(Status(i)));
        });
    });

    enabled.store(false, Ordering::Release);
    agg.control_channel().request_disable();
    let _ = worker.join();
}

criterion_group!(
    benches,
    bench_status_no_consumer,
    bench_message_sizes,
    bench_status_with_consumer
);
criterion_main!(benches);
