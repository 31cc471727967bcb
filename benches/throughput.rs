use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flush_pipeline::{NoopObserver, PipelineBuilder};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn run_chain(values: i64) -> u64 {
    let mut running = PipelineBuilder::new()
        .buffer_capacity(values as usize)
        .flush_interval(Duration::from_millis(5))
        .observer(Arc::new(NoopObserver))
        .build()
        .expect("Build failed")
        .start()
        .expect("Start failed");

    let input = running.take_input().expect("Input already taken");
    let feeder = thread::spawn(move || {
        for v in 0..values {
            if input.send(black_box(v)).is_err() {
                break;
            }
        }
    });

    let expected = (1..values).filter(|v| v % 3 == 0).count() as u64;
    let sink = running.sink_metrics().clone();
    let cancel = running.cancellation();
    let watcher = thread::spawn(move || {
        while sink.total_forwarded() < expected {
            thread::sleep(Duration::from_micros(100));
        }
        cancel.fire();
    });

    let written = running.run_sink(std::io::sink()).expect("Sink failed");
    let _ = feeder.join();
    let _ = watcher.join();
    let _ = running.shutdown();
    written
}

fn benchmark_chain_1000_values(c: &mut Criterion) {
    c.bench_function("chain_1000_values", |b| b.iter(|| run_chain(1000)));
}

fn benchmark_chain_10000_values(c: &mut Criterion) {
    c.bench_function("chain_10000_values", |b| b.iter(|| run_chain(10_000)));
}

criterion_group!(
    name = benches;
    config = Criterion::default()
        .sample_size(20)
        .measurement_time(Duration::from_secs(10));
    targets = benchmark_chain_1000_values, benchmark_chain_10000_values
);
criterion_main!(benches);
