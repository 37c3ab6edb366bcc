//! Criterion benchmark measuring the throughput of the line-aligned chunk splitter and of the whole pipeline.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use bank_slip_processor::upload::split_chunks;
use bank_slip_processor::{Config, process};

const ROWS: usize = 20_000;

fn fixture() -> Vec<u8> {
    let mut csv = String::from("name,governmentId,email,debtAmount,debtDueDate,debtId\n");
    for i in 0..ROWS {
        csv.push_str(&format!(
            "Debtor {i},{},debtor{i}@example.com,{}.{:02},2024-06-30,debt{i:07}\n",
            10_000_000_000u64 + i as u64,
            i % 5_000,
            i % 100
        ));
    }
    csv.into_bytes()
}

fn bench_split_chunks(c: &mut Criterion) {
    let csv_bytes = fixture();

    let mut group = c.benchmark_group("split_chunks");
    group.throughput(Throughput::Bytes(csv_bytes.len() as u64));

    for buffer_size in [4 * 1024, 64 * 1024, 1024 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(buffer_size),
            &buffer_size,
            |b, &buffer_size| {
                b.iter(|| {
                    let (header, chunks) = split_chunks(csv_bytes.as_slice(), buffer_size)
                        .expect("fixture has a header");
                    let bytes: usize = chunks.map(|chunk| chunk.map_or(0, |c| c.len())).sum();
                    criterion::black_box((header, bytes));
                });
            },
        );
    }

    group.finish();
}

fn bench_process(c: &mut Criterion) {
    let csv_bytes = fixture();
    let config = Config {
        poll_interval: std::time::Duration::from_millis(5),
        ..Config::default()
    };

    let mut group = c.benchmark_group("process");
    group.sample_size(10);
    group.throughput(Throughput::Elements(ROWS as u64));

    group.bench_function(BenchmarkId::new("in_memory", ROWS), |b| {
        b.iter(|| {
            let records = process(csv_bytes.as_slice(), "bench.csv", &config)
                .expect("fixture is processed");
            criterion::black_box(records);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_split_chunks, bench_process);
criterion_main!(benches);
