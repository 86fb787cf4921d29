use std::hint::black_box;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flate2::Compression;
use flate2::write::GzEncoder;
use tsnative_core::{
    Block, ContentEncoding, MetricName, NativeStreamParser, NativeStreamWriter, ParserOptions,
    TimeRange,
};

const SERIES: usize = 2_000;
const POINTS_PER_SERIES: usize = 240;

fn synthetic_stream() -> Vec<u8> {
    let start = 1_700_000_000_000i64;
    let mut writer =
        NativeStreamWriter::new(Vec::new(), TimeRange::unbounded()).expect("write header");
    let timestamps: Vec<i64> = (0..POINTS_PER_SERIES as i64)
        .map(|i| start + i * 15_000)
        .collect();
    for series in 0..SERIES {
        let name = MetricName::new("node_cpu_seconds_total")
            .with_tag("instance", format!("host-{:04}", series / 8))
            .with_tag("cpu", (series % 8).to_string());
        let values: Vec<f64> = timestamps
            .iter()
            .enumerate()
            .map(|(i, _)| (series * POINTS_PER_SERIES + i) as f64 * 0.25)
            .collect();
        writer
            .write_record(&name, &timestamps, &values)
            .expect("write record");
    }
    writer.finish().expect("finish stream")
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data).expect("gzip stream");
    encoder.finish().expect("finish gzip")
}

fn bench_parse(c: &mut Criterion) {
    let stream = synthetic_stream();
    let rows = AtomicU64::new(0);
    let sink = |block: &Block| -> anyhow::Result<()> {
        rows.fetch_add(block.len() as u64, Ordering::Relaxed);
        Ok(())
    };

    let mut group = c.benchmark_group("native_parse");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    for workers in [1usize, 2, 4, num_cpus::get()] {
        let parser = NativeStreamParser::new(ParserOptions::default().with_workers(workers));
        group.bench_with_input(BenchmarkId::new("identity", workers), &stream, |b, stream| {
            b.iter(|| {
                let summary = parser
                    .parse(stream.as_slice(), ContentEncoding::Identity, &sink)
                    .expect("parse stream");
                black_box(summary);
            })
        });
    }
    group.finish();

    let compressed = gzip(&stream);
    let mut group = c.benchmark_group("native_parse_gzip");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    let parser = NativeStreamParser::new(ParserOptions::default());
    group.bench_function("default_workers", |b| {
        b.iter(|| {
            let summary = parser
                .parse(compressed.as_slice(), ContentEncoding::Gzip, &sink)
                .expect("parse gzip stream");
            black_box(summary);
        })
    });
    group.finish();

    black_box(rows.load(Ordering::Relaxed));
}

criterion_group!(benches, bench_parse);
criterion_main!(benches);
