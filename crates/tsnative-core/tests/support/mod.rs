#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tsnative_core::{
    Block, BlockSink, IngestCounters, MetricName, NativeStreamParser, NativeStreamWriter,
    ParserOptions, TimeRange,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// One record to encode: metric name plus parallel timestamp/value columns.
pub struct Record {
    pub name: MetricName,
    pub timestamps: Vec<i64>,
    pub values: Vec<f64>,
}

impl Record {
    pub fn new(name: MetricName, rows: &[(i64, f64)]) -> Self {
        Self {
            name,
            timestamps: rows.iter().map(|(ts, _)| *ts).collect(),
            values: rows.iter().map(|(_, value)| *value).collect(),
        }
    }
}

pub fn encode_stream(range: TimeRange, records: &[Record]) -> tsnative_core::Result<Vec<u8>> {
    let mut writer = NativeStreamWriter::new(Vec::new(), range)?;
    for record in records {
        writer.write_record(&record.name, &record.timestamps, &record.values)?;
    }
    writer.finish()
}

/// Appends a raw frame pair without validating either payload.
pub fn push_raw_record(stream: &mut Vec<u8>, metric_name: &[u8], block: &[u8]) {
    stream.extend_from_slice(&(metric_name.len() as u32).to_be_bytes());
    stream.extend_from_slice(metric_name);
    stream.extend_from_slice(&(block.len() as u32).to_be_bytes());
    stream.extend_from_slice(block);
}

/// Sink that keeps an owned copy of every block it sees.
#[derive(Default)]
pub struct CollectingSink {
    blocks: Mutex<Vec<Block>>,
}

impl CollectingSink {
    pub fn blocks(&self) -> Vec<Block> {
        self.blocks.lock().expect("collecting sink poisoned").clone()
    }

    /// Blocks ordered by metric group so assertions do not depend on worker scheduling.
    pub fn sorted_blocks(&self) -> Vec<Block> {
        let mut blocks = self.blocks();
        blocks.sort_by(|a, b| {
            a.metric_name
                .metric_group
                .cmp(&b.metric_name.metric_group)
                .then_with(|| a.timestamps.first().cmp(&b.timestamps.first()))
        });
        blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().expect("collecting sink poisoned").len()
    }
}

impl BlockSink for CollectingSink {
    fn process(&self, block: &Block) -> anyhow::Result<()> {
        self.blocks
            .lock()
            .expect("collecting sink poisoned")
            .push(block.clone());
        Ok(())
    }
}

pub fn parser_with_counters(workers: usize) -> (NativeStreamParser, Arc<IngestCounters>) {
    let counters = Arc::new(IngestCounters::new());
    let parser = NativeStreamParser::with_metrics(
        ParserOptions::default().with_workers(workers),
        counters.clone(),
    );
    (parser, counters)
}
