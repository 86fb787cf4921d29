#[cfg(feature = "telemetry")]
mod telemetry_enabled_tests {
    use std::sync::Mutex;

    use tsnative_core::telemetry::{self, tags};
    use tsnative_core::{
        Block, ContentEncoding, MetricName, NativeStreamParser, NativeStreamWriter, ParserOptions,
        TimeRange, WorkItemPool,
    };

    static TELEMETRY_TEST_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn default_metrics_reach_the_registry() -> Result<(), Box<dyn std::error::Error>> {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");
        telemetry::reset();

        let mut writer = NativeStreamWriter::new(Vec::new(), TimeRange::new(0, 10))?;
        writer.write_record(&MetricName::new("a"), &[1, 20], &[1.0, 2.0])?;
        writer.write_record(&MetricName::new("b"), &[2], &[3.0])?;
        writer.write_raw_record(b"\x00", b"")?;
        let stream = writer.finish()?;

        let parser = NativeStreamParser::new(ParserOptions::default().with_workers(2));
        parser.parse(
            stream.as_slice(),
            ContentEncoding::Identity,
            &|block: &Block| -> anyhow::Result<()> {
                if block.metric_name.metric_group == b"b" {
                    anyhow::bail!("rejected");
                }
                Ok(())
            },
        )?;

        let snapshot = telemetry::snapshot();
        assert_eq!(snapshot.counter(tags::METRIC_NATIVE_READ_CALLS), Some(12));
        assert_eq!(snapshot.counter(tags::METRIC_NATIVE_BLOCKS_READ), Some(3));
        assert_eq!(snapshot.counter(tags::METRIC_NATIVE_ROWS_READ), Some(2));
        assert_eq!(snapshot.counter(tags::METRIC_NATIVE_PARSE_ERRORS), Some(1));
        assert_eq!(snapshot.counter(tags::METRIC_NATIVE_PROCESS_ERRORS), Some(1));
        assert_eq!(snapshot.counter(tags::METRIC_WORKER_TASK_START_COUNT), Some(3));
        assert_eq!(snapshot.counter(tags::METRIC_WORKER_TASK_FINISH_COUNT), Some(1));
        assert_eq!(snapshot.counter(tags::METRIC_WORKER_TASK_FAIL_COUNT), Some(2));
        assert_eq!(snapshot.gauge(tags::METRIC_WORKER_ACTIVE_COUNT), Some(0));
        assert_eq!(
            snapshot
                .histogram(tags::METRIC_STREAM_PARSE_LATENCY_US)
                .map(|hist| hist.count),
            Some(1)
        );
        Ok(())
    }

    #[test]
    fn pool_release_outcomes_are_counted() {
        let _guard = TELEMETRY_TEST_MUTEX
            .lock()
            .expect("telemetry test lock poisoned");
        telemetry::reset();

        let pool = WorkItemPool::new(1);
        let first = pool.acquire();
        let second = pool.acquire();
        drop(first);
        drop(second);
        drop(pool.acquire());

        let snapshot = telemetry::snapshot();
        assert_eq!(snapshot.counter(tags::METRIC_POOL_ACQUIRE_CREATED_COUNT), Some(2));
        assert_eq!(snapshot.counter(tags::METRIC_POOL_ACQUIRE_RECYCLED_COUNT), Some(1));
        assert_eq!(snapshot.counter(tags::METRIC_POOL_RELEASE_OK_COUNT), Some(2));
        assert_eq!(snapshot.counter(tags::METRIC_POOL_RELEASE_DROPPED_COUNT), Some(1));
    }
}

#[cfg(not(feature = "telemetry"))]
#[test]
fn snapshot_is_empty_without_telemetry() {
    tsnative_core::telemetry::increment_counter("tsnative.test.count", 1, &[]);
    assert!(tsnative_core::telemetry::snapshot().counters.is_empty());
}
