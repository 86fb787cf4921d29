use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing_subscriber::EnvFilter;
use tsnative_core::{
    Block, ContentEncoding, IngestCounters, IngestCountersSnapshot, MetricName,
    NativeStreamParser, NativeStreamWriter, ParseSummary, ParserOptions, TimeRange,
};

#[derive(Parser)]
#[command(
    name = "tsnative",
    version,
    about = "Native time-series stream tool",
    long_about = "Parse native import streams concurrently, or generate synthetic ones."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a native stream and report what it contained.
    Parse {
        /// Input file, or `-` for stdin.
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Content encoding of the input.
        #[arg(long, value_enum, default_value_t = EncodingArg::Identity)]
        encoding: EncodingArg,

        /// Shorthand for `--encoding gzip`.
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Number of decode workers (defaults to CPU count).
        #[arg(long, default_value_t = num_cpus::get())]
        workers: usize,

        /// Queued records per worker before the reader blocks.
        #[arg(long, default_value_t = 8)]
        queue_depth: usize,

        /// Read buffer size (supports suffixes K/M/G, e.g. 64K, 1M).
        #[arg(long, default_value = "1M", value_parser = parse_size)]
        read_buffer: usize,

        /// Write every decoded block to stdout, one line per block.
        #[arg(long, default_value_t = false)]
        print: bool,
    },
    /// Write a synthetic native stream.
    Generate {
        /// Output file, or `-` for stdout.
        output: PathBuf,

        /// Number of distinct series.
        #[arg(long, default_value_t = 100)]
        series: usize,

        /// Points per series.
        #[arg(long, default_value_t = 60)]
        points: usize,

        /// Timestamp of the first point, in milliseconds.
        #[arg(long, default_value_t = 1_700_000_000_000)]
        start: i64,

        /// Milliseconds between points.
        #[arg(long, default_value_t = 15_000)]
        step: i64,

        /// Header lower bound (defaults to the first point).
        #[arg(long)]
        min_timestamp: Option<i64>,

        /// Header upper bound (defaults to the last point).
        #[arg(long)]
        max_timestamp: Option<i64>,

        /// Gzip the generated stream.
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EncodingArg {
    Identity,
    Gzip,
}

impl From<EncodingArg> for ContentEncoding {
    fn from(value: EncodingArg) -> Self {
        match value {
            EncodingArg::Identity => ContentEncoding::Identity,
            EncodingArg::Gzip => ContentEncoding::Gzip,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SyntheticLayout {
    series: usize,
    points: usize,
    start: i64,
    step: i64,
    time_range: TimeRange,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            input,
            encoding,
            gzip,
            workers,
            queue_depth,
            read_buffer,
            print,
        } => {
            let encoding = if gzip {
                ContentEncoding::Gzip
            } else {
                encoding.into()
            };
            let options = ParserOptions::default()
                .with_workers(workers)
                .with_queue_depth_per_worker(queue_depth)
                .with_read_buffer_size(read_buffer);
            parse_command(&input, encoding, options, print)?
        }
        Commands::Generate {
            output,
            series,
            points,
            start,
            step,
            min_timestamp,
            max_timestamp,
            gzip,
        } => {
            let last = start.saturating_add(step.saturating_mul(points.saturating_sub(1) as i64));
            let layout = SyntheticLayout {
                series,
                points,
                start,
                step,
                time_range: TimeRange::new(
                    min_timestamp.unwrap_or(start.min(last)),
                    max_timestamp.unwrap_or(start.max(last)),
                ),
            };
            generate_command(&output, &layout, gzip)?
        }
    }

    Ok(())
}

fn parse_command(
    input: &Path,
    encoding: ContentEncoding,
    options: ParserOptions,
    print: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        input = %input.display(),
        %encoding,
        workers = options.effective_workers(),
        queue_capacity = options.queue_capacity(),
        "parsing native stream"
    );
    let counters = Arc::new(IngestCounters::new());
    let parser = NativeStreamParser::with_metrics(options, counters.clone());
    let mut reader = CountingReader::new(open_input(input)?);
    let printer = print.then(|| Mutex::new(BufWriter::new(io::stdout())));

    let sink = |block: &Block| -> anyhow::Result<()> {
        if let Some(printer) = &printer {
            let mut out = printer
                .lock()
                .map_err(|_| anyhow::anyhow!("stdout writer poisoned"))?;
            write_block_line(&mut *out, block)?;
        }
        Ok(())
    };

    let result = parser.parse(&mut reader, encoding, &sink);
    if let Some(printer) = printer {
        printer
            .into_inner()
            .map_err(|_| io::Error::other("stdout writer poisoned"))?
            .flush()?;
    }

    let counts = counters.snapshot();
    match result {
        Ok(summary) => {
            print_summary(&summary, &counts, reader.bytes_read());
            Ok(())
        }
        Err(err) => {
            eprintln!(
                "aborted after {} records ({} bytes read)",
                counts.blocks_read,
                reader.bytes_read()
            );
            Err(err.into())
        }
    }
}

fn generate_command(
    output: &Path,
    layout: &SyntheticLayout,
    gzip: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sink: Box<dyn Write> = if output == Path::new("-") {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(File::create(output)?))
    };

    if gzip {
        let encoder = write_synthetic(GzEncoder::new(sink, Compression::default()), layout)?;
        encoder.finish()?.flush()?;
    } else {
        write_synthetic(sink, layout)?.flush()?;
    }

    eprintln!(
        "wrote {} series x {} points, range [{}, {}]",
        layout.series, layout.points, layout.time_range.min_timestamp, layout.time_range.max_timestamp
    );
    Ok(())
}

fn write_synthetic<W: Write>(writer: W, layout: &SyntheticLayout) -> tsnative_core::Result<W> {
    let mut writer = NativeStreamWriter::new(writer, layout.time_range)?;
    let timestamps: Vec<i64> = (0..layout.points as i64)
        .map(|i| layout.start.wrapping_add(i.wrapping_mul(layout.step)))
        .collect();
    let mut values = Vec::with_capacity(layout.points);

    for series in 0..layout.series {
        let name = MetricName::new("synthetic_gauge")
            .with_tag("job", "tsnative")
            .with_tag("series", series.to_string());
        values.clear();
        values.extend((0..layout.points).map(|i| {
            let phase = (i as f64 + series as f64) / 10.0;
            (phase.sin() * 100.0).round() / 4.0 + series as f64
        }));
        writer.write_record(&name, &timestamps, &values)?;
    }
    writer.finish()
}

fn open_input(path: &Path) -> io::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(File::open(path)?))
    }
}

fn write_block_line<W: Write>(out: &mut W, block: &Block) -> io::Result<()> {
    write!(out, "{}", block.metric_name)?;
    for (timestamp, value) in block.rows() {
        write!(out, " {timestamp}={value}")?;
    }
    writeln!(out)
}

fn print_summary(summary: &ParseSummary, counts: &IngestCountersSnapshot, bytes: u64) {
    let seconds = summary.elapsed.as_secs_f64();
    let rate = if seconds > 0.0 { bytes as f64 / seconds } else { 0.0 };

    eprintln!(
        "time range    : [{}, {}]",
        summary.time_range.min_timestamp, summary.time_range.max_timestamp
    );
    eprintln!("records       : {}", summary.records_read);
    eprintln!("rows          : {}", counts.rows_decoded);
    eprintln!("decode errors : {}", counts.decode_errors);
    eprintln!("sink errors   : {}", counts.callback_errors);
    eprintln!("input         : {}", format_bytes(bytes));
    eprintln!(
        "elapsed       : {} ({}/s)",
        format_duration(summary.elapsed),
        format_rate(rate)
    );
}

/// Counts bytes pulled from the transport, before any decompression.
struct CountingReader<R> {
    inner: R,
    bytes_read: u64,
}

impl<R: Read> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

fn parse_size(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    let split_at = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(split_at);
    if digits.is_empty() {
        return Err(format!("invalid size: '{value}'"));
    }

    let base: usize = digits
        .parse()
        .map_err(|_| format!("invalid size number: '{value}'"))?;
    let multiplier: usize = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => 1 << 10,
        "m" | "mb" | "mib" => 1 << 20,
        "g" | "gb" | "gib" => 1 << 30,
        other => return Err(format!("invalid size suffix '{other}' in '{value}'")),
    };

    base.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{value}'"))
}

const BYTE_UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

fn scale_bytes(mut value: f64) -> (f64, &'static str) {
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < BYTE_UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    (value, BYTE_UNITS[unit])
}

fn format_bytes(bytes: u64) -> String {
    match scale_bytes(bytes as f64) {
        (_, "B") => format!("{bytes} B"),
        (value, unit) => format!("{value:.2} {unit}"),
    }
}

fn format_rate(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 B".to_string();
    }
    match scale_bytes(bytes_per_second) {
        (value, "B") => format!("{value:.0} B"),
        (value, unit) => format!("{value:.2} {unit}"),
    }
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    if minutes > 0 {
        format!("{minutes}m{seconds:02}s")
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}
