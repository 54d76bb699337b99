use std::fs::File;

use clap::Parser;
use columnar_csv::{Column, SessionBuilder, Table};
use memmap2::Mmap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
struct Args {
    /// Path to target CSV file
    path: String,

    /// Columns to decode, as field:type[:column]
    #[arg(short, long = "column", required = true)]
    columns: Vec<String>,

    /// Whether the first row is a header
    #[arg(long)]
    header: bool,

    /// Size of the chunks read from the file
    #[arg(long, default_value_t = 1024 * (1 << 10))]
    chunk_size: usize,

    /// Whether to memory map the file instead of streaming it
    #[arg(long)]
    mmap: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn delimiter(&self) -> u8 {
        if self.path.ends_with(".tsv") {
            b'\t'
        } else {
            b','
        }
    }
}

fn setup_logging(args: &Args) {
    let level = if args.verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("columnar_csv={}", level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn describe(column: &Column) -> String {
    match column {
        Column::String(values) => format!(
            "{} distinct values",
            values.iter().collect::<std::collections::HashSet<_>>().len()
        ),
        Column::Int(values) => match (values.iter().min(), values.iter().max()) {
            (Some(min), Some(max)) => format!("min {}, max {}", min, max),
            _ => "empty".to_string(),
        },
        Column::Float32(values) => {
            let sum: f64 = values.iter().map(|v| *v as f64).sum();
            format!("mean {}", sum / values.len().max(1) as f64)
        }
        Column::Float64(values) => {
            let sum: f64 = values.iter().sum();
            format!("mean {}", sum / values.len().max(1) as f64)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    setup_logging(&args);

    let mut table = Table::parse(&args.columns)?;

    let mut builder = SessionBuilder::with_chunk_size(args.chunk_size);
    builder.has_header(args.header).delimiter(args.delimiter());

    let summary = if args.mmap {
        let file = File::open(&args.path)?;
        // SAFETY: the file must not be truncated or modified while mapped.
        let map = unsafe { Mmap::map(&file)? };

        builder.decode_bytes(&map, &mut table)?
    } else {
        builder.decode_path(&args.path, &mut table)?
    };

    println!("rows: {}", summary.rows);
    println!("bytes: {}", summary.bytes);

    for ((spec, column), position) in table.iter().zip(summary.positions.iter()) {
        match position {
            Some(position) => println!(
                "{} ({}, column {}): {}",
                spec.field,
                spec.element_type,
                position,
                describe(column)
            ),
            None => println!("{} ({}): unresolved", spec.field, spec.element_type),
        }
    }

    Ok(())
}
