use std::fs::File;
use std::io::{self, Write};

use bstr::ByteSlice;
use clap::Parser;
use columnar_csv::{Row, SessionBuilder};

#[derive(Parser, Debug)]
struct Args {
    /// Path to target CSV file
    path: String,

    /// Maximum number of rows to print
    #[arg(short, long)]
    limit: Option<u64>,

    /// Only count rows
    #[arg(long)]
    count: bool,
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

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut reader = SessionBuilder::new()
        .delimiter(args.delimiter())
        .row_reader(File::open(&args.path)?);

    let mut row = Row::new();

    if args.count {
        while reader.read_row(&mut row)? {}

        println!("{}", reader.rows());
        return Ok(());
    }

    let mut stdout = io::stdout().lock();

    while reader.read_row(&mut row)? {
        if args.limit.is_some_and(|limit| reader.rows() > limit) {
            break;
        }

        let cells = row
            .iter()
            .map(|cell| format!("{:?}", cell.as_bstr()))
            .collect::<Vec<_>>();

        writeln!(stdout, "{}: [{}]", reader.rows() - 1, cells.join(", "))?;
    }

    Ok(())
}
