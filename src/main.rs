//! ACH Engine CLI
//!
//! Parses an ACH file and writes it back out normalized, or writes a CSV
//! summary of its batches.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- payments.ach > normalized.ach
//! cargo run -- payments.ach --summary > batches.csv
//! cargo run -- payments.ach --strict
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use ach_engine::{write_summary, AchError, Reader, Result};
use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::process;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let summary = args.iter().any(|arg| arg == "--summary");
    let strict = args.iter().any(|arg| arg == "--strict");
    let input_path = args
        .iter()
        .find(|arg| !arg.starts_with("--"))
        .ok_or(AchError::MissingArgument)?;

    let file = File::open(input_path)?;
    let lines = BufReader::new(file)
        .lines()
        .collect::<io::Result<Vec<_>>>()?;

    let ach = Reader::new(lines).strict(strict).to_ach()?;

    let stdout = io::stdout();
    let handle = stdout.lock();
    if summary {
        write_summary(&ach, handle)?;
    } else {
        ach.write_to(handle)?;
    }

    Ok(())
}
