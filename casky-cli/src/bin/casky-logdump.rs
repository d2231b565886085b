use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;

use casky::storage::record::Record;

#[derive(Debug, Parser)]
#[command(version, about = "Dump every record of a casky log file")]
struct Args {
    /// Path to the log file.
    logfile: PathBuf,
}

fn main() {
    // Exit 1 on argument errors too, matching the I/O failure code; clap
    // would otherwise exit 2.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(error) = run(&args) {
        eprintln!("{:#}", error);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let file = File::open(&args.logfile)
        .with_context(|| format!("failed to open log file {}", args.logfile.display()))?;
    println!("Debug log file: {}", args.logfile.display());

    let mut reader = BufReader::new(file);
    while let Some(record) = Record::read_from(&mut reader)? {
        let marker = if record.crc_ok() { "" } else { " [CRC MISMATCH]" };
        println!(
            "Record: CRC=0x{:08X}{}, TS={}, Key='{}', Value='{}'",
            record.crc,
            marker,
            record.timestamp,
            String::from_utf8_lossy(&record.key),
            String::from_utf8_lossy(record.value.as_deref().unwrap_or_default()),
        );
    }
    Ok(())
}
