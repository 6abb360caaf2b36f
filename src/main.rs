//! Main entry point for the zipcn CLI application.
//!
//! Parses the command line into a [`Config`], then compresses, extracts or
//! lists. Errors propagate back here; anyhow reports them on standard error
//! and the process exits non-zero.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use zipcn::{Cli, Config, LocalFileReader, MemoryReader, Options, ReadAt, Task, ZipExtractor};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;
    let options = &config.options;

    match &config.task {
        Task::Compress {
            source,
            destination,
        } => {
            let count = zipcn::compress(source, destination, options).await?;
            if options.verbose {
                println!("{} entries written to {}", count, destination.display());
            }
        }
        Task::Extract { archive, directory } => {
            if options.verbose {
                println!("Charset: {}", options.encoding);
            }
            match archive {
                Some(path) => {
                    let reader = Arc::new(LocalFileReader::new(path)?);
                    zipcn::extract(reader, directory, options).await?;
                }
                None => {
                    let reader = Arc::new(MemoryReader::from_reader(tokio::io::stdin()).await?);
                    zipcn::extract(reader, directory, options).await?;
                }
            }
        }
        Task::List { archive } => match archive {
            Some(path) => list_files(Arc::new(LocalFileReader::new(path)?), options).await?,
            None => {
                let reader = MemoryReader::from_reader(tokio::io::stdin()).await?;
                list_files(Arc::new(reader), options).await?
            }
        },
    }

    Ok(())
}

/// List entries in the ZIP archive.
///
/// Supports two output formats:
/// - Simple format: decoded names, one per line
/// - Verbose format (`-v`): table with size, compression ratio, timestamps and
///   the UTF-8 name flag
async fn list_files<R: ReadAt + 'static>(reader: Arc<R>, options: &Options) -> Result<()> {
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().await?;

    if options.verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:<4}  Name",
            "Length", "Size", "Cmpr", "Date", "Time", "Flag"
        );
        println!("{}", "-".repeat(76));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        let name = options.encoding.display_name(&entry.file_name)?;
        if !options.verbose {
            println!("{}", name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {:<4}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            if entry.is_utf8() { "utf8" } else { "" },
            name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if options.verbose {
        println!("{}", "-".repeat(76));
        println!(
            "{:>10}  {:>10}  {}  {:>27}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }

    Ok(())
}

/// Space saved by compression, as a right-aligned percentage.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 && compressed <= uncompressed {
        format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
    } else {
        "  0%".to_string()
    }
}
