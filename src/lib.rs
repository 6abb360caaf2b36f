//! # zipcn
//!
//! Compress a directory tree into a zip archive or extract one, optionally
//! storing entry names as GBK instead of UTF-8.
//!
//! Archives made by Chinese-locale Windows tools usually carry GBK names
//! without the UTF-8 flag, and extract as mojibake elsewhere. Selecting
//! [`Encoding::Gbk`] decodes those names on extraction and produces the same
//! kind of archive on compression.
//!
//! ## Features
//!
//! - Pre-order directory walk that never archives its own output file
//! - STORED and DEFLATE entries, Unix permission bits preserved
//! - ZIP64 archives understood when reading
//! - Entries that would escape the destination directory are refused
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use zipcn::{Encoding, LocalFileReader, Options};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> zipcn::Result<()> {
//!     let options = Options { encoding: Encoding::Gbk, verbose: false };
//!
//!     zipcn::compress(Path::new("docs"), Path::new("docs.zip"), &options).await?;
//!
//!     let reader = Arc::new(LocalFileReader::new(Path::new("docs.zip"))?);
//!     zipcn::extract(reader, Path::new("out"), &options).await?;
//!     Ok(())
//! }
//! ```

pub mod charset;
pub mod cli;
pub mod compress;
pub mod config;
pub mod error;
pub mod extract;
pub mod io;
pub mod walk;
pub mod zip;

pub use charset::Encoding;
pub use cli::Cli;
pub use compress::compress;
pub use config::{Config, Options, Task};
pub use error::{Error, Result};
pub use extract::extract;
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use zip::{ZipExtractor, ZipFileEntry};
