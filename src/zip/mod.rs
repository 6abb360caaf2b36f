//! ZIP archive reading and writing.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of ZIP structures from raw bytes
//! - [`extractor`]: Entry payload decoding and materialization on disk
//! - [`writer`]: Sequential archive writer used when compressing
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions when reading
//! - STORED and DEFLATE compression methods
//! - Unix permission bits in the external attributes
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No ZIP64 output; archives over 4 GiB or 65535 entries are rejected

mod extractor;
mod parser;
mod structures;
mod writer;

pub use extractor::ZipExtractor;
pub use parser::ZipParser;
pub use structures::*;
pub use writer::ZipWriter;
