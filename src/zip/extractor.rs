use flate2::read::DeflateDecoder;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, PathContext, Result};
use crate::io::ReadAt;

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

const MAX_CAPACITY_HINT: u64 = 1 << 20;

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all entries in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Read and decompress an entry's payload, verifying its CRC-32.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.parser.get_data_offset(entry).await?;
        if data_offset.saturating_add(entry.compressed_size) > self.parser.reader().size() {
            return Err(Error::format("entry data extends past end of file"));
        }

        let mut raw = vec![0u8; entry.compressed_size as usize];
        self.parser.reader().read_exact_at(data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                // The declared size is untrusted; only hint a bounded capacity.
                let hint = entry.uncompressed_size.min(MAX_CAPACITY_HINT) as usize;
                let mut data = Vec::with_capacity(hint);
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut data)
                    .map_err(|e| Error::format(format!("corrupt deflate stream: {e}")))?;
                data
            }
            CompressionMethod::Unknown(method) => {
                return Err(Error::format(format!(
                    "unsupported compression method {method}"
                )));
            }
        };

        if data.len() as u64 != entry.uncompressed_size || crc32fast::hash(&data) != entry.crc32 {
            return Err(Error::format(format!(
                "checksum mismatch in {}",
                String::from_utf8_lossy(&entry.file_name)
            )));
        }
        Ok(data)
    }

    /// Create a directory entry (and its parents) with the given permissions.
    pub async fn extract_directory(&self, output_path: &Path, mode: u32) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;
        builder.create(output_path).await.at(output_path)
    }

    /// Extract file to disk, creating or truncating it with the given permissions.
    pub async fn extract_to_file(
        &self,
        entry: &ZipFileEntry,
        output_path: &Path,
        mode: u32,
    ) -> Result<()> {
        // Create parent directories if needed
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.at(parent)?;
            }
        }

        let data = self.read_entry(entry).await?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(mode);
        #[cfg(not(unix))]
        let _ = mode;

        let mut file = options.open(output_path).await.at(output_path)?;
        file.write_all(&data).await.at(output_path)?;
        file.flush().await.at(output_path)?;

        Ok(())
    }
}
