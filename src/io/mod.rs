//! Random-access archive sources.
//!
//! The zip central directory lives at the end of the archive, so the reader
//! needs positional reads rather than a plain stream. Files on disk are read
//! in place; standard input is buffered into memory first.

mod local;
mod memory;

pub use local::LocalFileReader;
pub use memory::MemoryReader;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely, failing if the source ends first.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..]).await?;
            if n == 0 {
                return Err(Error::format(format!(
                    "unexpected end of archive reading {} bytes at offset {}",
                    buf.len(),
                    offset
                )));
            }
            filled += n;
        }
        Ok(())
    }
}
