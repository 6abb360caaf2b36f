use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::ReadAt;
use crate::error::Result;

/// In-memory archive, used for archives piped through standard input.
pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Buffer an entire stream.
    pub async fn from_reader<S: AsyncRead + Unpin>(mut stream: S) -> Result<Self> {
        let mut data = Vec::new();
        stream.read_to_end(&mut data).await?;
        Ok(Self::new(data))
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_are_clamped_to_the_buffer() {
        let reader = MemoryReader::new(b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        assert_eq!(reader.read_at(4, &mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read_at(10, &mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn read_exact_at_fails_past_the_end() {
        let reader = MemoryReader::new(b"abcdef".to_vec());
        let mut buf = [0u8; 4];
        reader.read_exact_at(1, &mut buf).await.unwrap();
        assert_eq!(&buf, b"bcde");
        assert!(reader.read_exact_at(3, &mut buf).await.is_err());
    }

    #[tokio::test]
    async fn buffers_a_whole_stream() {
        let reader = MemoryReader::from_reader(&b"zip bytes"[..]).await.unwrap();
        assert_eq!(reader.size(), 9);
    }
}
