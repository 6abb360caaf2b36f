//! ZIP archive writer.
//!
//! Entries are appended one at a time: each file payload is compressed in
//! memory, so sizes and CRC are known before its local header is written and
//! no data descriptors are needed. The central directory is accumulated and
//! emitted by [`ZipWriter::finish`].

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use crate::error::{Error, Result};

use super::structures::*;

/// Central directory record kept until the archive is finished.
struct CentralRecord {
    entry: ArchiveEntry,
    method: CompressionMethod,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    lfh_offset: u32,
}

/// Streaming zip writer over any [`Write`] sink.
pub struct ZipWriter<W: Write> {
    inner: W,
    offset: u64,
    records: Vec<CentralRecord>,
}

impl<W: Write> ZipWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            offset: 0,
            records: Vec::new(),
        }
    }

    /// Append a directory entry: header only, stored, no payload.
    pub fn add_directory(&mut self, entry: ArchiveEntry) -> Result<()> {
        self.add(entry, CompressionMethod::Stored, 0, &[], 0)
    }

    /// Append a file entry, deflating the payload unless that would grow it.
    pub fn add_file(&mut self, entry: ArchiveEntry, data: &[u8]) -> Result<()> {
        let crc32 = crc32fast::hash(data);
        let uncompressed_size = fit_u32(data.len() as u64, "entry")?;

        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        let deflated = encoder.finish()?;

        if deflated.len() < data.len() {
            self.add(entry, CompressionMethod::Deflate, crc32, &deflated, uncompressed_size)
        } else {
            self.add(entry, CompressionMethod::Stored, crc32, data, uncompressed_size)
        }
    }

    fn add(
        &mut self,
        entry: ArchiveEntry,
        method: CompressionMethod,
        crc32: u32,
        payload: &[u8],
        uncompressed_size: u32,
    ) -> Result<()> {
        if self.records.len() >= u16::MAX as usize {
            return Err(Error::format("too many entries for a zip archive without ZIP64"));
        }
        let name_len = u16::try_from(entry.name.len())
            .map_err(|_| Error::format("entry name longer than 65535 bytes"))?;
        let lfh_offset = fit_u32(self.offset, "archive")?;
        let compressed_size = fit_u32(payload.len() as u64, "entry")?;

        let out = &mut self.inner;
        out.write_all(LFH_SIGNATURE)?;
        out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        out.write_u16::<LittleEndian>(entry.flags())?;
        out.write_u16::<LittleEndian>(method.as_u16())?;
        out.write_u16::<LittleEndian>(entry.modified.time)?;
        out.write_u16::<LittleEndian>(entry.modified.date)?;
        out.write_u32::<LittleEndian>(crc32)?;
        out.write_u32::<LittleEndian>(compressed_size)?;
        out.write_u32::<LittleEndian>(uncompressed_size)?;
        out.write_u16::<LittleEndian>(name_len)?;
        out.write_u16::<LittleEndian>(0)?;
        out.write_all(&entry.name)?;
        out.write_all(payload)?;

        self.offset += (LFH_SIZE + entry.name.len() + payload.len()) as u64;
        self.records.push(CentralRecord {
            entry,
            method,
            crc32,
            compressed_size,
            uncompressed_size,
            lfh_offset,
        });
        Ok(())
    }

    /// Write the central directory and end record, returning the sink.
    pub fn finish(mut self) -> Result<W> {
        let cd_offset = fit_u32(self.offset, "archive")?;
        let mut cd_size = 0u64;
        let version_made_by = ((HOST_UNIX as u16) << 8) | VERSION_NEEDED;

        for record in &self.records {
            let entry = &record.entry;
            let out = &mut self.inner;
            out.write_all(CDFH_SIGNATURE)?;
            out.write_u16::<LittleEndian>(version_made_by)?;
            out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
            out.write_u16::<LittleEndian>(entry.flags())?;
            out.write_u16::<LittleEndian>(record.method.as_u16())?;
            out.write_u16::<LittleEndian>(entry.modified.time)?;
            out.write_u16::<LittleEndian>(entry.modified.date)?;
            out.write_u32::<LittleEndian>(record.crc32)?;
            out.write_u32::<LittleEndian>(record.compressed_size)?;
            out.write_u32::<LittleEndian>(record.uncompressed_size)?;
            out.write_u16::<LittleEndian>(entry.name.len() as u16)?;
            out.write_u16::<LittleEndian>(0)?; // extra field
            out.write_u16::<LittleEndian>(0)?; // comment
            out.write_u16::<LittleEndian>(0)?; // disk number start
            out.write_u16::<LittleEndian>(0)?; // internal attributes
            out.write_u32::<LittleEndian>(entry.external_attrs())?;
            out.write_u32::<LittleEndian>(record.lfh_offset)?;
            out.write_all(&entry.name)?;
            cd_size += (CDFH_MIN_SIZE + entry.name.len()) as u64;
        }

        let total = self.records.len() as u16;
        EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: total,
            total_entries: total,
            cd_size: fit_u32(cd_size, "central directory")?,
            cd_offset,
            comment_len: 0,
        }
        .write_to(&mut self.inner)?;

        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn fit_u32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .ok()
        .filter(|&v| v != u32::MAX)
        .ok_or_else(|| {
            Error::format(format!(
                "{what} exceeds 4 GiB, ZIP64 output is not supported"
            ))
        })
}
