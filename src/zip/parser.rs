//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For extraction, read each file's Local File Header and data

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Location and size of the central directory.
struct CentralDirectory {
    offset: u64,
    size: u64,
    entries: u64,
}

/// Low-level ZIP file parser.
///
/// Generic over the reader so the same code serves archives on disk and
/// archives buffered from standard input.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its offset. The common case of an archive
    /// without a comment costs a single 22-byte read; otherwise the last
    /// 64 KiB are searched backwards for the signature.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(Error::format("file too small to be a zip archive"));
        }

        let offset = self.size - eocd_size;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf).await?;

        // Check for signature and zero-length comment
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf).await?;

        // Search backwards for EOCD signature (PK\x05\x06); the comment length
        // must account for every remaining byte.
        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::format("end of central directory record not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::format("missing ZIP64 end of central directory locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader
            .read_exact_at(locator_offset, &mut locator_buf)
            .await?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)
            .await?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    async fn central_directory(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let cd = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            CentralDirectory {
                offset: eocd64.cd_offset,
                size: eocd64.cd_size,
                entries: eocd64.total_entries,
            }
        } else {
            CentralDirectory {
                offset: eocd.cd_offset as u64,
                size: eocd.cd_size as u64,
                entries: eocd.total_entries as u64,
            }
        };

        let end = cd.offset.checked_add(cd.size);
        if end.is_none_or(|end| end > self.size) {
            return Err(Error::format("central directory extends past end of file"));
        }
        if cd.entries.saturating_mul(CDFH_MIN_SIZE as u64) > cd.size {
            return Err(Error::format("central directory is shorter than its entry count"));
        }
        Ok(cd)
    }

    /// List all entries in the ZIP archive, in central directory order.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let cd = self.central_directory().await?;

        // Read the entire Central Directory in one request
        let mut cd_data = vec![0u8; cd.size as usize];
        self.reader.read_exact_at(cd.offset, &mut cd_data).await?;

        let mut entries = Vec::with_capacity(cd.entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..cd.entries {
            let entry = parse_cdfh(&mut cursor)
                .map_err(|e| match e {
                    Error::Io(_) => Error::format("truncated central directory"),
                    e => e,
                })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Get the actual data offset for a file entry.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry, so
    /// the LFH is read to find where the data begins.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.reader
            .read_exact_at(entry.lfh_offset, &mut lfh_buf)
            .await?;

        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(Error::format(format!(
                "bad local file header at offset {}",
                entry.lfh_offset
            )));
        }

        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }
}

/// Parse a Central Directory File Header from a cursor.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
    // Read and verify the signature (PK\x01\x02)
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::format("bad central directory file header"));
    }

    let version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    // Names stay raw; the configured charset decodes them later.
    let mut file_name = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name)?;

    // ZIP64 extended information lives in extra field 0x0001
    let extra_field_end = cursor.position() + extra_field_length as u64;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == 0x0001 {
            // Fields are present only if the header field is 0xFFFFFFFF
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);
    if cursor.position() > cursor.get_ref().len() as u64 {
        return Err(Error::format("truncated central directory"));
    }

    let unix_dir = matches!((version_made_by >> 8) as u8, HOST_UNIX | HOST_OSX)
        && (external_attrs >> 16) & S_IFMT == S_IFDIR;
    let is_directory =
        file_name.last() == Some(&b'/') || unix_dir || external_attrs & DOS_DIRECTORY != 0;

    Ok(ZipFileEntry {
        file_name,
        version_made_by,
        flags,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        last_mod_time,
        last_mod_date,
        external_attrs,
        is_directory,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;
    use crate::zip::ZipWriter;

    fn archive_with(names: &[&str]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Vec::new());
        for name in names {
            let entry = ArchiveEntry {
                name: name.as_bytes().to_vec(),
                is_directory: false,
                mode: S_IFREG | 0o644,
                modified: DosDateTime::EPOCH,
                utf8: false,
            };
            writer.add_file(entry, name.as_bytes()).unwrap();
        }
        writer.finish().unwrap()
    }

    fn parser(bytes: Vec<u8>) -> ZipParser<MemoryReader> {
        ZipParser::new(Arc::new(MemoryReader::new(bytes)))
    }

    #[tokio::test]
    async fn finds_end_record_behind_a_comment() {
        let mut bytes = archive_with(&["a", "b"]);
        let len = bytes.len();
        bytes[len - 2..].copy_from_slice(&7u16.to_le_bytes());
        bytes.extend_from_slice(b"comment");

        let (eocd, offset) = parser(bytes).find_eocd().await.unwrap();
        assert_eq!(offset as usize, len - EndOfCentralDirectory::SIZE);
        assert_eq!(eocd.total_entries, 2);
        assert_eq!(eocd.comment_len, 7);
    }

    #[tokio::test]
    async fn rejects_data_that_is_not_a_zip() {
        let err = parser(b"definitely not a zip archive".to_vec())
            .list_files()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat(_)));

        let err = parser(b"PK".to_vec()).list_files().await.unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat(_)));
    }

    #[tokio::test]
    async fn rejects_truncated_central_directory() {
        let bytes = archive_with(&["a"]);
        // Drop the central directory, keep a fresh end record pointing at it.
        let eocd = bytes[bytes.len() - EndOfCentralDirectory::SIZE..].to_vec();
        let mut truncated = bytes[..31].to_vec();
        truncated.extend_from_slice(&eocd);

        let err = parser(truncated).list_files().await.unwrap_err();
        assert!(matches!(err, Error::ArchiveFormat(_)));
    }

    #[tokio::test]
    async fn data_offset_skips_the_local_header() {
        let bytes = archive_with(&["name"]);
        let parser = parser(bytes);
        let entries = parser.list_files().await.unwrap();
        assert_eq!(parser.get_data_offset(&entries[0]).await.unwrap(), 30 + 4);
    }
}
