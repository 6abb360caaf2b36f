use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};
use std::time::SystemTime;

use time::{OffsetDateTime, UtcOffset};

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::format("bad end of central directory record"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(Self::SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.disk_number)?;
        out.write_u16::<LittleEndian>(self.disk_with_cd)?;
        out.write_u16::<LittleEndian>(self.disk_entries)?;
        out.write_u16::<LittleEndian>(self.total_entries)?;
        out.write_u32::<LittleEndian>(self.cd_size)?;
        out.write_u32::<LittleEndian>(self.cd_offset)?;
        out.write_u16::<LittleEndian>(self.comment_len)?;
        Ok(())
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EOCDLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::format("bad ZIP64 end of central directory locator"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64EOCD {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::format("bad ZIP64 end of central directory record"));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Version 2.0: deflate and directories.
pub const VERSION_NEEDED: u16 = 20;

/// General purpose flag bit 11: name and comment are UTF-8.
pub const FLAG_UTF8: u16 = 0x0800;

/// Host systems in the high byte of "version made by".
pub const HOST_UNIX: u8 = 3;
pub const HOST_OSX: u8 = 19;

/// MS-DOS attributes in the low byte of the external attributes.
pub const DOS_READONLY: u32 = 0x01;
pub const DOS_DIRECTORY: u32 = 0x10;

/// Unix file type bits.
pub const S_IFMT: u32 = 0o170000;
pub const S_IFDIR: u32 = 0o040000;
pub const S_IFREG: u32 = 0o100000;

pub const DEFAULT_DIR_MODE: u32 = 0o755;
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// MS-DOS packed date and time, as stored in zip headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub time: u16,
    pub date: u16,
}

impl DosDateTime {
    /// 1980-01-01 00:00:00, the earliest representable instant.
    pub const EPOCH: DosDateTime = DosDateTime {
        time: 0,
        date: (1 << 5) | 1,
    };

    pub fn from_datetime(dt: OffsetDateTime) -> Self {
        let year = dt.year();
        if !(1980..=2107).contains(&year) {
            return Self::EPOCH;
        }
        let date = (((year - 1980) as u16) << 9)
            | ((u8::from(dt.month()) as u16) << 5)
            | dt.day() as u16;
        let time =
            ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (dt.second() as u16 / 2);
        Self { time, date }
    }

    /// Convert a filesystem timestamp, in local time when the offset is known.
    pub fn from_system_time(t: SystemTime) -> Self {
        let utc = OffsetDateTime::from(t);
        let local = UtcOffset::current_local_offset()
            .map(|offset| utc.to_offset(offset))
            .unwrap_or(utc);
        Self::from_datetime(local)
    }
}

/// An entry about to be written to the archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Encoded name; directories end with `/`.
    pub name: Vec<u8>,
    pub is_directory: bool,
    /// Unix `st_mode`, type bits included.
    pub mode: u32,
    pub modified: DosDateTime,
    /// Set the UTF-8 name flag.
    pub utf8: bool,
}

impl ArchiveEntry {
    pub fn flags(&self) -> u16 {
        if self.utf8 { FLAG_UTF8 } else { 0 }
    }

    pub fn external_attrs(&self) -> u32 {
        let mut attrs = self.mode << 16;
        if self.is_directory {
            attrs |= DOS_DIRECTORY;
        }
        if self.mode & 0o200 == 0 {
            attrs |= DOS_READONLY;
        }
        attrs
    }
}

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    /// Name bytes as stored; decode with the configured charset.
    pub file_name: Vec<u8>,
    pub version_made_by: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub external_attrs: u32,
    pub is_directory: bool,
}

impl ZipFileEntry {
    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    /// Whether the writer flagged the name as UTF-8.
    pub fn is_utf8(&self) -> bool {
        self.flags & FLAG_UTF8 != 0
    }

    pub fn host_system(&self) -> u8 {
        (self.version_made_by >> 8) as u8
    }

    /// Unix mode bits carried in the external attributes, if any.
    pub fn unix_mode(&self) -> Option<u32> {
        match self.host_system() {
            HOST_UNIX | HOST_OSX => Some(self.external_attrs >> 16).filter(|&m| m != 0),
            _ => None,
        }
    }

    /// Permission bits to create the entry with.
    pub fn permissions(&self) -> u32 {
        if let Some(mode) = self.unix_mode() {
            return mode & 0o777;
        }
        if self.is_directory {
            DEFAULT_DIR_MODE
        } else if self.external_attrs & DOS_READONLY != 0 {
            0o444
        } else {
            DEFAULT_FILE_MODE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn entry(version_made_by: u16, external_attrs: u32, is_directory: bool) -> ZipFileEntry {
        ZipFileEntry {
            file_name: b"x".to_vec(),
            version_made_by,
            flags: 0,
            compression_method: CompressionMethod::Stored,
            compressed_size: 0,
            uncompressed_size: 0,
            crc32: 0,
            lfh_offset: 0,
            last_mod_time: 0,
            last_mod_date: 0,
            external_attrs,
            is_directory,
        }
    }

    #[test]
    fn dos_datetime_round_trips_through_entry_accessors() {
        let dos = DosDateTime::from_datetime(datetime!(2024-03-15 13:45:30 UTC));
        let mut e = entry(0, 0, false);
        e.last_mod_time = dos.time;
        e.last_mod_date = dos.date;
        assert_eq!(e.mod_date(), (2024, 3, 15));
        assert_eq!(e.mod_time(), (13, 45, 30));
    }

    #[test]
    fn dos_datetime_clamps_before_1980() {
        let dos = DosDateTime::from_datetime(datetime!(1970-01-01 00:00:00 UTC));
        assert_eq!(dos, DosDateTime::EPOCH);
    }

    #[test]
    fn unix_mode_comes_from_external_attrs() {
        let e = entry((3 << 8) | 20, (S_IFREG | 0o600) << 16, false);
        assert_eq!(e.unix_mode(), Some(S_IFREG | 0o600));
        assert_eq!(e.permissions(), 0o600);
    }

    #[test]
    fn unix_directory_mode_is_kept() {
        let e = entry((3 << 8) | 20, ((S_IFDIR | 0o750) << 16) | DOS_DIRECTORY, true);
        assert_eq!(e.permissions(), 0o750);
    }

    #[test]
    fn utf8_flag_is_reported() {
        let mut e = entry(20, 0, false);
        assert!(!e.is_utf8());
        e.flags = FLAG_UTF8;
        assert!(e.is_utf8());
    }

    #[test]
    fn dos_entries_fall_back_to_default_modes() {
        assert_eq!(entry(20, DOS_DIRECTORY, true).permissions(), DEFAULT_DIR_MODE);
        assert_eq!(entry(20, 0, false).permissions(), DEFAULT_FILE_MODE);
        assert_eq!(entry(20, DOS_READONLY, false).permissions(), 0o444);
    }

    #[test]
    fn archive_entry_external_attrs() {
        let dir = ArchiveEntry {
            name: b"proj/".to_vec(),
            is_directory: true,
            mode: S_IFDIR | 0o755,
            modified: DosDateTime::EPOCH,
            utf8: false,
        };
        assert_eq!(dir.external_attrs(), ((S_IFDIR | 0o755) << 16) | DOS_DIRECTORY);
        assert_eq!(dir.flags(), 0);
    }
}
