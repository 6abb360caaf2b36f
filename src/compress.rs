//! Directory tree to zip archive.

use std::io::BufWriter;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::charset::Encoding;
use crate::config::Options;
use crate::error::{PathContext, Result};
use crate::walk::{FileId, FilesystemEntry, Walker};
use crate::zip::{ArchiveEntry, DosDateTime, ZipWriter};

/// Compress `source` into a zip archive at `destination`.
///
/// The archive is assembled in a temporary file beside `destination` and
/// renamed over it only once complete; on error the temporary file is removed
/// and an existing `destination` is left as it was. Neither the temporary file
/// nor the previous `destination` is ever added to the archive.
///
/// Returns the number of entries written.
pub async fn compress(source: &Path, destination: &Path, options: &Options) -> Result<usize> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut builder = tempfile::Builder::new();
    builder.prefix(".zipcn-").suffix(".tmp");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o644));
    }
    let temp = builder.tempfile_in(parent).at(parent)?;

    let mut excluded = vec![FileId::of_path(temp.path())?];
    if let Ok(existing) = FileId::of_path(destination) {
        excluded.push(existing);
    }

    let (temp, count) = write_archive(source, temp, &excluded, options).await?;
    temp.persist(destination)
        .map_err(|e| e.error)
        .at(destination)?;
    Ok(count)
}

async fn write_archive(
    source: &Path,
    temp: NamedTempFile,
    excluded: &[FileId],
    options: &Options,
) -> Result<(NamedTempFile, usize)> {
    let mut writer = ZipWriter::new(BufWriter::new(temp));
    let mut count = 0;

    for entry in Walker::new(source)? {
        let entry = entry?;
        if !entry.is_dir && excluded.contains(&entry.id) {
            continue;
        }
        if options.verbose {
            println!("  adding: {}", entry.path.display());
        }

        let header = archive_entry(&entry, options)?;
        if entry.is_dir {
            writer.add_directory(header)?;
        } else {
            let data = tokio::fs::read(&entry.path).await.at(&entry.path)?;
            writer.add_file(header, &data)?;
        }
        count += 1;
    }

    let temp = writer
        .finish()?
        .into_inner()
        .map_err(|e| e.into_error())?;
    Ok((temp, count))
}

/// Map a walked entry to its archive header, transcoding the name.
pub fn archive_entry(entry: &FilesystemEntry, options: &Options) -> Result<ArchiveEntry> {
    let mut name = options.encoding.encode(&entry.name)?;
    if entry.is_dir {
        name.push(b'/');
    }
    Ok(ArchiveEntry {
        utf8: options.encoding == Encoding::Utf8 && !entry.name.is_ascii(),
        name,
        is_directory: entry.is_dir,
        mode: entry.mode,
        modified: DosDateTime::from_system_time(entry.modified),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn fs_entry(name: &str, is_dir: bool) -> FilesystemEntry {
        FilesystemEntry {
            path: PathBuf::from(name),
            name: name.to_string(),
            is_dir,
            mode: 0o100644,
            modified: SystemTime::UNIX_EPOCH,
            id: FileId::Path(PathBuf::from(name)),
        }
    }

    #[test]
    fn directories_get_a_trailing_slash() {
        let header = archive_entry(&fs_entry("proj/sub", true), &Options::default()).unwrap();
        assert_eq!(header.name, b"proj/sub/");
        assert!(header.is_directory);
        assert!(!header.utf8);
    }

    #[test]
    fn non_ascii_utf8_names_set_the_flag() {
        let header = archive_entry(&fs_entry("文件.txt", false), &Options::default()).unwrap();
        assert!(header.utf8);
        assert_eq!(header.name, "文件.txt".as_bytes());
    }

    #[test]
    fn gbk_names_are_encoded_without_the_flag() {
        let options = Options {
            encoding: Encoding::Gbk,
            verbose: false,
        };
        let header = archive_entry(&fs_entry("你好", false), &options).unwrap();
        assert!(!header.utf8);
        assert_eq!(header.name, [0xc4, 0xe3, 0xba, 0xc3]);
    }

    #[test]
    fn unmappable_names_fail() {
        let options = Options {
            encoding: Encoding::Gbk,
            verbose: false,
        };
        assert!(archive_entry(&fs_entry("😀", false), &options).is_err());
    }
}
