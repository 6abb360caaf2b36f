//! Zip archive to directory tree.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Options;
use crate::error::{Error, PathContext, Result};
use crate::io::ReadAt;
use crate::zip::ZipExtractor;

/// Extract every entry of the archive behind `reader` into `destination`.
///
/// Entries are processed in central directory order. The first failure
/// aborts the run; entries already written stay on disk. Returns the number
/// of entries extracted.
pub async fn extract<R: ReadAt + 'static>(
    reader: Arc<R>,
    destination: &Path,
    options: &Options,
) -> Result<usize> {
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files().await?;

    tokio::fs::create_dir_all(destination)
        .await
        .at(destination)?;

    for entry in &entries {
        let name = options.encoding.decode(&entry.file_name)?;
        let output_path = resolve_entry_path(destination, &name)?;

        if entry.is_directory {
            if options.verbose {
                println!("   creating: {}", output_path.display());
            }
            extractor
                .extract_directory(&output_path, entry.permissions())
                .await?;
        } else {
            if options.verbose {
                println!("  inflating: {}", output_path.display());
            }
            extractor
                .extract_to_file(entry, &output_path, entry.permissions())
                .await?;
        }
    }

    Ok(entries.len())
}

/// Join decoded entry name bytes onto the destination directory.
///
/// Empty and `.` segments are dropped, so absolute names land inside
/// `destination`. Names with a `..` segment or a NUL byte are rejected.
pub fn resolve_entry_path(destination: &Path, name: &[u8]) -> Result<PathBuf> {
    let unsafe_name = || Error::UnsafeEntryPath {
        name: String::from_utf8_lossy(name).into_owned(),
    };
    if name.contains(&0) {
        return Err(unsafe_name());
    }

    let mut path = destination.to_path_buf();
    for segment in name.split(|&b| b == b'/' || b == b'\\') {
        match segment {
            b"" | b"." => {}
            b".." => return Err(unsafe_name()),
            s if cfg!(windows) && s.contains(&b':') => return Err(unsafe_name()),
            s => path.push(segment_to_os(s)),
        }
    }
    Ok(path)
}

#[cfg(unix)]
fn segment_to_os(segment: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(segment).to_os_string()
}

#[cfg(not(unix))]
fn segment_to_os(segment: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(segment).into_owned())
}
