//! Source tree traversal for compression.
//!
//! [`Walker`] yields one [`FilesystemEntry`] per file or directory in
//! pre-order (a directory before its children), children in the order the
//! filesystem lists them. Each entry already carries its archive name, so
//! the archiver only has to transcode and write it.

use std::fs::Metadata;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use walkdir::WalkDir;

use crate::error::{Error, PathContext, Result};

/// Identity of a file on disk, used to keep the output archive out of itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileId {
    #[cfg(unix)]
    Inode { dev: u64, ino: u64 },
    Path(PathBuf),
}

impl FileId {
    pub fn of_path(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            let meta = std::fs::metadata(path).at(path)?;
            Ok(Self::from_metadata(&meta))
        }
        #[cfg(not(unix))]
        {
            Ok(Self::Path(path.canonicalize().at(path)?))
        }
    }

    #[cfg(unix)]
    fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self::Inode {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }
}

/// A file or directory found under the source root.
#[derive(Debug, Clone)]
pub struct FilesystemEntry {
    pub path: PathBuf,
    /// `/`-separated name inside the archive, without a trailing slash.
    pub name: String,
    pub is_dir: bool,
    /// Unix `st_mode`, type bits included.
    pub mode: u32,
    pub modified: SystemTime,
    pub id: FileId,
}

/// Pre-order iterator over a source tree.
pub struct Walker {
    inner: walkdir::IntoIter,
    root: PathBuf,
    prefix: Option<String>,
}

impl Walker {
    /// Walk `root`, naming entries after the root's final path component.
    ///
    /// `.` resolves to the name of the directory it denotes. A root without
    /// a final component (`/`) contributes no entry of its own and its
    /// children are named relative to it.
    pub fn new(root: &Path) -> Result<Self> {
        let canonical = root.canonicalize().at(root)?;
        let prefix = match canonical.file_name() {
            Some(name) => Some(
                name.to_str()
                    .ok_or_else(|| Error::InvalidPath(canonical.clone()))?
                    .to_string(),
            ),
            None => None,
        };
        Ok(Self {
            inner: WalkDir::new(root).follow_links(true).into_iter(),
            root: root.to_path_buf(),
            prefix,
        })
    }

    fn archive_name(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let mut parts: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(
                    part.to_str()
                        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))?,
                ),
                Component::CurDir => {}
                _ => return Err(Error::InvalidPath(path.to_path_buf())),
            }
        }
        Ok(parts.join("/"))
    }

    fn entry(&self, dent: walkdir::DirEntry) -> Result<FilesystemEntry> {
        let path = dent.path().to_path_buf();
        let meta = dent.metadata()?;
        let name = self.archive_name(&path)?;
        let id = {
            #[cfg(unix)]
            {
                FileId::from_metadata(&meta)
            }
            #[cfg(not(unix))]
            {
                FileId::Path(path.canonicalize().at(&path)?)
            }
        };
        Ok(FilesystemEntry {
            is_dir: meta.is_dir(),
            mode: mode_of(&meta),
            modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            name,
            path,
            id,
        })
    }
}

impl Iterator for Walker {
    type Item = Result<FilesystemEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let dent = match self.inner.next()? {
                Ok(dent) => dent,
                Err(e) => return Some(Err(e.into())),
            };
            // The filesystem root has no name of its own.
            if dent.depth() == 0 && self.prefix.is_none() {
                continue;
            }
            return Some(self.entry(dent));
        }
    }
}

#[cfg(unix)]
fn mode_of(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn mode_of(meta: &Metadata) -> u32 {
    use crate::zip::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE, S_IFDIR, S_IFREG};

    let (kind, perm) = if meta.is_dir() {
        (S_IFDIR, DEFAULT_DIR_MODE)
    } else {
        (S_IFREG, DEFAULT_FILE_MODE)
    };
    if meta.permissions().readonly() {
        kind | (perm & 0o555)
    } else {
        kind | perm
    }
}
