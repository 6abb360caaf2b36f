use std::io;
use std::path::PathBuf;

use crate::charset::Encoding;

/// Errors produced while compressing, extracting or listing an archive.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported charset: {0}")]
    UnsupportedEncoding(String),

    #[error("cannot transcode {name:?} with charset {encoding}")]
    Transcoding { name: String, encoding: Encoding },

    #[error("invalid zip archive: {0}")]
    ArchiveFormat(String),

    #[error("entry {name:?} would be written outside the destination directory")]
    UnsafeEntryPath { name: String },

    #[error("path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("{0}")]
    Usage(String),

    #[error("{}: {source}", .path.display())]
    File { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::ArchiveFormat(msg.into())
    }
}

/// Attaches the offending path to an I/O error.
pub(crate) trait PathContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> PathContext<T> for std::result::Result<T, io::Error> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|source| Error::File {
            path: path.into(),
            source,
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
