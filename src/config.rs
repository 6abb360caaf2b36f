//! Run configuration, resolved once from the command line.

use std::path::{Path, PathBuf};

use crate::charset::Encoding;
use crate::cli::Cli;
use crate::error::{Error, Result};

/// Settings shared by every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    pub encoding: Encoding,
    pub verbose: bool,
}

/// What this run does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Compress {
        source: PathBuf,
        destination: PathBuf,
    },
    /// `archive: None` reads the archive from standard input.
    Extract {
        archive: Option<PathBuf>,
        directory: PathBuf,
    },
    List {
        archive: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub options: Options,
    pub task: Task,
}

impl Config {
    /// Validate the command line. The charset is checked first, before any
    /// path is looked at.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let encoding: Encoding = cli.charset.parse()?;
        let options = Options {
            encoding,
            verbose: cli.verbose,
        };

        let task = if cli.extract || cli.list {
            let archive = match cli.paths.as_slice() {
                [] => None,
                [archive] => Some(archive.clone()),
                _ => return Err(Error::Usage("expected at most one archive".into())),
            };
            if cli.list {
                Task::List { archive }
            } else {
                Task::Extract {
                    archive,
                    directory: cli.extract_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
                }
            }
        } else {
            let (source, destination) = match cli.paths.as_slice() {
                [] => (PathBuf::from("."), None),
                [source] => (source.clone(), None),
                [source, destination] => (source.clone(), Some(destination.clone())),
                _ => {
                    return Err(Error::Usage(
                        "expected a source path and at most one destination".into(),
                    ));
                }
            };
            let destination = match destination {
                Some(d) => d,
                None => default_destination(&source),
            };
            Task::Compress {
                source,
                destination,
            }
        };

        Ok(Self { options, task })
    }
}

/// `<name of source>.zip` in the current directory.
pub fn default_destination(source: &Path) -> PathBuf {
    let name = std::path::absolute(source)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_os_string()))
        .or_else(|| {
            source
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_os_string()))
        });
    match name {
        Some(mut name) => {
            name.push(".zip");
            PathBuf::from(name)
        }
        None => PathBuf::from("archive.zip"),
    }
}
