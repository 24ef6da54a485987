use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed error raised by a file-format reader.
pub type FormatError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while indexing a directory tree or loading its files.
#[derive(Error, Debug)]
pub enum Error {
    /// A requested file index lies outside `[0, count)`.
    #[error("Index {index} out of bounds for {count} files.")]
    OutOfRange { index: usize, count: usize },

    #[error("Label '{0}' does not exist.")]
    UnknownLabel(String),

    /// The file set was built without a concrete loader.
    #[error("no loader is bound, so files cannot be loaded")]
    NotImplemented,

    /// Reader error for malformed file content, passed through untouched.
    #[error(transparent)]
    Format(FormatError),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid file extension: '{0}'")]
    InvalidExtension(String),

    /// Two directories produced the same label.
    #[error("Label '{label}' is produced by both {} and {}", first.display(), second.display())]
    DuplicateLabel {
        label: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Wrap any reader error as [`Error::Format`].
    pub fn format<E>(err: E) -> Self
    where
        E: Into<FormatError>,
    {
        Error::Format(err.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
