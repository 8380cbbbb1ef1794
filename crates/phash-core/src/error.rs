use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Which argument of a two-digest comparison an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestSide {
    /// First argument
    X,

    /// Second argument
    Y,
}

impl fmt::Display for DigestSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
        }
    }
}

/// Custom error types for the phash library
#[derive(Error, Debug)]
pub enum Error {
    /// Path does not exist, is not a regular file, or cannot be opened
    #[error("File not readable: {}", .path.display())]
    FileNotReadable { path: PathBuf },

    /// Digest has no coefficient sequence or an inconsistent size
    #[error("Malformed digest: argument {which} has no valid coefficient sequence")]
    MalformedDigest { which: DigestSide },

    /// Argument cannot be marshalled for the native engine
    #[error("Invalid argument '{param}': {reason}")]
    InvalidArgument { param: &'static str, reason: String },

    /// The hash engine reported a failure status
    #[error("Library failure in {operation}: {detail}")]
    LibraryFailure {
        operation: &'static str,
        detail: String,
    },

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn invalid_argument(param: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            param,
            reason: reason.into(),
        }
    }

    pub(crate) fn library(operation: &'static str, detail: impl Into<String>) -> Self {
        Error::LibraryFailure {
            operation,
            detail: detail.into(),
        }
    }
}
