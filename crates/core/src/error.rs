//! Error types for submission anonymisation and notes stripping.

use crate::notify::Issue;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop a run.
///
/// Per-folder and per-file problems are not errors: they are recorded as
/// [`Issue`]s in the session log and the run moves on.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A fatal configuration problem (ERROR 1 to 4).
    #[error("{0}")]
    Configuration(Issue),

    /// The student table could not be read as a roster.
    #[error("Invalid student table: {0}")]
    RosterFormat(String),

    /// Input and output resolve to the same location.
    #[error("Output must differ from input: {}", .0.display())]
    SameInputOutput(PathBuf),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The archive is not a usable presentation package.
    #[error("Invalid presentation package: {0}")]
    InvalidPackage(String),
}

impl Error {
    /// The issue code, when this error is one of the fatal configuration errors.
    pub fn issue_code(&self) -> Option<u8> {
        match self {
            Error::Configuration(issue) => Some(issue.code()),
            _ => None,
        }
    }
}
