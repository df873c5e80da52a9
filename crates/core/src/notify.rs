//! Issue reporting and the per-run session log.
//!
//! Every problem found during a run is one [`Issue`]. Issues carry a fixed
//! code and render to a single tab-separated log line; the session log
//! writes those lines to `logfile_<timestamp>.txt` in the output folder and
//! echoes them to the console.

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// How an issue affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// Aborts the whole run.
    Fatal,
    /// Skips one folder or file.
    Error,
    /// Recorded, but the file is still processed.
    Warning,
}

/// A single error or warning of the fixed taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issue {
    /// ERROR 1: no usable output folder.
    MissingOutputFolder,
    /// ERROR 2: no usable input folder.
    MissingInputFolder,
    /// ERROR 3: no usable student table.
    MissingRoster,
    /// ERROR 4: the student table repeats anonymous IDs.
    DuplicateAnonIds(Vec<String>),
    /// ERROR 5: an entry of the input folder is not a directory.
    NotADirectory(PathBuf),
    /// ERROR 6: no file in the folder contains the folder's name.
    NoMatchingFile(PathBuf),
    /// ERROR 7: several files in the folder contain the folder's name.
    TooManyMatchingFiles(PathBuf),
    /// ERROR 8: the folder's surname is not in the student table.
    SurnameNotFound { file: PathBuf, surname: String },
    /// ERROR 9: the ID in the filename is not on record for the surname.
    IdMismatch {
        file: PathBuf,
        id: String,
        on_record: Vec<String>,
    },
    /// ERROR 10: a folder or file could not be read or copied.
    Unprocessable { path: PathBuf, reason: String },
    /// WARN 1: the surname has several IDs on record; `id` was used.
    AmbiguousSurname {
        file: PathBuf,
        surname: String,
        id: String,
    },
    /// WARN 2: the filename token is not on record, so the ID from the
    /// folder name was used.
    FolderIdUsed {
        file: PathBuf,
        surname: String,
        token: String,
        id: String,
    },
}

impl Issue {
    /// The numeric code written at the end of the log line.
    ///
    /// Warnings have their own numbering, starting at 1.
    pub fn code(&self) -> u8 {
        match self {
            Issue::MissingOutputFolder => 1,
            Issue::MissingInputFolder => 2,
            Issue::MissingRoster => 3,
            Issue::DuplicateAnonIds(_) => 4,
            Issue::NotADirectory(_) => 5,
            Issue::NoMatchingFile(_) => 6,
            Issue::TooManyMatchingFiles(_) => 7,
            Issue::SurnameNotFound { .. } => 8,
            Issue::IdMismatch { .. } => 9,
            Issue::Unprocessable { .. } => 10,
            Issue::AmbiguousSurname { .. } => 1,
            Issue::FolderIdUsed { .. } => 2,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Issue::MissingOutputFolder
            | Issue::MissingInputFolder
            | Issue::MissingRoster
            | Issue::DuplicateAnonIds(_) => Severity::Fatal,
            Issue::AmbiguousSurname { .. } | Issue::FolderIdUsed { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// The human readable part of the line, including its context column.
    fn message(&self) -> String {
        match self {
            Issue::MissingOutputFolder => "ERROR - Output folder must be specified".to_string(),
            Issue::MissingInputFolder => "ERROR - Input folder must be specified".to_string(),
            Issue::MissingRoster => "ERROR - Student list must be specified".to_string(),
            Issue::DuplicateAnonIds(ids) => format!(
                "ERROR - Non-unique student IDs in student table: {}",
                ids.join(",")
            ),
            Issue::NotADirectory(path) => {
                format!("{}\tNot processed - Not a directory", path.display())
            }
            Issue::NoMatchingFile(path) => {
                format!("{}\tNot processed - No matching files found", path.display())
            }
            Issue::TooManyMatchingFiles(path) => format!(
                "{}\tNot processed - Too many matching files found",
                path.display()
            ),
            Issue::SurnameNotFound { file, surname } => format!(
                "{}\tNot processed - last name {} not found in student list",
                file.display(),
                surname
            ),
            Issue::IdMismatch {
                file,
                id,
                on_record,
            } => format!(
                "{}\tNot processed - ID {} doesn't match ID {} found in student list",
                file.display(),
                id,
                on_record.join(",")
            ),
            Issue::Unprocessable { path, reason } => {
                format!("{}\tNot processed - {}", path.display(), reason)
            }
            Issue::AmbiguousSurname { file, surname, id } => format!(
                "{}\tStudent name {} has more than one entry, using {}",
                file.display(),
                surname,
                id
            ),
            Issue::FolderIdUsed {
                file,
                surname,
                token,
                id,
            } => format!(
                "{}\tID {} not found for {} in student list, using folder ID {}",
                file.display(),
                token,
                surname,
                id
            ),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity() {
            Severity::Warning => "WARN",
            _ => "ERROR",
        };
        write!(f, "{}\t{} {}", self.message(), tag, self.code())
    }
}

/// Build the log file name for a run started at `now`.
pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("logfile_{}.txt", now.format("%Y%m%d-%H:%M:%S"))
}

/// Append-only log of the issues met during one run.
///
/// Lines are written to the sink and echoed to stdout. The log must be
/// consumed by [`SessionLog::close`] or [`SessionLog::abort`] so that the
/// sink is flushed on every exit path.
#[derive(Debug)]
pub struct SessionLog<W: Write> {
    sink: W,
    echo: bool,
    errors: usize,
    warnings: usize,
}

impl SessionLog<BufWriter<File>> {
    /// Create `logfile_<timestamp>.txt` inside `output_dir`.
    pub fn create(output_dir: &Path, now: DateTime<Local>) -> Result<(Self, PathBuf)> {
        let path = output_dir.join(log_file_name(now));
        let file = File::create(&path)?;
        log::debug!("Session log opened at {}", path.display());
        Ok((Self::new(BufWriter::new(file)), path))
    }
}

impl<W: Write> SessionLog<W> {
    /// Wrap an arbitrary sink.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            echo: true,
            errors: 0,
            warnings: 0,
        }
    }

    /// Turn console echo on or off.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Record a per-folder/per-file error or a warning and carry on.
    pub fn record(&mut self, issue: &Issue) -> Result<()> {
        let line = issue.to_string();
        match issue.severity() {
            Severity::Warning => {
                self.warnings += 1;
                log::warn!("{}", line);
            }
            _ => {
                self.errors += 1;
                log::error!("{}", line);
            }
        }
        if self.echo {
            println!("{}", line);
        }
        writeln!(self.sink, "{}", line)?;
        Ok(())
    }

    /// Record a fatal issue, close the log and hand back the error that
    /// stops the run.
    pub fn abort(mut self, issue: Issue) -> Error {
        let line = issue.to_string();
        log::error!("{}", line);
        // Write failures are logged, not returned
        if let Err(e) = writeln!(self.sink, "{}", line).and_then(|_| self.sink.flush()) {
            log::error!("Failed to write session log: {}", e);
        }
        Error::Configuration(issue)
    }

    /// Record an error outside the issue taxonomy that stops the run, close
    /// the log and hand the error back.
    pub fn fail(mut self, error: Error) -> Error {
        let line = format!("ERROR - {}", error);
        log::error!("{}", line);
        if let Err(e) = writeln!(self.sink, "{}", line).and_then(|_| self.sink.flush()) {
            log::error!("Failed to write session log: {}", e);
        }
        error
    }

    /// Flush and close the log on the normal path.
    pub fn close(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Whether lines are echoed to the console.
    pub fn echoes(&self) -> bool {
        self.echo
    }

    /// Number of per-item errors recorded so far.
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Number of warnings recorded so far.
    pub fn warnings(&self) -> usize {
        self.warnings
    }
}
