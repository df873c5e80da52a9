//! The anonymisation run: folders in, `<ID>.<ext>` copies out.

use crate::error::{Error, Result};
use crate::matcher::{scan_input, FolderMatch, SubmissionFolder};
use crate::notify::{Issue, SessionLog};
use crate::roster::{Roster, RosterIndex};
use crate::verify::{output_name, verify, Verdict};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The three locations a run needs. Any of them may be missing, which is
/// reported as the matching fatal issue.
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
    /// Folder holding one sub-folder per student.
    pub input_dir: Option<PathBuf>,
    /// Folder receiving the anonymised copies and the session log.
    pub output_dir: Option<PathBuf>,
    /// Tab-separated student table.
    pub roster_path: Option<PathBuf>,
    /// Keep issue lines and progress off the console.
    pub quiet: bool,
}

/// One file copied under its anonymous name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// What a completed run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Path of the session log.
    pub log_path: PathBuf,
    /// Number of student folders examined.
    pub folders_scanned: usize,
    /// Files copied, in processing order.
    pub copied: Vec<CopiedFile>,
    /// Per-folder and per-file errors recorded.
    pub errors: usize,
    /// Warnings recorded.
    pub warnings: usize,
}

/// Runs the anonymisation over a set of submission folders.
#[derive(Debug, Clone)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Run now.
    pub fn run(&self) -> Result<RunSummary> {
        self.run_at(Local::now())
    }

    /// Run with the session log named after `started`.
    ///
    /// Fatal issues close the log and are returned as
    /// [`Error::Configuration`]; other errors that stop the run are written
    /// to the log as well. Per-item issues, including unreadable folders and
    /// failed copies, are logged and skipped; they never fail the run.
    pub fn run_at(&self, started: DateTime<Local>) -> Result<RunSummary> {
        // Nowhere to put a log yet, so this one is only returned
        let output_dir = match existing(&self.config.output_dir, Path::is_dir) {
            Some(dir) => dir,
            None => return Err(Error::Configuration(Issue::MissingOutputFolder)),
        };

        let (log, log_path) = SessionLog::create(output_dir, started)?;
        let mut log = log.with_echo(!self.config.quiet);

        let Some(input_dir) = existing(&self.config.input_dir, Path::is_dir) else {
            return Err(log.abort(Issue::MissingInputFolder));
        };
        let Some(roster_path) = existing(&self.config.roster_path, Path::is_file) else {
            return Err(log.abort(Issue::MissingRoster));
        };

        let roster = match Roster::from_path(roster_path) {
            Ok(roster) => roster,
            Err(Error::Configuration(issue)) => return Err(log.abort(issue)),
            Err(e) => return Err(log.fail(e)),
        };
        log::info!(
            "Loaded {} students from {}",
            roster.len(),
            roster_path.display()
        );

        let mut summary = RunSummary {
            log_path,
            ..RunSummary::default()
        };
        let outcome = process_input(input_dir, output_dir, &roster.index(), &mut log, &mut summary);

        if let Err(e) = outcome {
            return Err(log.fail(e));
        }

        summary.errors = log.errors();
        summary.warnings = log.warnings();
        log.close()?;

        Ok(summary)
    }
}

/// The configured path, if it was given and passes `check`.
fn existing<'a>(path: &'a Option<PathBuf>, check: fn(&Path) -> bool) -> Option<&'a Path> {
    path.as_deref()
        .filter(|p| !p.as_os_str().is_empty() && check(p))
}

fn process_input<W: Write>(
    input_dir: &Path,
    output_dir: &Path,
    index: &RosterIndex,
    log: &mut SessionLog<W>,
    summary: &mut RunSummary,
) -> Result<()> {
    let (folders, strays) = scan_input(input_dir)?;

    for stray in strays {
        log.record(&Issue::NotADirectory(stray))?;
    }

    for folder in &folders {
        summary.folders_scanned += 1;
        if let Some(copied) = process_folder(folder, output_dir, index, log)? {
            summary.copied.push(copied);
        }
    }

    Ok(())
}

/// Handle one student folder. Returns the copy made, if any.
pub fn process_folder<W: Write>(
    folder: &SubmissionFolder,
    output_dir: &Path,
    index: &RosterIndex,
    log: &mut SessionLog<W>,
) -> Result<Option<CopiedFile>> {
    if log.echoes() {
        println!("Processing folder {}", folder.path.display());
    }

    let entries = match folder.list_entries() {
        Ok(entries) => entries,
        Err(e) => {
            log.record(&Issue::Unprocessable {
                path: folder.path.clone(),
                reason: format!("Cannot read folder: {}", e),
            })?;
            return Ok(None);
        }
    };
    let filename = match folder.match_entries(&entries) {
        FolderMatch::Unique(name) => name,
        FolderMatch::NoMatch => {
            log.record(&Issue::NoMatchingFile(folder.path.clone()))?;
            return Ok(None);
        }
        FolderMatch::TooMany(found) => {
            log::debug!("Candidates in {}: {:?}", folder.path.display(), found);
            log.record(&Issue::TooManyMatchingFiles(folder.path.clone()))?;
            return Ok(None);
        }
    };

    let source = folder.path.join(&filename);
    let id = match verify(&filename, folder, index) {
        Verdict::Verified {
            id,
            ambiguous,
            unmatched_token,
        } => {
            if let Some(token) = unmatched_token {
                log.record(&Issue::FolderIdUsed {
                    file: source.clone(),
                    surname: folder.surname(),
                    token,
                    id: id.clone(),
                })?;
            }
            if ambiguous {
                log.record(&Issue::AmbiguousSurname {
                    file: source.clone(),
                    surname: folder.surname(),
                    id: id.clone(),
                })?;
            }
            id
        }
        Verdict::SurnameNotFound { surname } => {
            log.record(&Issue::SurnameNotFound {
                file: source,
                surname,
            })?;
            return Ok(None);
        }
        Verdict::IdMismatch { id, on_record } => {
            log.record(&Issue::IdMismatch {
                file: source,
                id,
                on_record,
            })?;
            return Ok(None);
        }
    };

    let destination = output_dir.join(output_name(&id, &filename));
    if let Err(e) = fs::copy(&source, &destination) {
        log.record(&Issue::Unprocessable {
            path: source,
            reason: format!("Cannot copy to {}: {}", destination.display(), e),
        })?;
        return Ok(None);
    }
    log::debug!("Copied {} to {}", source.display(), destination.display());

    Ok(Some(CopiedFile {
        source,
        destination,
    }))
}

