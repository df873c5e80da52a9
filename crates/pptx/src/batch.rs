//! Stripping notes from every presentation in a folder.

use crate::notes::{NotesStripper, StripReport};
use anonmark_core::{Error, Issue, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A presentation written without notes.
#[derive(Debug, Clone, Serialize)]
pub struct StrippedDeck {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub report: StripReport,
}

/// A presentation that could not be processed.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDeck {
    pub source: PathBuf,
    pub reason: String,
}

/// Outcome of a folder run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub stripped: Vec<StrippedDeck>,
    pub failed: Vec<FailedDeck>,
}

/// Whether a path names a .pptx file (extension compared case-insensitively).
pub fn is_pptx(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pptx"))
}

/// Strip notes from every .pptx in `input_dir`, writing each result under
/// the same file name in `output_dir`.
///
/// Missing folders, or an output folder that is the input folder, stop the
/// run before anything is written. A file that fails is reported and
/// skipped.
pub fn strip_folder(input_dir: &Path, output_dir: &Path) -> Result<BatchSummary> {
    if !input_dir.is_dir() {
        return Err(Error::Configuration(Issue::MissingInputFolder));
    }
    if !output_dir.is_dir() {
        return Err(Error::Configuration(Issue::MissingOutputFolder));
    }
    if input_dir.canonicalize()? == output_dir.canonicalize()? {
        return Err(Error::SameInputOutput(output_dir.to_path_buf()));
    }

    let mut decks: Vec<PathBuf> = fs::read_dir(input_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    decks.retain(|p| is_pptx(p));
    decks.sort();

    let stripper = NotesStripper::new();
    let mut summary = BatchSummary::default();

    for source in decks {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let destination = output_dir.join(file_name);

        match stripper.strip_file(&source, &destination) {
            Ok(report) => {
                log::info!("{}", report.describe(&source));
                summary.stripped.push(StrippedDeck {
                    source,
                    destination,
                    report,
                });
            }
            Err(e) => {
                log::error!("Failed to strip notes from {}: {}", source.display(), e);
                // Drop any partial output
                if !matches!(e, Error::SameInputOutput(_)) && destination.exists() {
                    if let Err(cleanup) = fs::remove_file(&destination) {
                        log::warn!(
                            "Failed to remove partial output {}: {}",
                            destination.display(),
                            cleanup
                        );
                    }
                }
                summary.failed.push(FailedDeck {
                    source,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}
