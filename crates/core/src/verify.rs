//! Checking the ID carried by a submitted file against the roster.

use crate::matcher::SubmissionFolder;
use crate::roster::RosterIndex;

/// Result of checking one matched file against the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The ID is on record for the surname.
    ///
    /// `ambiguous` is set when the surname has more than one ID on record.
    /// `unmatched_token` holds the filename token when it was not on record
    /// and the folder's ID segment was used instead.
    Verified {
        id: String,
        ambiguous: bool,
        unmatched_token: Option<String>,
    },
    /// The surname does not appear in the roster.
    SurnameNotFound { surname: String },
    /// The surname is known but none of the file's IDs are on record for it.
    IdMismatch { id: String, on_record: Vec<String> },
}

/// The ID embedded in a filename: the token after the last underscore, up
/// to the first period.
///
/// `B.Ahmed_30192844_assignsubmission_file_7859K.docx` gives `7859K`.
pub fn embedded_id(filename: &str) -> &str {
    let last = filename.rsplit('_').next().unwrap_or(filename);
    last.split('.').next().unwrap_or(last)
}

/// The text after the last period, if there is one.
pub fn extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Name of the anonymised copy: `<id>.<ext>`, or just `<id>` when the
/// submitted file has no extension.
pub fn output_name(id: &str, filename: &str) -> String {
    match extension(filename) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

/// Check the file matched in `folder` against the roster.
///
/// The token embedded in the filename is tried first. When it is not on
/// record, the ID segment of the folder name is tried, since the export
/// tool writes the student's ID there; the verdict then carries the
/// filename token so the substitution can be logged. Mismatches are
/// reported against the filename token.
pub fn verify(filename: &str, folder: &SubmissionFolder, index: &RosterIndex) -> Verdict {
    let surname = folder.surname();
    let Some(ids) = index.ids_for(&surname) else {
        return Verdict::SurnameNotFound { surname };
    };

    let file_id = embedded_id(filename);
    let candidates = std::iter::once(file_id).chain(folder.id_segment());

    for candidate in candidates {
        if ids.contains(candidate) {
            return Verdict::Verified {
                id: candidate.to_string(),
                ambiguous: ids.len() > 1,
                unmatched_token: (candidate != file_id).then(|| file_id.to_string()),
            };
        }
    }

    Verdict::IdMismatch {
        id: file_id.to_string(),
        on_record: ids.iter().cloned().collect(),
    }
}
