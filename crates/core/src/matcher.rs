//! Locating the submitted file inside a student's folder.
//!
//! The export tool names each folder `<display name>_<ID>_assignsubmission_file`,
//! sometimes with the student's initials in front (`B.Ahmed_...`), and
//! names the files inside it after the folder plus a random token
//! (`..._assignsubmission_file_7859K.docx`). A file belongs to the folder
//! when its name contains the folder's name with the initials removed.

use crate::normalize::{clean_name, strip_initials};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A student folder found under the input root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionFolder {
    /// Full path of the folder.
    pub path: PathBuf,
    /// Base name of the folder.
    pub name: String,
    /// Base name with any leading initials removed.
    pub cleaned_name: String,
}

impl SubmissionFolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cleaned_name = strip_initials(&name).to_string();
        Self {
            path,
            name,
            cleaned_name,
        }
    }

    /// Normalized surname: the cleaned name up to its first underscore.
    pub fn surname(&self) -> String {
        let segment = self.cleaned_name.split('_').next().unwrap_or_default();
        clean_name(segment)
    }

    /// The ID slot of the export naming convention, i.e. the segment after
    /// the surname.
    pub fn id_segment(&self) -> Option<&str> {
        self.cleaned_name
            .split('_')
            .nth(1)
            .filter(|segment| !segment.is_empty())
    }

    /// Names of every entry in the folder, sorted.
    pub fn list_entries(&self) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Find the submitted file among this folder's entries.
    pub fn match_entries(&self, entries: &[String]) -> FolderMatch {
        match_entries(&self.cleaned_name, entries)
    }
}

/// Outcome of looking for the submitted file in a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderMatch {
    /// Nothing in the folder carries the folder's name.
    NoMatch,
    /// More than one entry carries it; the folder is skipped.
    TooMany(Vec<String>),
    /// Exactly one entry carries it.
    Unique(String),
}

/// Select every entry whose name contains `cleaned_name`.
///
/// Containment rather than equality, because the export tool appends a
/// token to each file name. An unrelated file that happens to contain the
/// name counts as a second match; it is not disambiguated further.
pub fn match_entries(cleaned_name: &str, entries: &[String]) -> FolderMatch {
    let mut found: Vec<String> = entries
        .iter()
        .filter(|entry| entry.contains(cleaned_name))
        .cloned()
        .collect();

    match found.len() {
        0 => FolderMatch::NoMatch,
        1 => FolderMatch::Unique(found.remove(0)),
        _ => FolderMatch::TooMany(found),
    }
}

/// Split the input root into candidate folders and stray non-directories.
///
/// Both lists are sorted by path.
pub fn scan_input(root: &Path) -> io::Result<(Vec<SubmissionFolder>, Vec<PathBuf>)> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(root)? {
        paths.push(entry?.path());
    }
    paths.sort();

    let mut folders = Vec::new();
    let mut strays = Vec::new();
    for path in paths {
        if path.is_dir() {
            folders.push(SubmissionFolder::new(path));
        } else {
            strays.push(path);
        }
    }
    Ok((folders, strays))
}
