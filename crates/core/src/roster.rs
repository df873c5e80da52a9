//! The student table: a tab-separated file mapping students to anonymous IDs.
//!
//! Several students may share a surname, so the lookup built from the table
//! is a multimap from normalized surname to the set of IDs on record.

use crate::error::{Error, Result};
use crate::normalize::clean_name;
use crate::notify::Issue;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Header of the surname column.
pub const LAST_NAME_COLUMN: &str = "LastName";

/// Header of the anonymous ID column.
pub const ANON_ID_COLUMN: &str = "Anon";

/// One student row of the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Surname as written in the table.
    pub last_name: String,
    /// Surname after [`clean_name`].
    pub normalized_last_name: String,
    /// Anonymous ID used for the output filename.
    pub anon_id: String,
}

/// The deduplicated, validated student table.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: Vec<RosterEntry>,
}

impl Roster {
    /// Read a roster from a tab-separated file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read a roster from tab-separated text with a header row.
    ///
    /// Rows identical in every column are kept once. Two distinct rows with
    /// the same anonymous ID are a fatal error, reported with every repeated
    /// ID.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break split_row(&line);
                    }
                }
                None => return Err(Error::RosterFormat("table is empty".to_string())),
            }
        };

        let last_name_col = column_index(&header, LAST_NAME_COLUMN)?;
        let anon_col = column_index(&header, ANON_ID_COLUMN)?;

        let mut seen_rows: HashSet<Vec<String>> = HashSet::new();
        let mut entries = Vec::new();

        for (idx, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let row = split_row(&line);
            if !seen_rows.insert(row.clone()) {
                log::debug!("Dropping duplicate roster row {}", idx + 2);
                continue;
            }

            let field = |col: usize| row.get(col).map(|s| s.trim()).unwrap_or_default();
            let last_name = field(last_name_col);
            let anon_id = field(anon_col);
            if anon_id.is_empty() {
                log::warn!("Roster row {} has no anonymous ID, skipping", idx + 2);
                continue;
            }

            entries.push(RosterEntry {
                last_name: last_name.to_string(),
                normalized_last_name: clean_name(last_name),
                anon_id: anon_id.to_string(),
            });
        }

        let duplicates = duplicate_ids(&entries);
        if !duplicates.is_empty() {
            return Err(Error::Configuration(Issue::DuplicateAnonIds(duplicates)));
        }

        log::debug!("Loaded {} roster entries", entries.len());
        Ok(Self { entries })
    }

    /// All entries, in table order.
    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the surname lookup for this roster.
    pub fn index(&self) -> RosterIndex {
        RosterIndex::from_pairs(
            self.entries
                .iter()
                .map(|e| (e.normalized_last_name.clone(), e.anon_id.clone())),
        )
    }
}

/// Anonymous IDs that appear on more than one row, sorted.
fn duplicate_ids(entries: &[RosterEntry]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut repeated = BTreeSet::new();
    for entry in entries {
        if !seen.insert(entry.anon_id.as_str()) {
            repeated.insert(entry.anon_id.clone());
        }
    }
    repeated.into_iter().collect()
}

fn column_index(header: &[String], name: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| Error::RosterFormat(format!("missing column '{}'", name)))
}

/// Split one line into tab-separated fields.
///
/// Double quotes group a field, so a quoted field may contain tabs; `""`
/// inside quotes is a literal quote.
fn split_row(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            '\t' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Lookup from normalized surname to every anonymous ID on record for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterIndex {
    by_surname: BTreeMap<String, BTreeSet<String>>,
}

impl RosterIndex {
    /// Build the index from `(normalized surname, anonymous ID)` pairs.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut by_surname: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (surname, id) in pairs {
            by_surname
                .entry(surname.into())
                .or_default()
                .insert(id.into());
        }
        Self { by_surname }
    }

    /// IDs on record for a surname.
    pub fn ids_for(&self, surname: &str) -> Option<&BTreeSet<String>> {
        self.by_surname.get(surname)
    }

    /// The surname an ID is filed under.
    pub fn surname_of(&self, id: &str) -> Option<&str> {
        self.by_surname
            .iter()
            .find(|(_, ids)| ids.contains(id))
            .map(|(surname, _)| surname.as_str())
    }

    pub fn surnames(&self) -> impl Iterator<Item = &str> {
        self.by_surname.keys().map(String::as_str)
    }

    /// Number of distinct surnames.
    pub fn len(&self) -> usize {
        self.by_surname.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_surname.is_empty()
    }
}
