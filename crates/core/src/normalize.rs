//! Name normalization for matching submission folders against the roster.
//!
//! Folder names come from the LMS export and roster names from a
//! spreadsheet, so both sides are reduced to the same ASCII token before
//! they are compared.

use deunicode::deunicode_with_tofu;
use regex::Regex;
use std::sync::LazyLock;

/// Anything that is not a word character or whitespace.
static NON_WORD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").unwrap());

/// Runs of spaces and underscores left between name parts.
static SEPARATOR_RUN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ _]{2,}| ").unwrap());

/// Leading initials as written by the export tool, e.g. `B.` or `J.K.`.
static INITIALS_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z](?:\.[A-Z])*\.").unwrap());

/// Transliterate any script to its closest ASCII spelling.
///
/// Accented Latin letters lose their accents, and Cyrillic, Greek and CJK
/// text is romanized. Characters with no known spelling are dropped.
pub fn transliterate(text: &str) -> String {
    deunicode_with_tofu(text, "")
}

/// Normalize a display name into a token suitable for roster lookups.
///
/// Steps, in order:
/// 1. transliterate to ASCII
/// 2. replace anything that is not a letter, digit, underscore or whitespace with `_`
/// 3. drop remaining non-ASCII characters
/// 4. trim leading/trailing underscores
/// 5. trim whitespace, then collapse spaces and repeated underscores to one `_`
///
/// A last underscore trim keeps the result stable under re-normalization.
pub fn clean_name(name: &str) -> String {
    let folded = transliterate(name);
    let replaced = NON_WORD_REGEX.replace_all(&folded, "_");
    let ascii: String = replaced.chars().filter(|c| c.is_ascii()).collect();
    let trimmed = ascii.trim_matches('_');
    let collapsed = SEPARATOR_RUN_REGEX.replace_all(trimmed.trim(), "_");
    collapsed.trim_matches('_').to_string()
}

/// Strip a leading run of initials (`B.`, `J.K.`) from a folder name.
///
/// Only uppercase single letters each followed by a period are removed;
/// everything after them is returned unchanged.
pub fn strip_initials(name: &str) -> &str {
    match INITIALS_PREFIX_REGEX.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}
