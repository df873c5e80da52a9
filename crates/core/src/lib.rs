//! Core of anonmark: matching LMS submission folders against a student
//! table and copying each submission under its anonymous ID.

pub mod error;
pub mod matcher;
pub mod normalize;
pub mod notify;
pub mod reconcile;
pub mod roster;
pub mod verify;

pub use error::{Error, Result};
pub use matcher::{FolderMatch, SubmissionFolder};
pub use normalize::{clean_name, strip_initials};
pub use notify::{Issue, SessionLog, Severity};
pub use reconcile::{CopiedFile, ReconcileConfig, Reconciler, RunSummary};
pub use roster::{Roster, RosterEntry, RosterIndex};
pub use verify::{verify, Verdict};
