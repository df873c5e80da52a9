//! PPTX (Office Open XML) speaker-notes stripper.
//!
//! A .pptx file is a ZIP archive of XML parts. Notes pages are found through
//! each slide's relationships and rewritten with their text removed; every
//! other part is carried over as it was.

pub mod batch;
pub mod notes;
pub mod package;

pub use batch::{is_pptx, strip_folder, BatchSummary, FailedDeck, StrippedDeck};
pub use notes::{clear_text_bodies, NotesStripper, StripReport};
pub use package::PptxPackage;
