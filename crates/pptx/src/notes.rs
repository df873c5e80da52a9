//! Clearing speaker notes from a presentation.
//!
//! Each slide may link to a notes page. Every shape on that page that has a
//! text body keeps the body but loses its text: the first paragraph is
//! emptied of runs, breaks and fields, and every later paragraph is
//! dropped. Everything else in the package is written back unchanged.

use crate::package::{local_name, PptxPackage};
use anonmark_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

/// Paragraph children that carry text.
const TEXT_CONTENT: &[&[u8]] = &[b"r", b"br", b"fld"];

/// What stripping one presentation did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StripReport {
    /// Slides in the deck.
    pub slides: usize,
    /// Slides that had a notes page.
    pub notes_pages: usize,
    /// Text bodies emptied across all notes pages.
    pub text_bodies_cleared: usize,
}

impl StripReport {
    /// Whether any notes text container was cleared.
    pub fn had_notes(&self) -> bool {
        self.text_bodies_cleared > 0
    }

    /// Console line for a processed file.
    pub fn describe(&self, path: &Path) -> String {
        if self.had_notes() {
            format!("Removed notes from {}", path.display())
        } else {
            format!("{} had no notes", path.display())
        }
    }
}

/// Strips speaker notes from PPTX files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotesStripper;

impl NotesStripper {
    /// Create a new notes stripper.
    pub fn new() -> Self {
        Self
    }

    /// Read a presentation, clear its notes and write the result.
    pub fn strip<R: Read + Seek, W: Write + Seek>(&self, reader: R, writer: W) -> Result<StripReport> {
        let mut package = PptxPackage::read(reader)?;
        let slides = package.slide_parts()?;

        let mut report = StripReport {
            slides: slides.len(),
            ..StripReport::default()
        };

        for slide in &slides {
            let Some(notes) = package.notes_part_for(slide)? else {
                continue;
            };
            report.notes_pages += 1;

            let (cleared_xml, cleared) = clear_text_bodies(&package.part_text(&notes)?)?;
            if cleared > 0 {
                log::debug!("Cleared {} text bodies in {}", cleared, notes);
                package.replace_part(&notes, cleared_xml.into_bytes())?;
                report.text_bodies_cleared += cleared;
            }
        }

        package.write(writer)?;
        Ok(report)
    }

    /// Strip `input` into a new file at `output`.
    ///
    /// The source file is never modified, so `output` must be a different
    /// file.
    pub fn strip_file(&self, input: &Path, output: &Path) -> Result<StripReport> {
        if output.exists() && same_file(input, output)? {
            return Err(Error::SameInputOutput(output.to_path_buf()));
        }

        let reader = BufReader::new(File::open(input)?);
        let writer = BufWriter::new(File::create(output)?);
        self.strip(reader, writer)
    }
}

fn same_file(a: &Path, b: &Path) -> Result<bool> {
    Ok(a.canonicalize()? == b.canonicalize()?)
}

/// Open text body being cleared.
struct TextBody {
    /// Element stack depth once the `txBody` start tag is pushed.
    depth: usize,
    paragraphs: usize,
}

/// Empty every shape text body in a notes page.
///
/// Returns the rewritten XML and the number of text bodies cleared. Only
/// `txBody` elements that belong to a shape (`sp`) count; table cells keep
/// their text.
pub fn clear_text_bodies(xml: &str) -> Result<(String, usize)> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut body: Option<TextBody> = None;
    // Depth inside a subtree being dropped; 0 when writing
    let mut skipping = 0usize;
    let mut cleared = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error parsing notes page: {}", e)))?;

        match &event {
            Event::Eof => break,
            Event::Start(e) => {
                if skipping > 0 {
                    skipping += 1;
                    continue;
                }
                let name = local_name(e.name().as_ref()).to_vec();
                if is_dropped(&name, &stack, body.as_mut()) {
                    skipping = 1;
                    continue;
                }
                let opens_body = is_shape_text_body(&name, &stack);
                stack.push(name);
                if opens_body {
                    cleared += 1;
                    body = Some(TextBody {
                        depth: stack.len(),
                        paragraphs: 0,
                    });
                }
            }
            Event::Empty(e) => {
                if skipping > 0 {
                    continue;
                }
                let name = local_name(e.name().as_ref()).to_vec();
                if is_dropped(&name, &stack, body.as_mut()) {
                    continue;
                }
                if is_shape_text_body(&name, &stack) {
                    cleared += 1;
                }
            }
            Event::End(_) => {
                if skipping > 0 {
                    skipping -= 1;
                    continue;
                }
                stack.pop();
                if body.as_ref().is_some_and(|b| stack.len() < b.depth) {
                    body = None;
                }
            }
            _ => {
                if skipping > 0 {
                    continue;
                }
            }
        }

        writer
            .write_event(&event)
            .map_err(|e| Error::XmlError(format!("Error writing notes page: {}", e)))?;
    }

    let bytes = writer.into_inner();
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::XmlError(format!("Notes page is not UTF-8: {}", e)))?;
    Ok((text, cleared))
}

fn is_shape_text_body(name: &[u8], stack: &[Vec<u8>]) -> bool {
    name == b"txBody" && stack.last().is_some_and(|parent| parent == b"sp")
}

/// Whether an element opening at the current position is removed.
///
/// Inside a text body, paragraphs after the first are removed, and the
/// first paragraph loses its text content.
fn is_dropped(name: &[u8], stack: &[Vec<u8>], body: Option<&mut TextBody>) -> bool {
    let Some(body) = body else {
        return false;
    };

    if stack.len() == body.depth && name == b"p" {
        body.paragraphs += 1;
        return body.paragraphs > 1;
    }

    stack.len() == body.depth + 1
        && stack.last().is_some_and(|parent| parent == b"p")
        && TEXT_CONTENT.contains(&name)
}
