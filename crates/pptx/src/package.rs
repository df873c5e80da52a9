//! In-memory PPTX package: the ZIP container and its relationship graph.

use anonmark_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Seek, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Relationship type suffix of the main presentation part.
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";

/// Relationship type suffix linking a slide to its notes page.
const NOTES_SLIDE_REL: &str = "/notesSlide";

/// Relationship type suffix linking the presentation to a slide.
const SLIDE_REL: &str = "/slide";

/// Where the presentation part lives when the package does not say.
const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

/// One entry of the ZIP container.
#[derive(Debug, Clone)]
pub struct PackagePart {
    /// Path inside the archive, without a leading slash.
    pub name: String,
    /// Uncompressed contents.
    pub data: Vec<u8>,
    compression: CompressionMethod,
    last_modified: DateTime,
    is_dir: bool,
}

/// A relationship from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `External` targets point outside the package.
    pub external: bool,
}

/// A presentation package held in memory so parts can be rewritten and
/// the whole package saved elsewhere.
#[derive(Debug, Clone, Default)]
pub struct PptxPackage {
    parts: Vec<PackagePart>,
}

impl PptxPackage {
    /// Load every part of the archive, keeping their order.
    pub fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", file.name(), e)))?;
            parts.push(PackagePart {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified(),
                is_dir: file.is_dir(),
            });
        }

        Ok(Self { parts })
    }

    /// Write the package out as a new archive.
    ///
    /// Parts keep their order, compression method and timestamp; only their
    /// compressed bytes may differ from the source. The flushed writer is
    /// handed back.
    pub fn write<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        for part in &self.parts {
            let method = match part.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = FileOptions::default()
                .compression_method(method)
                .last_modified_time(part.last_modified);

            if part.is_dir {
                zip.add_directory(part.name.as_str(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.name, e)))?;
                continue;
            }
            zip.start_file(part.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to start '{}': {}", part.name, e)))?;
            zip.write_all(&part.data)?;
        }
        let mut inner = zip
            .finish()
            .map_err(|e| Error::ZipError(format!("Failed to finalize ZIP: {}", e)))?;
        inner.flush()?;
        Ok(inner)
    }

    pub fn parts(&self) -> &[PackagePart] {
        &self.parts
    }

    pub fn part(&self, name: &str) -> Option<&PackagePart> {
        self.parts.iter().find(|p| p.name == name)
    }

    /// Read a part as UTF-8 text.
    pub fn part_text(&self, name: &str) -> Result<String> {
        let part = self
            .part(name)
            .ok_or_else(|| Error::InvalidPackage(format!("missing part '{}'", name)))?;
        String::from_utf8(part.data.clone())
            .map_err(|e| Error::InvalidPackage(format!("'{}' is not UTF-8: {}", name, e)))
    }

    /// Replace the contents of an existing part.
    pub fn replace_part(&mut self, name: &str, data: Vec<u8>) -> Result<()> {
        let part = self
            .parts
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| Error::InvalidPackage(format!("missing part '{}'", name)))?;
        part.data = data;
        Ok(())
    }

    /// Relationships declared by `source` (`""` for the package root).
    ///
    /// A part without a `.rels` companion has no relationships.
    pub fn relationships(&self, source: &str) -> Result<Vec<Relationship>> {
        let rels_path = rels_path_for(source);
        if self.part(&rels_path).is_none() {
            return Ok(Vec::new());
        }
        parse_relationships(&self.part_text(&rels_path)?)
    }

    /// The main presentation part.
    pub fn presentation_part(&self) -> Result<String> {
        let from_root = self
            .relationships("")?
            .into_iter()
            .find(|r| !r.external && r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
            .map(|r| resolve_target("", &r.target));

        let name = from_root.unwrap_or_else(|| DEFAULT_PRESENTATION_PART.to_string());
        if self.part(&name).is_none() {
            return Err(Error::InvalidPackage(format!(
                "presentation part '{}' not found",
                name
            )));
        }
        Ok(name)
    }

    /// Slide parts in presentation order.
    pub fn slide_parts(&self) -> Result<Vec<String>> {
        let presentation = self.presentation_part()?;
        let rels = self.relationships(&presentation)?;
        let order = slide_rel_ids(&self.part_text(&presentation)?)?;

        let mut slides = Vec::with_capacity(order.len());
        for rel_id in order {
            match rels
                .iter()
                .find(|r| r.id == rel_id && r.rel_type.ends_with(SLIDE_REL))
            {
                Some(rel) => slides.push(resolve_target(&presentation, &rel.target)),
                None => log::warn!("Slide relationship {} not found, skipping", rel_id),
            }
        }
        Ok(slides)
    }

    /// The notes page attached to a slide, if it has one.
    pub fn notes_part_for(&self, slide: &str) -> Result<Option<String>> {
        let notes = self
            .relationships(slide)?
            .into_iter()
            .find(|r| !r.external && r.rel_type.ends_with(NOTES_SLIDE_REL))
            .map(|r| resolve_target(slide, &r.target));

        match notes {
            Some(name) if self.part(&name).is_none() => {
                log::warn!("Notes part '{}' of '{}' is missing", name, slide);
                Ok(None)
            }
            other => Ok(other),
        }
    }
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
fn rels_path_for(source: &str) -> String {
    match source.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", source),
    }
}

/// Resolve a relationship target against the part that declares it.
pub fn resolve_target(source: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match source.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value == "External",
                        _ => {}
                    }
                }
                rels.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(rels)
}

/// Relationship IDs of `sldId` entries, in the order the deck shows them.
fn slide_rel_ids(presentation_xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(presentation_xml);
    reader.trim_text(true);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                // The relationship ID is the namespaced `r:id`; plain `id` is numeric
                let rel_id = e.attributes().flatten().find_map(|attr| {
                    let key = attr.key.as_ref();
                    (key != b"id" && local_name(key) == b"id")
                        .then(|| String::from_utf8_lossy(&attr.value).to_string())
                });
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}
