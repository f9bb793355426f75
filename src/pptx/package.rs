//! OPC package plumbing.
//!
//! A `.pptx` file is an OPC container, a zip archive of XML parts plus
//! binary media, wired together by relationship parts. [`Package`] holds the
//! archive fully in memory and preserves entry order, so a repacked document
//! differs from its input only in the parts that were actually rewritten.

use crate::common::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;

/// Part name of the content types stream.
pub const CONTENT_TYPES: &str = "[Content_Types].xml";

/// An in-memory OPC container.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Parts in archive order.
    parts: Vec<(String, Vec<u8>)>,
    /// Part name to position in `parts`.
    index: HashMap<String, usize>,
}

impl Package {
    /// Read a package from zip bytes. Directory entries are skipped; on
    /// duplicate part names the first entry wins.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
        let mut package = Package::default();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            if package.index.contains_key(&name) {
                continue;
            }
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            package.index.insert(name.clone(), package.parts.len());
            package.parts.push((name, bytes));
        }
        Ok(package)
    }

    /// Bytes of a part, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.index.get(name).map(|&i| self.parts[i].1.as_slice())
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Replace a part's bytes, or append a new part at the end.
    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.index.get(name) {
            Some(&i) => self.parts[i].1 = bytes,
            None => {
                self.index.insert(name.to_string(), self.parts.len());
                self.parts.push((name.to_string(), bytes));
            }
        }
    }

    /// Rename a part in place, keeping its archive position. Returns false
    /// if the source is missing or the destination already exists.
    pub fn rename_part(&mut self, from: &str, to: &str) -> bool {
        if self.index.contains_key(to) {
            return false;
        }
        let Some(i) = self.index.remove(from) else {
            return false;
        };
        self.parts[i].0 = to.to_string();
        self.index.insert(to.to_string(), i);
        true
    }

    /// Part names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Serialize back to zip bytes, deflating every part.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in self.parts {
            writer.start_file(name, options)?;
            writer.write_all(&bytes)?;
        }
        let cursor = writer.finish()?;
        Ok(cursor.into_inner())
    }
}

/// One `<Relationship>` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `TargetMode="External"`; the target lives outside the package.
    pub external: bool,
}

/// Parse a `.rels` part.
pub fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut rels = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                if e.local_name().as_ref() != b"Relationship" {
                    continue;
                }
                let mut id = None;
                let mut rel_type = None;
                let mut target = None;
                let mut external = false;
                for attr in e.attributes().flatten() {
                    let Ok(value) = attr.unescape_value() else {
                        continue;
                    };
                    match attr.key.as_ref() {
                        b"Id" => id = Some(value.into_owned()),
                        b"Type" => rel_type = Some(value.into_owned()),
                        b"Target" => target = Some(value.into_owned()),
                        b"TargetMode" => external = value.as_ref() == "External",
                        _ => {}
                    }
                }
                if let (Some(id), Some(rel_type), Some(target)) = (id, rel_type, target) {
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                        external,
                    });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(rels)
}

/// Serialize relationships back into a `.rels` part.
pub fn write_relationships(rels: &[Relationship]) -> Vec<u8> {
    let mut xml = String::with_capacity(256 + rels.len() * 128);
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n");
    xml.push_str(
        "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for rel in rels {
        xml.push_str("<Relationship Id=\"");
        xml.push_str(&escape_xml(&rel.id));
        xml.push_str("\" Type=\"");
        xml.push_str(&escape_xml(&rel.rel_type));
        xml.push_str("\" Target=\"");
        xml.push_str(&escape_xml(&rel.target));
        if rel.external {
            xml.push_str("\" TargetMode=\"External");
        }
        xml.push_str("\"/>");
    }
    xml.push_str("</Relationships>");
    xml.into_bytes()
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Path of the `.rels` part describing `part`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the part that declared it.
/// Targets starting with `/` are package-absolute.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let base = source_part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let mut segments: Vec<&str> = if base.is_empty() {
        Vec::new()
    } else {
        base.split('/').collect()
    };
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Replace the file extension of `path` (everything after the last `.` in
/// its final segment) with `new_ext`.
pub fn swap_extension(path: &str, new_ext: &str) -> String {
    let slash = path.rfind('/').map_or(0, |i| i + 1);
    match path[slash..].rfind('.') {
        Some(dot) if dot > 0 => format!("{}.{new_ext}", &path[..slash + dot]),
        _ => format!("{path}.{new_ext}"),
    }
}

/// Make sure the content types stream declares a `<Default>` for
/// `extension`. Returns true if the stream was modified.
pub fn ensure_default_content_type(xml: &mut Vec<u8>, extension: &str, content_type: &str) -> bool {
    let needle = format!("Extension=\"{extension}\"");
    if memchr::memmem::find(xml, needle.as_bytes()).is_some() {
        return false;
    }
    let Some(close) = memchr::memmem::find(xml, b"</Types>") else {
        return false;
    };
    let entry = format!("<Default Extension=\"{extension}\" ContentType=\"{content_type}\"/>");
    let mut patched = Vec::with_capacity(xml.len() + entry.len());
    patched.extend_from_slice(&xml[..close]);
    patched.extend_from_slice(entry.as_bytes());
    patched.extend_from_slice(&xml[close..]);
    *xml = patched;
    true
}
