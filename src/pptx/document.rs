//! Whole-document processing.
//!
//! Expands the package, recolors every slide in presentation order, remaps
//! embedded raster images, and repacks. Slide problems degrade into
//! warnings prefixed with the slide's one-based position; only
//! package-level problems (unreadable archive, not a presentation at all)
//! fail the document.

use crate::common::{Diagnostics, Error, Result};
use crate::config::InversionConfig;
use crate::images::{ImageOutcome, transform_image};
use crate::pptx::package::{
    CONTENT_TYPES, Package, ensure_default_content_type, parse_relationships, rels_path_for,
    resolve_target, swap_extension, write_relationships,
};
use crate::pptx::recolor::recolor_slide;
use crate::pptx::slide::parse_slide;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Recolor one presentation held in memory.
///
/// Returns the rewritten `.pptx` bytes; recoverable problems are appended
/// to `diags`.
pub fn process_document(
    data: &[u8],
    config: &InversionConfig,
    diags: &mut Diagnostics,
) -> Result<Vec<u8>> {
    let mut package = Package::from_bytes(data)?;
    if !package.has_part(PRESENTATION_PART) {
        return Err(Error::NotAPresentation(
            "package has no ppt/presentation.xml part".into(),
        ));
    }

    let slides = slide_parts_in_order(&package, diags)?;
    if slides.is_empty() {
        diags.warn("presentation lists no slides");
    }

    // Media parts in first-reference order, with the referencing slide for
    // warning attribution. Shared media is transformed once.
    let mut media_order: Vec<(String, usize)> = Vec::new();
    let mut media_seen: HashSet<String> = HashSet::new();

    for (idx, slide_name) in slides.iter().enumerate() {
        let number = idx + 1;
        let Some(xml) = package.part(slide_name) else {
            diags.warn(format!(
                "Slide {number}: part '{slide_name}' missing from the package"
            ));
            continue;
        };
        let shapes = match parse_slide(xml) {
            Ok(shapes) => shapes,
            Err(err) => {
                diags.warn(format!("Slide {number}: skipped, {err}"));
                continue;
            }
        };
        let mut buf = xml.to_vec();
        let mut slide_diags = Diagnostics::new();
        let stats = recolor_slide(&mut buf, &shapes, config, &mut slide_diags);
        diags.absorb_prefixed(&format!("Slide {number}: "), slide_diags);
        tracing::debug!(slide = number, recolored = stats.recolored, "slide recolored");
        package.set_part(slide_name, buf);

        if !config.invert_images || stats.image_rels.is_empty() {
            continue;
        }
        let rels_name = rels_path_for(slide_name);
        let rels = match package.part(&rels_name).map(parse_relationships) {
            Some(Ok(rels)) => rels,
            Some(Err(err)) => {
                diags.warn(format!(
                    "Slide {number}: relationships unreadable, images left unchanged ({err})"
                ));
                continue;
            }
            None => {
                diags.warn(format!(
                    "Slide {number}: relationship part missing, images left unchanged"
                ));
                continue;
            }
        };
        for rid in &stats.image_rels {
            match rels.iter().find(|rel| rel.id == *rid) {
                Some(rel) if rel.external => diags.warn(format!(
                    "Slide {number}: image '{rid}' is externally linked, left unchanged"
                )),
                Some(rel) => {
                    let media = resolve_target(slide_name, &rel.target);
                    if media_seen.insert(media.clone()) {
                        media_order.push((media, number));
                    }
                }
                None => diags.warn(format!(
                    "Slide {number}: image relationship '{rid}' not found"
                )),
            }
        }
    }

    for (media, number) in media_order {
        transform_media_part(&mut package, &media, number, config, diags);
    }

    package.into_bytes()
}

/// Slide part names in `sldIdLst` order.
fn slide_parts_in_order(package: &Package, diags: &mut Diagnostics) -> Result<Vec<String>> {
    let Some(pres) = package.part(PRESENTATION_PART) else {
        return Ok(Vec::new());
    };
    let rids = presentation_slide_rids(pres)?;
    let Some(rels_xml) = package.part(PRESENTATION_RELS) else {
        diags.warn("presentation relationships missing, no slides processed");
        return Ok(Vec::new());
    };
    let rels = parse_relationships(rels_xml)?;
    let mut parts = Vec::with_capacity(rids.len());
    for rid in rids {
        match rels.iter().find(|rel| rel.id == rid) {
            Some(rel) => parts.push(resolve_target(PRESENTATION_PART, &rel.target)),
            None => diags.warn(format!(
                "slide relationship '{rid}' not found in the presentation"
            )),
        }
    }
    Ok(parts)
}

/// Relationship ids of `p:sldId` entries, in document order.
fn presentation_slide_rids(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut in_list = false;
    let mut rids = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"sldIdLst" => in_list = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"sldIdLst" => in_list = false,
            Ok(Event::Start(e) | Event::Empty(e))
                if in_list && e.local_name().as_ref() == b"sldId" =>
            {
                for attr in e.attributes().flatten() {
                    // sldId carries both a numeric id and r:id, and both have
                    // the local name "id"; the rId prefix keeps only the
                    // relationship id.
                    if attr.key.local_name().as_ref() == b"id" {
                        let rid = String::from_utf8_lossy(&attr.value).into_owned();
                        if rid.starts_with("rId") {
                            rids.push(rid);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(rids)
}

fn transform_media_part(
    package: &mut Package,
    media: &str,
    slide: usize,
    config: &InversionConfig,
    diags: &mut Diagnostics,
) {
    let Some(bytes) = package.part(media) else {
        diags.warn(format!(
            "Slide {slide}: image '{media}' missing from the package"
        ));
        return;
    };
    match transform_image(bytes, config) {
        Ok(ImageOutcome::Unchanged) => {}
        Ok(ImageOutcome::Replaced { bytes, format }) => {
            let slash = media.rfind('/').map_or(0, |i| i + 1);
            let ext = media[slash..].rsplit_once('.').map(|(_, e)| e).unwrap_or("");
            if format.matches_extension(ext) {
                package.set_part(media, bytes);
                return;
            }
            let new_name = swap_extension(media, format.extension());
            if package.has_part(&new_name) {
                diags.warn(format!(
                    "Slide {slide}: image '{media}' changed format but '{new_name}' already exists, left unchanged"
                ));
                return;
            }
            package.set_part(media, bytes);
            package.rename_part(media, &new_name);
            retarget_media(package, media, format.extension());
            if let Some(ct) = package.part(CONTENT_TYPES) {
                let mut ct = ct.to_vec();
                if ensure_default_content_type(&mut ct, format.extension(), format.content_type())
                {
                    package.set_part(CONTENT_TYPES, ct);
                }
            }
            tracing::debug!(from = media, to = new_name.as_str(), "image format changed");
        }
        Err(err) => diags.warn(format!(
            "Slide {slide}: image '{media}' could not be decoded, left unchanged ({err})"
        )),
    }
}

/// Point every relationship at a renamed media part's new extension.
fn retarget_media(package: &mut Package, old: &str, new_ext: &str) {
    let rels_parts: Vec<String> = package
        .part_names()
        .filter(|name| name.ends_with(".rels"))
        .map(String::from)
        .collect();
    for rels_name in rels_parts {
        let Some(source) = source_of_rels(&rels_name) else {
            continue;
        };
        let Some(xml) = package.part(&rels_name) else {
            continue;
        };
        let Ok(mut rels) = parse_relationships(xml) else {
            continue;
        };
        let mut changed = false;
        for rel in &mut rels {
            if !rel.external && resolve_target(&source, &rel.target) == old {
                rel.target = swap_extension(&rel.target, new_ext);
                changed = true;
            }
        }
        if changed {
            package.set_part(&rels_name, write_relationships(&rels));
        }
    }
}

/// The part a `.rels` part describes, e.g. `ppt/slides/_rels/slide1.xml.rels`
/// describes `ppt/slides/slide1.xml`.
fn source_of_rels(rels_name: &str) -> Option<String> {
    let (dir, file) = rels_name.rsplit_once('/')?;
    let dir = dir.strip_suffix("_rels")?;
    let file = file.strip_suffix(".rels")?;
    Some(format!("{dir}{file}"))
}
