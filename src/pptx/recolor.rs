//! Two-color remapping over a parsed slide.
//!
//! Walks the shape tree in post order (children before their group), patches
//! every explicit solid color in place by polarity, and records one warning
//! for every paint it cannot rewrite. Group nesting is unbounded; a group
//! contributes nothing of its own beyond its `grpSpPr` paints.

use crate::color::Rgb;
use crate::common::Diagnostics;
use crate::config::InversionConfig;
use crate::pptx::shapes::{Paint, PaintSlot, Shape, SlideShapes, SolidPaint};

/// What one recoloring pass did to a slide.
#[derive(Debug, Default)]
pub struct RecolorStats {
    /// Colors actually rewritten.
    pub recolored: usize,
    /// Relationship ids of pictures met during the walk, in document order.
    pub image_rels: Vec<String>,
}

/// Remap every explicit solid color in `xml` according to `config`.
///
/// `xml` must be the same buffer `shapes` was parsed from; spans are
/// verified against it before patching, so a stale tree degrades into
/// warnings rather than corruption.
pub fn recolor_slide(
    xml: &mut [u8],
    shapes: &SlideShapes,
    config: &InversionConfig,
    diags: &mut Diagnostics,
) -> RecolorStats {
    let mut stats = RecolorStats::default();
    for note in &shapes.notes {
        diags.warn(note.clone());
    }
    if let Some(paint) = &shapes.background {
        apply_paint(xml, "slide background", paint, config, diags, &mut stats);
    }
    for shape in &shapes.shapes {
        walk(xml, shape, config, diags, &mut stats);
    }
    stats
}

fn walk(
    xml: &mut [u8],
    shape: &Shape,
    config: &InversionConfig,
    diags: &mut Diagnostics,
    stats: &mut RecolorStats,
) {
    for child in &shape.children {
        walk(xml, child, config, diags, stats);
    }
    for (slot, paints) in [
        (PaintSlot::Fill, &shape.fills),
        (PaintSlot::Line, &shape.lines),
        (PaintSlot::Text, &shape.text_colors),
    ] {
        for paint in paints {
            let target = format!("{} {}", shape.label(), slot.describe());
            apply_paint(xml, &target, paint, config, diags, stats);
        }
    }
    if let Some(rel) = &shape.image_rel {
        stats.image_rels.push(rel.clone());
    }
}

fn apply_paint(
    xml: &mut [u8],
    target: &str,
    paint: &Paint,
    config: &InversionConfig,
    diags: &mut Diagnostics,
    stats: &mut RecolorStats,
) {
    match paint {
        Paint::Solid(solid) => patch_solid(xml, target, solid, config, diags, stats),
        Paint::Scheme(name) => diags.warn(format!(
            "{target} inherits theme color '{name}', left unchanged"
        )),
        Paint::Gradient => diags.warn(format!("{target} uses a gradient, left unchanged")),
        Paint::Pattern => diags.warn(format!("{target} uses a pattern, left unchanged")),
        Paint::Picture => diags.warn(format!("{target} uses a picture fill, left unchanged")),
    }
}

/// Dark colors move to the dark endpoint, light colors to the light one.
fn patch_solid(
    xml: &mut [u8],
    target: &str,
    solid: &SolidPaint,
    config: &InversionConfig,
    diags: &mut Diagnostics,
    stats: &mut RecolorStats,
) {
    let span = solid.span.clone();
    let current = xml
        .get(span.clone())
        .and_then(|bytes| std::str::from_utf8(bytes).ok())
        .and_then(|text| Rgb::from_hex(text).ok());
    if current != Some(solid.color) {
        diags.warn(format!("{target} color could not be rewritten in place"));
        return;
    }
    let replacement = if solid.color.is_light() {
        config.light_target()
    } else {
        config.dark_target()
    };
    if replacement == solid.color {
        return;
    }
    xml[span].copy_from_slice(replacement.to_hex().as_bytes());
    stats.recolored += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::slide::parse_slide;

    const NS: &str = concat!(
        "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ",
        "xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\""
    );

    fn config() -> InversionConfig {
        InversionConfig::from_hex("1A1B1C", "F0F1F2").unwrap()
    }

    fn recolor(xml: &str) -> (Vec<u8>, Diagnostics, RecolorStats) {
        let shapes = parse_slide(xml.as_bytes()).unwrap();
        let mut buf = xml.as_bytes().to_vec();
        let mut diags = Diagnostics::new();
        let stats = recolor_slide(&mut buf, &shapes, &config(), &mut diags);
        (buf, diags, stats)
    }

    #[test]
    fn solid_colors_move_to_their_polarity_endpoint() {
        let xml = format!(
            "<p:sld {NS}><p:cSld><p:spTree><p:sp>\
             <p:nvSpPr><p:cNvPr id=\"2\" name=\"Box\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
             <p:spPr>\
             <a:solidFill><a:srgbClr val=\"112233\"/></a:solidFill>\
             <a:ln><a:solidFill><a:srgbClr val=\"FFFFFF\"/></a:solidFill></a:ln>\
             </p:spPr>\
             </p:sp></p:spTree></p:cSld></p:sld>"
        );
        let (buf, diags, stats) = recolor(&xml);
        let out = String::from_utf8(buf).unwrap();
        // Dark fill lands on the dark endpoint, light line on the light one.
        assert!(out.contains("<a:srgbClr val=\"1A1B1C\"/>"));
        assert!(out.contains("<a:srgbClr val=\"F0F1F2\"/>"));
        assert_eq!(stats.recolored, 2);
        assert!(diags.is_empty());
        // Equal length patches leave everything else byte-identical.
        assert_eq!(out.len(), xml.len());
        assert_eq!(
            out.replace("1A1B1C", "112233").replace("F0F1F2", "FFFFFF"),
            xml
        );
    }

    #[test]
    fn colors_already_on_target_are_not_counted() {
        let xml = format!(
            "<p:sld {NS}><p:cSld><p:spTree><p:sp>\
             <p:nvSpPr><p:cNvPr id=\"2\" name=\"Box\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
             <p:spPr><a:solidFill><a:srgbClr val=\"F0F1F2\"/></a:solidFill></p:spPr>\
             </p:sp></p:spTree></p:cSld></p:sld>"
        );
        let (buf, diags, stats) = recolor(&xml);
        assert_eq!(buf, xml.as_bytes());
        assert_eq!(stats.recolored, 0);
        assert!(diags.is_empty());
    }

    #[test]
    fn unpatchable_paints_warn_with_shape_and_attribute() {
        let xml = format!(
            "<p:sld {NS}><p:cSld>\
             <p:bg><p:bgPr><a:gradFill><a:gsLst/></a:gradFill></p:bgPr></p:bg>\
             <p:spTree><p:sp>\
             <p:nvSpPr><p:cNvPr id=\"2\" name=\"Banner\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
             <p:spPr><a:pattFill prst=\"pct5\"/></p:spPr>\
             <p:txBody><a:bodyPr/><a:p><a:r>\
             <a:rPr><a:solidFill><a:schemeClr val=\"accent1\"/></a:solidFill></a:rPr>\
             <a:t>x</a:t></a:r></a:p></p:txBody>\
             </p:sp></p:spTree></p:cSld></p:sld>"
        );
        let (buf, diags, stats) = recolor(&xml);
        assert_eq!(buf, xml.as_bytes());
        assert_eq!(stats.recolored, 0);
        let warnings = diags.warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("slide background uses a gradient"));
        assert!(warnings[1].contains("shape 'Banner' fill uses a pattern"));
        assert!(warnings[2].contains("shape 'Banner' text inherits theme color 'accent1'"));
    }

    #[test]
    fn groups_recolor_children_before_their_own_fill() {
        let xml = format!(
            "<p:sld {NS}><p:cSld><p:spTree><p:grpSp>\
             <p:nvGrpSpPr><p:cNvPr id=\"3\" name=\"G\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
             <p:grpSpPr><a:solidFill><a:srgbClr val=\"000000\"/></a:solidFill></p:grpSpPr>\
             <p:sp>\
             <p:nvSpPr><p:cNvPr id=\"4\" name=\"Leaf\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
             <p:spPr><a:solidFill><a:srgbClr val=\"EEEEEE\"/></a:solidFill></p:spPr>\
             </p:sp>\
             </p:grpSp></p:spTree></p:cSld></p:sld>"
        );
        let (buf, diags, stats) = recolor(&xml);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("1A1B1C"));
        assert!(out.contains("F0F1F2"));
        assert_eq!(stats.recolored, 2);
        assert!(diags.is_empty());
    }

    #[test]
    fn stale_spans_degrade_into_a_warning() {
        let xml = format!(
            "<p:sld {NS}><p:cSld><p:spTree><p:sp>\
             <p:nvSpPr><p:cNvPr id=\"2\" name=\"Box\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
             <p:spPr><a:solidFill><a:srgbClr val=\"112233\"/></a:solidFill></p:spPr>\
             </p:sp></p:spTree></p:cSld></p:sld>"
        );
        let shapes = parse_slide(xml.as_bytes()).unwrap();
        // A different buffer than the one the tree was parsed from.
        let mut other = xml.replace("112233", "445566").into_bytes();
        let mut diags = Diagnostics::new();
        let stats = recolor_slide(&mut other, &shapes, &config(), &mut diags);
        assert_eq!(stats.recolored, 0);
        assert_eq!(diags.warnings().len(), 1);
        assert!(diags.warnings()[0].contains("could not be rewritten in place"));
        assert!(String::from_utf8(other).unwrap().contains("445566"));
    }

    #[test]
    fn picture_relationships_are_collected_in_document_order() {
        let xml = format!(
            "<p:sld {NS} xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
             <p:cSld><p:spTree>\
             <p:pic><p:nvPicPr><p:cNvPr id=\"5\" name=\"A\"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>\
             <p:blipFill><a:blip r:embed=\"rId3\"/></p:blipFill><p:spPr/></p:pic>\
             <p:pic><p:nvPicPr><p:cNvPr id=\"6\" name=\"B\"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>\
             <p:blipFill><a:blip r:embed=\"rId2\"/></p:blipFill><p:spPr/></p:pic>\
             </p:spTree></p:cSld></p:sld>"
        );
        let (_, diags, stats) = recolor(&xml);
        assert_eq!(stats.image_rels, vec!["rId3".to_string(), "rId2".to_string()]);
        assert!(diags.is_empty());
    }
}
