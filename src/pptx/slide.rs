//! Slide XML parsing.
//!
//! Walks a slide part with a streaming reader and builds the [`SlideShapes`]
//! tree. Colors are classified by their enclosing elements: a `solidFill`
//! under `spPr` is a shape fill, under `a:ln` an outline, under `rPr` or
//! `defRPr` a text run color, under `p:bgPr` the slide background. Gradient
//! stops and effect colors are deliberately not collected; the fill kind
//! itself is recorded instead so the caller can report it.
//!
//! For every explicit `srgbClr` the parser records the byte range of the six
//! hex digits inside the original buffer. Rewriting a color is then an
//! equal-length in-place patch, which keeps the rest of the part untouched
//! down to the byte.

use crate::color::Rgb;
use crate::common::{Error, Result};
use crate::pptx::shapes::{Paint, PaintSlot, Shape, ShapeKind, SlideShapes, SolidPaint};
use quick_xml::Reader;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use smallvec::SmallVec;
use std::ops::Range;

/// Enclosing-element context relevant for color classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ctx {
    /// `p:spPr` or `p:grpSpPr`
    ShapeProps,
    /// `a:ln`
    Outline,
    /// `a:rPr` or `a:defRPr`
    RunProps,
    /// `a:solidFill`
    SolidFill,
    /// `p:bgPr`
    BackgroundProps,
    /// `p:blipFill` holding a picture's own image
    PicBlip,
    Other,
}

struct Parser<'a> {
    xml: &'a [u8],
    ctx: SmallVec<[Ctx; 16]>,
    open: Vec<Shape>,
    out: SlideShapes,
}

/// Parse one slide part into its shape tree.
pub fn parse_slide(xml: &[u8]) -> Result<SlideShapes> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut parser = Parser {
        xml,
        ctx: SmallVec::new(),
        open: Vec::new(),
        out: SlideShapes::default(),
    };
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => parser.element(&e, false),
            Ok(Event::Empty(e)) => parser.element(&e, true),
            Ok(Event::End(e)) => parser.element_end(&e),
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e.to_string())),
            _ => {}
        }
    }
    Ok(parser.out)
}

impl Parser<'_> {
    fn element(&mut self, e: &BytesStart<'_>, empty: bool) {
        let local = e.local_name();
        match local.as_ref() {
            b"sp" => self.begin_shape(ShapeKind::Shape, empty),
            b"pic" => self.begin_shape(ShapeKind::Picture, empty),
            b"grpSp" => self.begin_shape(ShapeKind::GroupShape, empty),
            b"cxnSp" => self.begin_shape(ShapeKind::Connector, empty),
            b"graphicFrame" => self.begin_shape(ShapeKind::GraphicFrame, empty),
            b"cNvPr" => {
                self.shape_name(e);
                self.enter(Ctx::Other, empty);
            }
            b"spPr" | b"grpSpPr" => self.enter(Ctx::ShapeProps, empty),
            b"ln" => self.enter(Ctx::Outline, empty),
            b"rPr" | b"defRPr" => self.enter(Ctx::RunProps, empty),
            b"solidFill" => self.enter(Ctx::SolidFill, empty),
            b"gradFill" => {
                self.unpatchable_fill(Paint::Gradient);
                self.enter(Ctx::Other, empty);
            }
            b"pattFill" => {
                self.unpatchable_fill(Paint::Pattern);
                self.enter(Ctx::Other, empty);
            }
            b"blipFill" => self.begin_blip_fill(empty),
            b"blip" => {
                self.picture_embed(e);
                self.enter(Ctx::Other, empty);
            }
            b"bgPr" => self.enter(Ctx::BackgroundProps, empty),
            b"bgRef" => {
                self.out.background = Some(Paint::Scheme("background reference".into()));
                self.enter(Ctx::Other, empty);
            }
            b"srgbClr" => {
                self.solid_color(e);
                self.enter(Ctx::Other, empty);
            }
            b"schemeClr" | b"sysClr" => {
                self.scheme_color(e);
                self.enter(Ctx::Other, empty);
            }
            _ => self.enter(Ctx::Other, empty),
        }
    }

    fn element_end(&mut self, e: &BytesEnd<'_>) {
        self.ctx.pop();
        match e.local_name().as_ref() {
            b"sp" | b"pic" | b"grpSp" | b"cxnSp" | b"graphicFrame" => {
                if let Some(done) = self.open.pop() {
                    self.attach(done);
                }
            }
            _ => {}
        }
    }

    // Empty elements never get a matching End event, so they push nothing.
    fn enter(&mut self, ctx: Ctx, empty: bool) {
        if !empty {
            self.ctx.push(ctx);
        }
    }

    fn begin_shape(&mut self, kind: ShapeKind, empty: bool) {
        if empty {
            self.attach(Shape::new(kind));
        } else {
            self.open.push(Shape::new(kind));
            self.ctx.push(Ctx::Other);
        }
    }

    fn attach(&mut self, done: Shape) {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(done);
        } else {
            self.out.shapes.push(done);
        }
    }

    fn shape_name(&mut self, e: &BytesStart<'_>) {
        let Some(shape) = self.open.last_mut() else {
            return;
        };
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"name" {
                shape.set_name_once(&String::from_utf8_lossy(&attr.value));
            }
        }
    }

    /// Gradient and pattern fills are recorded by kind only; their inner
    /// color elements are intentionally skipped.
    fn unpatchable_fill(&mut self, paint: Paint) {
        if let Some(slot) = paint_slot(&self.ctx) {
            self.record(slot, paint);
        }
    }

    /// A `blipFill` inside `spPr` is a picture fill on an attribute; a
    /// `blipFill` directly under `p:pic` holds the picture's own image.
    fn begin_blip_fill(&mut self, empty: bool) {
        if let Some(slot) = paint_slot(&self.ctx) {
            self.record(slot, Paint::Picture);
            self.enter(Ctx::Other, empty);
        } else {
            self.enter(Ctx::PicBlip, empty);
        }
    }

    fn picture_embed(&mut self, e: &BytesStart<'_>) {
        if self.ctx.last() != Some(&Ctx::PicBlip) {
            return;
        }
        let Some(shape) = self.open.last_mut() else {
            return;
        };
        if !shape.is_picture() || shape.image_rel.is_some() {
            return;
        }
        for attr in e.attributes().flatten() {
            let key = attr.key.as_ref();
            if key == b"r:embed" || attr.key.local_name().as_ref() == b"embed" {
                shape.image_rel = Some(String::from_utf8_lossy(&attr.value).into_owned());
            }
        }
    }

    fn solid_color(&mut self, e: &BytesStart<'_>) {
        if self.ctx.last() != Some(&Ctx::SolidFill) {
            return;
        }
        let Some(slot) = paint_slot(&self.ctx) else {
            return;
        };
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() != b"val" {
                continue;
            }
            let raw = attr.value.as_ref();
            let Ok(text) = std::str::from_utf8(raw) else {
                self.out.notes.push("non-UTF-8 color value left unchanged".into());
                continue;
            };
            // Patches splice exactly six bytes, so only plain six-digit
            // values are recorded.
            match Rgb::from_hex(text) {
                Ok(color) if raw.len() == 6 => {
                    if let Some(span) = span_of(self.xml, raw) {
                        self.record(slot, Paint::Solid(SolidPaint { color, span }));
                    } else {
                        self.out
                            .notes
                            .push(format!("could not locate color '{text}' in the slide part"));
                    }
                }
                _ => {
                    self.out
                        .notes
                        .push(format!("color value '{text}' is not six hex digits, left unchanged"));
                }
            }
        }
    }

    fn scheme_color(&mut self, e: &BytesStart<'_>) {
        if self.ctx.last() != Some(&Ctx::SolidFill) {
            return;
        }
        let Some(slot) = paint_slot(&self.ctx) else {
            return;
        };
        let mut name = String::from("scheme");
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() == b"val" {
                name = String::from_utf8_lossy(&attr.value).into_owned();
            }
        }
        self.record(slot, Paint::Scheme(name));
    }

    fn record(&mut self, slot: PaintSlot, paint: Paint) {
        if slot == PaintSlot::Background {
            self.out.background = Some(paint);
            return;
        }
        let Some(shape) = self.open.last_mut() else {
            return;
        };
        // Graphic frame internals (table cells, chart references) are out of
        // scope and must not surface as shape paints.
        if shape.kind() == ShapeKind::GraphicFrame {
            return;
        }
        match slot {
            PaintSlot::Fill => shape.fills.push(paint),
            PaintSlot::Line => shape.lines.push(paint),
            PaintSlot::Text => shape.text_colors.push(paint),
            PaintSlot::Background => {}
        }
    }
}

/// Nearest enclosing paintable attribute, scanning outward.
fn paint_slot(stack: &[Ctx]) -> Option<PaintSlot> {
    for ctx in stack.iter().rev() {
        match ctx {
            Ctx::Outline => return Some(PaintSlot::Line),
            Ctx::RunProps => return Some(PaintSlot::Text),
            Ctx::ShapeProps => return Some(PaintSlot::Fill),
            Ctx::BackgroundProps => return Some(PaintSlot::Background),
            _ => {}
        }
    }
    None
}

/// Byte range of `value` inside `base`, if `value` borrows from it.
fn span_of(base: &[u8], value: &[u8]) -> Option<Range<usize>> {
    let start = (value.as_ptr() as usize).checked_sub(base.as_ptr() as usize)?;
    let end = start.checked_add(value.len())?;
    (end <= base.len()).then(|| start..end)
}
