//! Shape tree model for one slide.
//!
//! A slide parses into a tree of [`Shape`] nodes over a closed set of
//! variants, each exposing a small capability interface instead of
//! open-ended dynamic dispatch. Paintable attributes carry a [`Paint`]
//! classification; explicit solid colors additionally record the byte span
//! of their six hex digits inside the slide XML so recoloring can patch the
//! buffer in place without re-serializing anything.

use crate::color::Rgb;
use std::ops::Range;

/// The closed set of slide shape variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// Text or auto shape (`p:sp`)
    Shape,
    /// Picture (`p:pic`)
    Picture,
    /// Table or chart container (`p:graphicFrame`)
    GraphicFrame,
    /// Group of shapes (`p:grpSp`)
    GroupShape,
    /// Connector (`p:cxnSp`)
    Connector,
}

impl ShapeKind {
    /// Lowercase noun for warning messages.
    pub fn noun(&self) -> &'static str {
        match self {
            ShapeKind::Shape => "shape",
            ShapeKind::Picture => "picture",
            ShapeKind::GraphicFrame => "graphic frame",
            ShapeKind::GroupShape => "group",
            ShapeKind::Connector => "connector",
        }
    }
}

/// Which paintable attribute a [`Paint`] was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintSlot {
    Fill,
    Line,
    Text,
    Background,
}

impl PaintSlot {
    /// Attribute name for warning messages.
    pub fn describe(&self) -> &'static str {
        match self {
            PaintSlot::Fill => "fill",
            PaintSlot::Line => "line",
            PaintSlot::Text => "text",
            PaintSlot::Background => "background",
        }
    }
}

/// An explicit solid color and where its hex digits live in the slide XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidPaint {
    /// The color as currently written.
    pub color: Rgb,
    /// Byte range of the six hex digits inside the slide part.
    pub span: Range<usize>,
}

/// Classification of one paintable attribute.
///
/// Only [`Paint::Solid`] is rewritable; everything else is left untouched
/// and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Paint {
    /// Explicit solid color.
    Solid(SolidPaint),
    /// Theme-inherited color (scheme/system color or background reference),
    /// named for diagnostics.
    Scheme(String),
    /// Gradient fill.
    Gradient,
    /// Pattern fill.
    Pattern,
    /// Raster/texture fill on a non-picture attribute.
    Picture,
}

/// One node of the slide's shape tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    kind: ShapeKind,
    /// Name from `p:cNvPr`; may be empty.
    name: String,
    /// Explicit fill paints (a group's own properties included).
    pub fills: Vec<Paint>,
    /// Explicit outline paints.
    pub lines: Vec<Paint>,
    /// Explicit per-run text colors, in document order.
    pub text_colors: Vec<Paint>,
    /// Relationship id of the embedded media, for pictures.
    pub image_rel: Option<String>,
    /// Child shapes, for groups.
    pub children: Vec<Shape>,
}

impl Shape {
    /// Create an empty node of the given kind.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            fills: Vec::new(),
            lines: Vec::new(),
            text_colors: Vec::new(),
            image_rel: None,
            children: Vec::new(),
        }
    }

    /// The shape's variant.
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Set the `p:cNvPr` name if not already known.
    pub fn set_name_once(&mut self, name: &str) {
        if self.name.is_empty() {
            self.name = name.to_string();
        }
    }

    /// Raw shape name; may be empty.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable identifier for warnings.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            format!("unnamed {}", self.kind.noun())
        } else {
            format!("{} '{}'", self.kind.noun(), self.name)
        }
    }

    /// Whether the shape carries any explicit fill paint.
    #[inline]
    pub fn has_fill(&self) -> bool {
        !self.fills.is_empty()
    }

    /// Whether the shape carries any explicit outline paint.
    #[inline]
    pub fn has_line(&self) -> bool {
        !self.lines.is_empty()
    }

    /// Whether the shape carries any explicit text run color.
    #[inline]
    pub fn has_text_runs(&self) -> bool {
        !self.text_colors.is_empty()
    }

    /// Whether this is a picture shape.
    #[inline]
    pub fn is_picture(&self) -> bool {
        self.kind == ShapeKind::Picture
    }

    /// Whether this is a group containing child shapes.
    #[inline]
    pub fn is_group(&self) -> bool {
        self.kind == ShapeKind::GroupShape
    }
}

/// Everything recolorable parsed out of one slide part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideShapes {
    /// Top-level shapes in document order.
    pub shapes: Vec<Shape>,
    /// The slide's own background paint, if it declares one.
    pub background: Option<Paint>,
    /// Oddities found while parsing, surfaced as warnings.
    pub notes: Vec<String>,
}
