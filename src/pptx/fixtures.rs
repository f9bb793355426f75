//! In-memory presentation builders for tests.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

pub(crate) const NS: &str = concat!(
    "xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" ",
    "xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\" ",
    "xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\""
);

const REL_SLIDE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// Wrap shape markup into a complete slide part.
pub(crate) fn slide_xml(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <p:sld {NS}><p:cSld><p:spTree>{body}</p:spTree></p:cSld></p:sld>"
    )
}

/// A plain shape with an explicit solid fill.
pub(crate) fn sp_xml(name: &str, fill_hex: &str) -> String {
    format!(
        "<p:sp>\
         <p:nvSpPr><p:cNvPr id=\"2\" name=\"{name}\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
         <p:spPr><a:solidFill><a:srgbClr val=\"{fill_hex}\"/></a:solidFill></p:spPr>\
         </p:sp>"
    )
}

/// A shape with a gradient fill.
pub(crate) fn gradient_sp_xml(name: &str) -> String {
    format!(
        "<p:sp>\
         <p:nvSpPr><p:cNvPr id=\"3\" name=\"{name}\"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>\
         <p:spPr><a:gradFill><a:gsLst>\
         <a:gs pos=\"0\"><a:srgbClr val=\"FF0000\"/></a:gs>\
         <a:gs pos=\"100000\"><a:srgbClr val=\"0000FF\"/></a:gs>\
         </a:gsLst></a:gradFill></p:spPr>\
         </p:sp>"
    )
}

/// A picture shape embedding `rid`.
pub(crate) fn pic_xml(name: &str, rid: &str) -> String {
    format!(
        "<p:pic>\
         <p:nvPicPr><p:cNvPr id=\"4\" name=\"{name}\"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>\
         <p:blipFill><a:blip r:embed=\"{rid}\"/><a:stretch><a:fillRect/></a:stretch></p:blipFill>\
         <p:spPr/>\
         </p:pic>"
    )
}

/// PNG bytes for a one-row image with the given RGBA pixels.
pub(crate) fn png_pixels(pixels: &[[u8; 4]]) -> Vec<u8> {
    let img = RgbaImage::from_fn(pixels.len() as u32, 1, |x, _| Rgba(pixels[x as usize]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// Builds a minimal but well-formed `.pptx` archive.
pub(crate) struct DeckBuilder {
    slides: Vec<String>,
    // (rid, media file name) per slide
    slide_images: Vec<Vec<(String, String)>>,
    // media file name under ppt/media/ and its bytes
    media: Vec<(String, Vec<u8>)>,
}

impl DeckBuilder {
    pub(crate) fn new() -> Self {
        Self {
            slides: Vec::new(),
            slide_images: Vec::new(),
            media: Vec::new(),
        }
    }

    pub(crate) fn slide(mut self, xml: &str) -> Self {
        self.slides.push(xml.to_string());
        self.slide_images.push(Vec::new());
        self
    }

    /// Add a slide whose `rid` points at `file` under `ppt/media/`.
    pub(crate) fn slide_with_image(mut self, xml: &str, rid: &str, file: &str) -> Self {
        self.slides.push(xml.to_string());
        self.slide_images
            .push(vec![(rid.to_string(), file.to_string())]);
        self
    }

    pub(crate) fn media(mut self, file: &str, bytes: Vec<u8>) -> Self {
        self.media.push((file.to_string(), bytes));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let mut parts: Vec<(String, Vec<u8>)> = Vec::new();

        let content_types = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>",
            "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Default Extension=\"png\" ContentType=\"image/png\"/>",
            "<Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>",
            "</Types>"
        );
        parts.push(("[Content_Types].xml".into(), content_types.as_bytes().to_vec()));

        let root_rels = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             <Relationship Id=\"rId1\" Type=\"{REL_OFFICE_DOCUMENT}\" Target=\"ppt/presentation.xml\"/>\
             </Relationships>"
        );
        parts.push(("_rels/.rels".into(), root_rels.into_bytes()));

        let mut sld_ids = String::new();
        let mut pres_rels = String::new();
        for i in 0..self.slides.len() {
            let n = i + 1;
            sld_ids.push_str(&format!("<p:sldId id=\"{}\" r:id=\"rId{n}\"/>", 255 + n));
            pres_rels.push_str(&format!(
                "<Relationship Id=\"rId{n}\" Type=\"{REL_SLIDE}\" Target=\"slides/slide{n}.xml\"/>"
            ));
        }
        let presentation = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <p:presentation {NS}><p:sldMasterIdLst/>\
             <p:sldIdLst>{sld_ids}</p:sldIdLst>\
             <p:sldSz cx=\"12192000\" cy=\"6858000\"/></p:presentation>"
        );
        parts.push(("ppt/presentation.xml".into(), presentation.into_bytes()));
        let pres_rels = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
             {pres_rels}</Relationships>"
        );
        parts.push(("ppt/_rels/presentation.xml.rels".into(), pres_rels.into_bytes()));

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            parts.push((format!("ppt/slides/slide{n}.xml"), slide.as_bytes().to_vec()));
            if !self.slide_images[i].is_empty() {
                let mut rels = String::new();
                for (rid, file) in &self.slide_images[i] {
                    rels.push_str(&format!(
                        "<Relationship Id=\"{rid}\" Type=\"{REL_IMAGE}\" Target=\"../media/{file}\"/>"
                    ));
                }
                let rels = format!(
                    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
                     <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
                     {rels}</Relationships>"
                );
                parts.push((
                    format!("ppt/slides/_rels/slide{n}.xml.rels"),
                    rels.into_bytes(),
                ));
            }
        }

        for (file, bytes) in self.media {
            parts.push((format!("ppt/media/{file}"), bytes));
        }

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for (name, bytes) in parts {
            writer.start_file(name, options).unwrap();
            writer.write_all(&bytes).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }
}
