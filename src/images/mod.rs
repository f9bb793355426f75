//! Embedded raster image remapping.
//!
//! Each embedded image is decoded to RGBA, every pixel's channels are
//! remapped onto the segment between the config's dark and light targets,
//! and the result is re-encoded. The remap is polarity-preserving: a pixel's
//! channel value picks its position on the segment, so dark regions land on
//! the dark target, light regions on the light target, and shading or
//! anti-aliasing gradients in between survive instead of collapsing to two
//! flat colors. Alpha passes through unmodified.
//!
//! Output-format policy: any non-opaque alpha value forces lossless PNG;
//! fully opaque images re-encode as JPEG at the configured quality.

use crate::color::Rgb;
use crate::common::error::Result;
use crate::config::InversionConfig;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Encoded output format chosen by the transparency policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Lossless, keeps the alpha channel.
    Png,
    /// Lossy at the configured quality, opaque images only.
    Jpeg,
}

impl OutputFormat {
    /// Canonical file extension for media part names.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// MIME type for the package content-types part.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// Whether an existing part extension already denotes this format.
    pub fn matches_extension(&self, extension: &str) -> bool {
        match self {
            OutputFormat::Png => extension.eq_ignore_ascii_case("png"),
            OutputFormat::Jpeg => {
                extension.eq_ignore_ascii_case("jpg") || extension.eq_ignore_ascii_case("jpeg")
            },
        }
    }
}

/// Result of transforming one embedded image.
#[derive(Debug)]
pub enum ImageOutcome {
    /// Replacement bytes in the given encoded format.
    Replaced {
        bytes: Vec<u8>,
        format: OutputFormat,
    },
    /// Keep the original bytes.
    Unchanged,
}

/// Remap one embedded image onto the configured color pair.
///
/// Returns [`ImageOutcome::Unchanged`] when there is nothing to do (image
/// remapping disabled, or no raster data at all). Malformed image bytes are
/// an error; the caller downgrades it to a warning and leaves the enclosing
/// shape untouched.
pub fn transform_image(data: &[u8], config: &InversionConfig) -> Result<ImageOutcome> {
    if !config.invert_images || data.is_empty() {
        return Ok(ImageOutcome::Unchanged);
    }

    let decoded = image::load_from_memory(data)?;
    let mut rgba = decoded.into_rgba8();

    let translucent = rgba.pixels().any(|p| p.0[3] != u8::MAX);
    remap_pixels(&mut rgba, config.dark_target(), config.light_target());

    let format = if translucent {
        OutputFormat::Png
    } else {
        OutputFormat::Jpeg
    };
    let bytes = encode(rgba, format, config.image_quality)?;
    tracing::debug!(
        format = format.extension(),
        in_len = data.len(),
        out_len = bytes.len(),
        "remapped embedded image"
    );
    Ok(ImageOutcome::Replaced { bytes, format })
}

/// Remap every pixel's RGB onto the dark-to-light target segment.
fn remap_pixels(img: &mut RgbaImage, dark: Rgb, light: Rgb) {
    for pixel in img.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        pixel.0 = [
            remap_channel(r, dark.r, light.r),
            remap_channel(g, dark.g, light.g),
            remap_channel(b, dark.b, light.b),
            a,
        ];
    }
}

/// Linear interpolation of one channel between the two target endpoints.
///
/// 0 lands exactly on the dark target's channel, 255 exactly on the light
/// target's.
#[inline]
fn remap_channel(value: u8, dark: u8, light: u8) -> u8 {
    let t = value as f32 / 255.0;
    (dark as f32 + t * (light as f32 - dark as f32)).round() as u8
}

fn encode(img: RgbaImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    match format {
        OutputFormat::Png => {
            DynamicImage::ImageRgba8(img).write_to(&mut cursor, ImageFormat::Png)?;
        },
        OutputFormat::Jpeg => {
            // JPEG carries no alpha; the policy already guarantees the image
            // is fully opaque here.
            let rgb = DynamicImage::ImageRgba8(img).into_rgb8();
            let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
            rgb.write_with_encoder(encoder)?;
        },
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn png_of(pixels: &[[u8; 4]]) -> Vec<u8> {
        let img = RgbaImage::from_fn(pixels.len() as u32, 1, |x, _| Rgba(pixels[x as usize]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        cursor.into_inner()
    }

    fn decode_rgba(bytes: &[u8]) -> RgbaImage {
        image::load_from_memory(bytes).unwrap().into_rgba8()
    }

    #[test]
    fn opaque_image_goes_lossy() {
        let data = png_of(&[[255, 255, 255, 255], [0, 0, 0, 255]]);
        match transform_image(&data, &InversionConfig::default()).unwrap() {
            ImageOutcome::Replaced { format, .. } => assert_eq!(format, OutputFormat::Jpeg),
            ImageOutcome::Unchanged => panic!("expected a replacement"),
        }
    }

    #[test]
    fn translucent_image_stays_lossless() {
        let data = png_of(&[[255, 255, 255, 255], [10, 10, 10, 128]]);
        match transform_image(&data, &InversionConfig::default()).unwrap() {
            ImageOutcome::Replaced { format, .. } => assert_eq!(format, OutputFormat::Png),
            ImageOutcome::Unchanged => panic!("expected a replacement"),
        }
    }

    #[test]
    fn endpoints_map_exactly_and_alpha_survives() {
        // One translucent pixel forces the lossless path so pixel values can
        // be checked exactly.
        let data = png_of(&[
            [255, 255, 255, 255],
            [0, 0, 0, 255],
            [128, 128, 128, 77],
        ]);
        let config = InversionConfig::new(Rgb::new(16, 24, 32), Rgb::new(242, 242, 242));
        let ImageOutcome::Replaced { bytes, format } = transform_image(&data, &config).unwrap()
        else {
            panic!("expected a replacement");
        };
        assert_eq!(format, OutputFormat::Png);

        let out = decode_rgba(&bytes);
        // White maps onto the light target, black onto the dark target.
        assert_eq!(out.get_pixel(0, 0).0, [242, 242, 242, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [16, 24, 32, 255]);
        // Mid grey lands mid segment, alpha untouched.
        let mid = out.get_pixel(2, 0).0;
        assert_eq!(mid[3], 77);
        assert!(mid[0] > 16 && mid[0] < 242);
    }

    #[test]
    fn swapping_config_fields_changes_nothing() {
        let data = png_of(&[[255, 255, 255, 255], [0, 0, 0, 255], [200, 30, 90, 255]]);
        let a = InversionConfig::new(Rgb::BLACK, Rgb::WHITE);
        let b = InversionConfig::new(Rgb::WHITE, Rgb::BLACK);
        let out_a = match transform_image(&data, &a).unwrap() {
            ImageOutcome::Replaced { bytes, .. } => bytes,
            ImageOutcome::Unchanged => panic!("expected a replacement"),
        };
        let out_b = match transform_image(&data, &b).unwrap() {
            ImageOutcome::Replaced { bytes, .. } => bytes,
            ImageOutcome::Unchanged => panic!("expected a replacement"),
        };
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn shading_is_preserved_monotonically() {
        let data = png_of(&[
            [40, 40, 40, 255],
            [120, 120, 120, 255],
            [220, 220, 220, 255],
            [0, 0, 0, 1],
        ]);
        let config = InversionConfig::new(Rgb::new(10, 10, 10), Rgb::new(250, 250, 250));
        let ImageOutcome::Replaced { bytes, .. } = transform_image(&data, &config).unwrap()
        else {
            panic!("expected a replacement");
        };
        let out = decode_rgba(&bytes);
        let g0 = out.get_pixel(0, 0).0[0];
        let g1 = out.get_pixel(1, 0).0[0];
        let g2 = out.get_pixel(2, 0).0[0];
        assert!(g0 < g1 && g1 < g2, "gradient flattened: {g0} {g1} {g2}");
    }

    #[test]
    fn disabled_images_pass_through() {
        let data = png_of(&[[1, 2, 3, 255]]);
        let config = InversionConfig::default().with_invert_images(false);
        assert!(matches!(
            transform_image(&data, &config).unwrap(),
            ImageOutcome::Unchanged
        ));
    }

    #[test]
    fn empty_input_is_no_change() {
        assert!(matches!(
            transform_image(&[], &InversionConfig::default()).unwrap(),
            ImageOutcome::Unchanged
        ));
    }

    #[test]
    fn malformed_bytes_are_an_error() {
        assert!(transform_image(b"not an image at all", &InversionConfig::default()).is_err());
    }

    #[test]
    fn extension_matching_covers_jpeg_spellings() {
        assert!(OutputFormat::Jpeg.matches_extension("jpg"));
        assert!(OutputFormat::Jpeg.matches_extension("JPEG"));
        assert!(!OutputFormat::Jpeg.matches_extension("png"));
        assert!(OutputFormat::Png.matches_extension("PNG"));
    }
}
