//! Color model and contrast validation.
//!
//! Implements the WCAG relative-luminance and contrast-ratio math used to
//! guard the configured color pair, plus the `Rgb` value type the rest of
//! the pipeline works with. All quantities are derived on the fly; nothing
//! here is stateful.

use crate::common::error::{Error, Result};
use once_cell::sync::Lazy;
use std::fmt;

/// Contrast ratio below which text fails the WCAG AA body-text bar.
pub const WCAG_AA_CONTRAST: f64 = 4.5;

/// Contrast ratio below which the two colors are nearly indistinguishable.
pub const LOW_CONTRAST: f64 = 1.5;

/// Relative-luminance midpoint separating "light" from "dark".
pub const POLARITY_MIDPOINT: f64 = 0.5;

/// sRGB-to-linear lookup for all 256 channel values.
///
/// Piecewise curve: c/12.92 below the linear cutoff, otherwise
/// ((c + 0.055) / 1.055)^2.4.
static SRGB_LINEAR: Lazy<[f64; 256]> = Lazy::new(|| {
    let mut table = [0.0f64; 256];
    for (value, slot) in table.iter_mut().enumerate() {
        let c = value as f64 / 255.0;
        *slot = if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        };
    }
    table
});

/// RGB color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red component (0-255)
    pub r: u8,
    /// Green component (0-255)
    pub g: u8,
    /// Blue component (0-255)
    pub b: u8,
}

impl Rgb {
    /// Pure black.
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    /// Pure white.
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color literal.
    ///
    /// Accepts `RRGGBB` with or without a leading `#`, case-insensitive.
    /// Anything else is a configuration error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use damson::color::Rgb;
    ///
    /// let red = Rgb::from_hex("FF0000").unwrap();
    /// let blue = Rgb::from_hex("#0000ff").unwrap();
    /// assert_eq!(red, Rgb::new(255, 0, 0));
    /// assert_eq!(blue, Rgb::new(0, 0, 255));
    /// ```
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidColor(hex.to_string()));
        }

        let parse = |range| {
            u8::from_str_radix(&digits[range], 16)
                .map_err(|_| Error::InvalidColor(hex.to_string()))
        };
        Ok(Self::new(parse(0..2)?, parse(2..4)?, parse(4..6)?))
    }

    /// Render as an uppercase `RRGGBB` string, the form slide XML uses.
    pub fn to_hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// WCAG relative luminance, 0.0 (black) to 1.0 (white).
    ///
    /// Channels are linearized through the piecewise sRGB curve and weighted
    /// 0.2126 / 0.7152 / 0.0722.
    pub fn relative_luminance(&self) -> f64 {
        0.2126 * SRGB_LINEAR[self.r as usize]
            + 0.7152 * SRGB_LINEAR[self.g as usize]
            + 0.0722 * SRGB_LINEAR[self.b as usize]
    }

    /// Whether this color classifies as "light" (luminance at or above the
    /// 0.5 midpoint).
    #[inline]
    pub fn is_light(&self) -> bool {
        self.relative_luminance() >= POLARITY_MIDPOINT
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// WCAG contrast ratio between two colors, from 1.0 to 21.0.
///
/// Symmetric in its arguments: the larger luminance always lands in the
/// numerator.
pub fn contrast_ratio(a: Rgb, b: Rgb) -> f64 {
    let la = a.relative_luminance();
    let lb = b.relative_luminance();
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Validate a configured color pair, returning advisory warnings.
///
/// Returns exactly one warning when the contrast ratio falls below the WCAG
/// AA body-text threshold, with the numeric ratio embedded in the message;
/// an empty list otherwise. Purely advisory, never fails.
pub fn validate_contrast(foreground: Rgb, background: Rgb) -> Vec<String> {
    let ratio = contrast_ratio(foreground, background);
    if ratio < LOW_CONTRAST {
        vec![format!(
            "Foreground {foreground} and background {background} are nearly indistinguishable \
             (contrast {ratio:.1}:1); the recolored deck may be unreadable"
        )]
    } else if ratio < WCAG_AA_CONTRAST {
        vec![format!(
            "Contrast {ratio:.1}:1 between {foreground} and {background} is below the WCAG AA \
             threshold of 4.5:1; body text may be hard to read"
        )]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn luminance_endpoints() {
        assert_eq!(Rgb::BLACK.relative_luminance(), 0.0);
        assert!((Rgb::WHITE.relative_luminance() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn luminance_orders_primaries() {
        let red = Rgb::new(255, 0, 0).relative_luminance();
        let green = Rgb::new(0, 255, 0).relative_luminance();
        let blue = Rgb::new(0, 0, 255).relative_luminance();
        assert!(green > red);
        assert!(red > blue);
    }

    #[test]
    fn polarity_classification() {
        assert!(Rgb::WHITE.is_light());
        assert!(!Rgb::BLACK.is_light());
        assert!(Rgb::new(255, 255, 0).is_light());
        assert!(!Rgb::new(0, 0, 139).is_light());
    }

    #[test]
    fn contrast_extremes() {
        let ratio = contrast_ratio(Rgb::WHITE, Rgb::BLACK);
        assert!((ratio - 21.0).abs() < 1e-9);
        assert_eq!(ratio, contrast_ratio(Rgb::BLACK, Rgb::WHITE));
    }

    #[test]
    fn contrast_of_identical_colors_is_unity() {
        let c = Rgb::new(120, 90, 200);
        assert_eq!(contrast_ratio(c, c), 1.0);
    }

    #[test]
    fn validate_identical_colors_warns_once() {
        let warnings = validate_contrast(Rgb::new(40, 40, 40), Rgb::new(40, 40, 40));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("1.0:1"));
    }

    #[test]
    fn validate_low_but_nonzero_contrast_cites_wcag() {
        // Mid greys: distinguishable but far from 4.5:1.
        let warnings = validate_contrast(Rgb::new(110, 110, 110), Rgb::new(160, 160, 160));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("4.5:1"));
    }

    #[test]
    fn validate_black_on_white_passes() {
        assert!(validate_contrast(Rgb::BLACK, Rgb::WHITE).is_empty());
    }

    #[test]
    fn hex_parsing_accepts_both_forms() {
        assert_eq!(Rgb::from_hex("1A2b3C").unwrap(), Rgb::new(26, 43, 60));
        assert_eq!(Rgb::from_hex("#1a2B3c").unwrap(), Rgb::new(26, 43, 60));
    }

    #[test]
    fn hex_parsing_rejects_malformed_input() {
        for bad in ["", "12345", "1234567", "GGGGGG", "#12", "red"] {
            assert!(matches!(Rgb::from_hex(bad), Err(Error::InvalidColor(_))));
        }
    }

    #[test]
    fn hex_round_trip_is_uppercase() {
        let c = Rgb::new(26, 43, 60);
        assert_eq!(c.to_hex(), "1A2B3C");
        assert_eq!(Rgb::from_hex(&c.to_hex()).unwrap(), c);
    }

    proptest! {
        #[test]
        fn luminance_monotonic_per_channel(
            a in 0u8..=255, b in 0u8..=255,
            g in 0u8..=255, bl in 0u8..=255,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(
                Rgb::new(hi, g, bl).relative_luminance()
                    >= Rgb::new(lo, g, bl).relative_luminance()
            );
            prop_assert!(
                Rgb::new(g, hi, bl).relative_luminance()
                    >= Rgb::new(g, lo, bl).relative_luminance()
            );
            prop_assert!(
                Rgb::new(g, bl, hi).relative_luminance()
                    >= Rgb::new(g, bl, lo).relative_luminance()
            );
        }

        #[test]
        fn contrast_is_symmetric_and_at_least_one(
            r1 in 0u8..=255, g1 in 0u8..=255, b1 in 0u8..=255,
            r2 in 0u8..=255, g2 in 0u8..=255, b2 in 0u8..=255,
        ) {
            let a = Rgb::new(r1, g1, b1);
            let b = Rgb::new(r2, g2, b2);
            let ratio = contrast_ratio(a, b);
            prop_assert!(ratio >= 1.0);
            prop_assert!((ratio - contrast_ratio(b, a)).abs() < 1e-12);
            prop_assert!(ratio <= 21.0 + 1e-9);
        }

        #[test]
        fn luminance_stays_in_unit_range(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
            let l = Rgb::new(r, g, b).relative_luminance();
            prop_assert!((0.0..=1.0 + 1e-12).contains(&l));
        }
    }
}
