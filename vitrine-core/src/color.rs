//! Color parsing and contrast.
//!
//! Style properties carry colors as bare HSL triples (`210 65.4% 20.4%`),
//! the form the stylesheet wraps in `hsl(var(--primary))`. Tenant records
//! may store either hex or an already converted triple; [`parse_color`]
//! accepts both so callers never need to know which one they hold.

use crate::ColorError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static HSL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?i:hsl\()?\s*(-?\d+(?:\.\d+)?)(?:deg)?\s*[\s,]\s*(\d+(?:\.\d+)?)%\s*[\s,]\s*(\d+(?:\.\d+)?)%\s*\)?$",
    )
    .expect("hsl pattern is valid")
});

/// Light or dark color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    Light,
    Dark,
}

/// A color in HSL space. Hue in degrees `[0, 360)`, saturation and
/// lightness in percent `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const WHITE: Hsl = Hsl {
        h: 0.0,
        s: 0.0,
        l: 100.0,
    };

    /// Near-black used as the dark foreground.
    pub const INK: Hsl = Hsl {
        h: 222.2,
        s: 47.4,
        l: 11.2,
    };

    pub fn new(h: f32, s: f32, l: f32) -> Self {
        Self {
            h: h.rem_euclid(360.0),
            s: s.clamp(0.0, 100.0),
            l: l.clamp(0.0, 100.0),
        }
    }

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        let r = r as f32 / 255.0;
        let g = g as f32 / 255.0;
        let b = b as f32 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;

        if d == 0.0 {
            return Self::new(0.0, 0.0, l * 100.0);
        }

        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Self::new(h * 60.0, s * 100.0, l * 100.0)
    }

    pub fn to_rgb(&self) -> (u8, u8, u8) {
        let h = self.h / 360.0;
        let s = self.s / 100.0;
        let l = self.l / 100.0;

        if s == 0.0 {
            let v = channel(l);
            return (v, v, v);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            channel(hue_to_rgb(p, q, h + 1.0 / 3.0)),
            channel(hue_to_rgb(p, q, h)),
            channel(hue_to_rgb(p, q, h - 1.0 / 3.0)),
        )
    }

    /// WCAG relative luminance, `0.0` (black) to `1.0` (white).
    pub fn relative_luminance(&self) -> f64 {
        let (r, g, b) = self.to_rgb();
        let lin = |c: u8| {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        };
        0.2126 * lin(r) + 0.7152 * lin(g) + 0.0722 * lin(b)
    }

    /// WCAG contrast ratio between two colors, `1.0` to `21.0`.
    pub fn contrast_ratio(&self, other: &Hsl) -> f64 {
        let a = self.relative_luminance();
        let b = other.relative_luminance();
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        (hi + 0.05) / (lo + 0.05)
    }

    /// The bare triple written into style properties.
    pub fn to_css(&self) -> String {
        format!("{} {}% {}%", round1(self.h), round1(self.s), round1(self.l))
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Parse a hex (`#abc`, `#a1b2c3`) or HSL (`210 65% 20%`, `hsl(210, 65%, 20%)`) color.
pub fn parse_color(input: &str) -> Result<Hsl, ColorError> {
    let value = input.trim();
    if value.is_empty() {
        return Err(ColorError::Empty);
    }

    if let Some(caps) = HSL_PATTERN.captures(value) {
        let part = |i: usize| caps[i].parse::<f32>();
        return match (part(1), part(2), part(3)) {
            (Ok(h), Ok(s), Ok(l)) if h.is_finite() && s <= 100.0 && l <= 100.0 => {
                Ok(Hsl::new(h, s, l))
            }
            _ => Err(ColorError::InvalidHsl {
                value: value.to_string(),
            }),
        };
    }

    parse_hex(value)
}

fn parse_hex(value: &str) -> Result<Hsl, ColorError> {
    let digits = value.strip_prefix('#').unwrap_or(value);
    let expanded = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => digits.to_string(),
        _ => {
            return Err(ColorError::InvalidHex {
                value: value.to_string(),
            })
        }
    };

    let bytes = hex::decode(&expanded).map_err(|_| ColorError::InvalidHex {
        value: value.to_string(),
    })?;
    match bytes.as_slice() {
        [r, g, b] => Ok(Hsl::from_rgb(*r, *g, *b)),
        _ => Err(ColorError::InvalidHex {
            value: value.to_string(),
        }),
    }
}

/// Foreground that stays legible on `background`: white or ink,
/// whichever has the higher contrast ratio.
pub fn contrast_foreground(background: &Hsl) -> Hsl {
    if background.contrast_ratio(&Hsl::WHITE) >= background.contrast_ratio(&Hsl::INK) {
        Hsl::WHITE
    } else {
        Hsl::INK
    }
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn channel(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

fn round1(v: f32) -> f32 {
    let r = (v * 10.0).round() / 10.0;
    // avoid printing "-0"
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hex_converts_to_hsl_triple() {
        let hsl = parse_color("#123456").unwrap();
        assert_eq!(hsl.to_css(), "210 65.4% 20.4%");
    }

    #[test]
    fn test_short_hex_expands() {
        assert_eq!(parse_color("#fff").unwrap().to_css(), "0 0% 100%");
        assert_eq!(parse_color("000").unwrap().to_css(), "0 0% 0%");
    }

    #[test]
    fn test_preconverted_values_pass_through() {
        assert_eq!(parse_color("210 65% 20%").unwrap().to_css(), "210 65% 20%");
        assert_eq!(
            parse_color("hsl(210, 65%, 20%)").unwrap().to_css(),
            "210 65% 20%"
        );
        assert_eq!(parse_color("-30 50% 50%").unwrap().to_css(), "330 50% 50%");
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        assert_eq!(parse_color("  "), Err(ColorError::Empty));
        assert!(matches!(
            parse_color("#12345"),
            Err(ColorError::InvalidHex { .. })
        ));
        assert!(matches!(
            parse_color("#zzzzzz"),
            Err(ColorError::InvalidHex { .. })
        ));
        assert!(matches!(
            parse_color("210 120% 20%"),
            Err(ColorError::InvalidHsl { .. })
        ));
        assert!(parse_color("rebeccapurple").is_err());
    }

    #[test]
    fn test_overflowing_hue_is_rejected() {
        let huge = format!("{} 50% 50%", "9".repeat(50));
        assert_eq!(
            parse_color(&huge),
            Err(ColorError::InvalidHsl { value: huge.clone() })
        );
        assert!(parse_color(&format!("hsl({}, 50%, 50%)", "9".repeat(50))).is_err());
        // Large but finite hues still wrap.
        assert!(parse_color("7200000 50% 50%").is_ok());
    }

    #[test]
    fn test_contrast_foreground_extremes() {
        assert_eq!(contrast_foreground(&parse_color("#000000").unwrap()), Hsl::WHITE);
        assert_eq!(contrast_foreground(&parse_color("#ffffff").unwrap()), Hsl::INK);
        assert_eq!(contrast_foreground(&parse_color("#123456").unwrap()), Hsl::WHITE);
        assert_eq!(contrast_foreground(&parse_color("#ffe066").unwrap()), Hsl::INK);
    }

    proptest! {
        #[test]
        fn prop_rgb_hsl_roundtrip_is_close(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let (r2, g2, b2) = Hsl::from_rgb(r, g, b).to_rgb();
            prop_assert!((r as i16 - r2 as i16).abs() <= 1);
            prop_assert!((g as i16 - g2 as i16).abs() <= 1);
            prop_assert!((b as i16 - b2 as i16).abs() <= 1);
        }

        #[test]
        fn prop_contrast_foreground_is_legible(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let bg = Hsl::from_rgb(r, g, b);
            let fg = contrast_foreground(&bg);
            // The better of white/ink always clears WCAG large-text contrast.
            prop_assert!(bg.contrast_ratio(&fg) >= 3.0);
        }

        #[test]
        fn prop_hex_parse_is_total_for_six_digits(r in any::<u8>(), g in any::<u8>(), b in any::<u8>()) {
            let value = format!("#{:02x}{:02x}{:02x}", r, g, b);
            prop_assert!(parse_color(&value).is_ok());
        }
    }
}
