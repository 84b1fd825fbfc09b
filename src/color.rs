// SPDX-License-Identifier: PMPL-1.0-or-later
//! Color parsing and WCAG contrast math.
//!
//! Relative luminance and contrast ratio follow WCAG 2.1:
//! <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>
//! - AA: 4.5:1 for normal text, 3:1 for large text

use serde::{Deserialize, Serialize};

/// Minimum ratio for normal text at level AA
pub const AA_NORMAL: f64 = 4.5;
/// Minimum ratio for large text at level AA
pub const AA_LARGE: f64 = 3.0;

/// An sRGB color with alpha in 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f64,
}

impl ColorSample {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, alpha: 1.0 }
    }

    pub fn is_opaque(&self) -> bool {
        self.alpha >= 1.0
    }

    /// Alpha-composite this color over `backdrop`
    pub fn over(&self, backdrop: ColorSample) -> ColorSample {
        if self.is_opaque() {
            return *self;
        }
        let a = self.alpha.clamp(0.0, 1.0);
        let mix = |fg: u8, bg: u8| -> u8 {
            (fg as f64 * a + bg as f64 * (1.0 - a)).round().clamp(0.0, 255.0) as u8
        };
        ColorSample {
            r: mix(self.r, backdrop.r),
            g: mix(self.g, backdrop.g),
            b: mix(self.b, backdrop.b),
            alpha: a + backdrop.alpha * (1.0 - a),
        }
    }

    /// `#rrggbb` form, alpha dropped
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Parse a CSS color literal.
///
/// Returns `None` for `transparent`, fully transparent values, keywords
/// that depend on context (`inherit`, `currentcolor`, `var(..)`) and
/// anything unparseable. Callers must never substitute a default.
pub fn parse_color(literal: &str) -> Option<ColorSample> {
    let value = literal.trim().to_lowercase();
    let value = value.trim_end_matches("!important").trim();

    let sample = if let Some(hex) = value.strip_prefix('#') {
        parse_hex(hex)
    } else if value.starts_with("rgb") {
        parse_rgb(value)
    } else if value.starts_with("hsl") {
        parse_hsl(value)
    } else {
        named_color(value).map(|(r, g, b)| ColorSample::rgb(r, g, b))
    }?;

    if sample.alpha <= 0.0 {
        None
    } else {
        Some(sample)
    }
}

fn parse_hex(hex: &str) -> Option<ColorSample> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let expanded: String = match hex.len() {
        3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return None,
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    let alpha = if expanded.len() == 8 {
        channel(6)? as f64 / 255.0
    } else {
        1.0
    };
    Some(ColorSample {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
        alpha,
    })
}

/// Arguments between the parentheses of a functional notation
fn function_args(value: &str) -> Option<Vec<&str>> {
    let open = value.find('(')?;
    let close = value.rfind(')')?;
    if close <= open {
        return None;
    }
    let args: Vec<&str> = value[open + 1..close]
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    if args.len() == 3 || args.len() == 4 {
        Some(args)
    } else {
        None
    }
}

fn parse_alpha(arg: Option<&&str>) -> Option<f64> {
    match arg {
        None => Some(1.0),
        Some(a) => match a.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok().map(|p| p / 100.0),
            None => a.parse::<f64>().ok(),
        }
        .map(|a| a.clamp(0.0, 1.0)),
    }
}

fn parse_rgb(value: &str) -> Option<ColorSample> {
    let args = function_args(value)?;
    let channel = |arg: &str| -> Option<u8> {
        let v = match arg.strip_suffix('%') {
            Some(pct) => pct.parse::<f64>().ok()? * 2.55,
            None => arg.parse::<f64>().ok()?,
        };
        Some(v.round().clamp(0.0, 255.0) as u8)
    };
    Some(ColorSample {
        r: channel(args[0])?,
        g: channel(args[1])?,
        b: channel(args[2])?,
        alpha: parse_alpha(args.get(3))?,
    })
}

fn parse_hsl(value: &str) -> Option<ColorSample> {
    let args = function_args(value)?;
    let hue: f64 = args[0]
        .trim_end_matches("deg")
        .parse()
        .ok()?;
    let percent = |arg: &str| -> Option<f64> {
        arg.trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .map(|v| (v / 100.0).clamp(0.0, 1.0))
    };
    let (r, g, b) = hsl_to_rgb(hue, percent(args[1])?, percent(args[2])?);
    Some(ColorSample {
        r,
        g,
        b,
        alpha: parse_alpha(args.get(3))?,
    })
}

/// Standard HSL to RGB conversion, hue in degrees, s and l in 0..=1
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 360.0;
    let to_byte = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;

    if saturation == 0.0 {
        let v = to_byte(lightness);
        return (v, v, v);
    }

    let q = if lightness < 0.5 {
        lightness * (1.0 + saturation)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;

    let hue_to_channel = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };

    (
        to_byte(hue_to_channel(h + 1.0 / 3.0)),
        to_byte(hue_to_channel(h)),
        to_byte(hue_to_channel(h - 1.0 / 3.0)),
    )
}

/// Named CSS colors
pub fn named_color(name: &str) -> Option<(u8, u8, u8)> {
    Some(match name {
        "white" => (255, 255, 255),
        "black" => (0, 0, 0),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "lime" => (0, 255, 0),
        "aqua" | "cyan" => (0, 255, 255),
        "teal" => (0, 128, 128),
        "navy" => (0, 0, 128),
        "fuchsia" | "magenta" => (255, 0, 255),
        "purple" => (128, 0, 128),
        "orange" => (255, 165, 0),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "dimgray" | "dimgrey" => (105, 105, 105),
        "whitesmoke" => (245, 245, 245),
        "gainsboro" => (220, 220, 220),
        "darkblue" => (0, 0, 139),
        "darkred" => (139, 0, 0),
        "darkgreen" => (0, 100, 0),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        "gold" => (255, 215, 0),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "coral" => (255, 127, 80),
        "crimson" => (220, 20, 60),
        "beige" => (245, 245, 220),
        "ivory" => (255, 255, 240),
        _ => return None,
    })
}

/// Relative luminance per WCAG 2.1
pub fn relative_luminance(sample: ColorSample) -> f64 {
    let linear = |c: u8| {
        let v = c as f64 / 255.0;
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };
    0.2126 * linear(sample.r) + 0.7152 * linear(sample.g) + 0.0722 * linear(sample.b)
}

/// Contrast ratio between two colors, in 1.0..=21.0, order independent
pub fn contrast_ratio(a: ColorSample, b: ColorSample) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let (lighter, darker) = if la >= lb { (la, lb) } else { (lb, la) };
    (lighter + 0.05) / (darker + 0.05)
}

/// Large text is at least 18pt (24px), or 14pt (about 19px) when bold
pub fn is_large_text(font_size_px: f64, weight: u16) -> bool {
    font_size_px >= 24.0 || (font_size_px >= 19.0 && weight >= 700)
}

/// Whether `ratio` satisfies WCAG 1.4.3 at level AA
pub fn meets_aa(ratio: f64, is_large: bool) -> bool {
    ratio >= if is_large { AA_LARGE } else { AA_NORMAL }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: ColorSample = ColorSample::rgb(0, 0, 0);
    const WHITE: ColorSample = ColorSample::rgb(255, 255, 255);

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_color("#fff"), Some(WHITE));
        assert_eq!(parse_color("#000000"), Some(BLACK));
        assert_eq!(parse_color("#FF0000"), Some(ColorSample::rgb(255, 0, 0)));
        let translucent = parse_color("#00000080").expect("8-digit hex");
        assert!((translucent.alpha - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#ggg"), None);
    }

    #[test]
    fn test_parse_rgb_color() {
        assert_eq!(parse_color("rgb(255, 0, 0)"), Some(ColorSample::rgb(255, 0, 0)));
        assert_eq!(parse_color("rgb(100%, 0%, 0%)"), Some(ColorSample::rgb(255, 0, 0)));
        let c = parse_color("rgba(0, 128, 0, 0.5)").expect("rgba");
        assert_eq!((c.r, c.g, c.b), (0, 128, 0));
        assert!((c.alpha - 0.5).abs() < 1e-9);
        assert_eq!(parse_color("rgb(0 0 0 / 50%)").map(|c| c.alpha), Some(0.5));
        assert_eq!(parse_color("rgb(1, 2)"), None);
    }

    #[test]
    fn test_parse_hsl_color() {
        assert_eq!(parse_color("hsl(0, 100%, 50%)"), Some(ColorSample::rgb(255, 0, 0)));
        assert_eq!(parse_color("hsl(120deg, 100%, 25%)"), Some(ColorSample::rgb(0, 128, 0)));
        assert_eq!(parse_color("hsl(0, 0%, 100%)"), Some(WHITE));
        assert_eq!(parse_color("hsla(240, 100%, 50%, 1)"), Some(ColorSample::rgb(0, 0, 255)));
    }

    #[test]
    fn test_transparent_and_unknown_are_none() {
        assert_eq!(parse_color("transparent"), None);
        assert_eq!(parse_color("rgba(0,0,0,0)"), None);
        assert_eq!(parse_color("inherit"), None);
        assert_eq!(parse_color("var(--brand)"), None);
        assert_eq!(parse_color("not-a-color"), None);
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(parse_color("White"), Some(WHITE));
        assert_eq!(parse_color("navy"), Some(ColorSample::rgb(0, 0, 128)));
        assert_eq!(parse_color("red !important"), Some(ColorSample::rgb(255, 0, 0)));
    }

    #[test]
    fn test_contrast_ratio_black_white() {
        let ratio = contrast_ratio(BLACK, WHITE);
        assert!((ratio - 21.0).abs() < 1e-9, "black on white should be 21:1, got {:.4}", ratio);
    }

    #[test]
    fn test_contrast_ratio_is_symmetric() {
        let samples = ["#777", "#0073aa", "#f5f5f5", "#1e1e1e", "#ff6600", "#3a3"];
        for a in samples {
            for b in samples {
                let ca = parse_color(a).expect("valid");
                let cb = parse_color(b).expect("valid");
                assert_eq!(contrast_ratio(ca, cb), contrast_ratio(cb, ca));
            }
        }
    }

    #[test]
    fn test_contrast_ratio_same_color() {
        let grey = ColorSample::rgb(128, 128, 128);
        assert!((contrast_ratio(grey, grey) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_relative_luminance_bounds() {
        assert!((relative_luminance(WHITE) - 1.0).abs() < 1e-9);
        assert!(relative_luminance(BLACK).abs() < 1e-9);
    }

    #[test]
    fn test_meets_aa_thresholds() {
        assert!(meets_aa(4.5, false));
        assert!(!meets_aa(4.49, false));
        assert!(meets_aa(3.0, true));
        assert!(!meets_aa(2.99, true));
    }

    #[test]
    fn test_is_large_text() {
        assert!(is_large_text(24.0, 400));
        assert!(!is_large_text(23.9, 400));
        assert!(is_large_text(19.0, 700));
        assert!(!is_large_text(19.0, 400));
        assert!(!is_large_text(18.0, 700));
    }

    #[test]
    fn test_alpha_composite() {
        let half_black = ColorSample { alpha: 0.5, ..BLACK };
        let mixed = half_black.over(WHITE);
        assert_eq!((mixed.r, mixed.g, mixed.b), (128, 128, 128));
        assert!(mixed.is_opaque());
        assert_eq!(mixed.to_hex(), "#808080");
    }
}
