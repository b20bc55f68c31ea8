//! CSS colour handling.
//!
//! Two entry points live here:
//!
//! - [`to_hex`] is the lossy normaliser applied to every resolved colour before
//!   capture. It never fails; anything it cannot read becomes `#000000`.
//! - [`parse_css_color`] is the strict parser used by the rasterizer. It only
//!   understands the legacy colour syntax and reports modern colour functions
//!   as errors, which is exactly why the normaliser has to run first.

use std::fmt;
use std::str::FromStr;

use csscolorparser::Color as CssColor;

/// Fallback produced by [`to_hex`] for anything it cannot read.
pub const FALLBACK_HEX: &str = "#000000";

/// An sRGB colour with straight alpha in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0.0 };
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 1.0 };
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 1.0 };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }

    /// Serialise the way a browser reports a computed colour.
    pub fn to_css(&self) -> String {
        if self.a >= 1.0 {
            format!("rgb({}, {}, {})", self.r, self.g, self.b)
        } else {
            let a = (self.a.max(0.0) * 1000.0).round() / 1000.0;
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, a)
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Why the strict parser rejected a colour value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// A functional notation outside the legacy set, e.g. `oklch(...)`.
    UnsupportedFunction(String),
    /// Malformed or unknown value.
    Invalid(String),
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorError::UnsupportedFunction(name) => {
                write!(f, "Attempting to parse an unsupported color function \"{}\"", name)
            }
            ColorError::Invalid(value) => write!(f, "Invalid color value \"{}\"", value),
        }
    }
}

impl std::error::Error for ColorError {}

/// Normalise any resolved colour string to a 6-digit lowercase hex string.
///
/// - `#` input of exactly 7 characters is returned unchanged, any other `#`
///   input becomes `#000000`
/// - the first `rgb(r, g, b)` / `rgba(r, g, b, a)` found is converted with its
///   channels clamped to `0..=255`; alpha is ignored
/// - everything else becomes `#000000`
pub fn to_hex(color: &str) -> String {
    if color.is_empty() {
        return FALLBACK_HEX.to_string();
    }
    if color.starts_with('#') {
        return if color.chars().count() == 7 {
            color.to_string()
        } else {
            FALLBACK_HEX.to_string()
        };
    }

    let lower = color.to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = lower[from..].find("rgb") {
        let start = from + pos;
        if let Some([r, g, b]) = match_rgb_function(&lower[start..]) {
            return format!("#{:02x}{:02x}{:02x}", r, g, b);
        }
        from = start + 3;
    }
    FALLBACK_HEX.to_string()
}

/// Match `rgb(` or `rgba(` followed by three comma separated integers and an
/// optional decimal alpha, with free whitespace between tokens.
fn match_rgb_function(s: &str) -> Option<[u8; 3]> {
    let rest = s.strip_prefix("rgb")?;
    let rest = rest.strip_prefix('a').unwrap_or(rest);
    let mut rest = rest.strip_prefix('(')?;

    let mut channels = [0u8; 3];
    for (i, slot) in channels.iter_mut().enumerate() {
        rest = rest.trim_start();
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        let value = rest[..digits].parse::<u64>().unwrap_or(u64::MAX).min(255);
        *slot = value as u8;
        rest = rest[digits..].trim_start();
        if i < 2 {
            rest = rest.strip_prefix(',')?;
        }
    }

    if let Some(after_comma) = rest.strip_prefix(',') {
        let after_comma = after_comma.trim_start();
        let alpha = after_comma
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .count();
        if alpha == 0 {
            return None;
        }
        rest = after_comma[alpha..].trim_start();
    }

    rest.starts_with(')').then_some(channels)
}

/// Functional notations the rasterizer understands.
const LEGACY_FUNCTIONS: &[&str] = &["rgb", "rgba", "hsl", "hsla", "hwb", "hwba"];

/// Strictly parse a legacy CSS colour: hex, named colours, `transparent`,
/// `rgb[a]()`, `hsl[a]()` and `hwb()`.
pub fn parse_css_color(value: &str) -> Result<Rgba, ColorError> {
    let v = value.trim().to_ascii_lowercase();
    if v.is_empty() {
        return Err(ColorError::Invalid(value.to_string()));
    }
    if let Some(open) = v.find('(') {
        let name = v[..open].trim();
        if !LEGACY_FUNCTIONS.contains(&name) {
            return Err(ColorError::UnsupportedFunction(name.to_string()));
        }
    } else if !v.starts_with('#') && v.chars().all(|c| c.is_ascii_hexdigit()) {
        // Hex digits need their `#` in CSS.
        return Err(ColorError::Invalid(value.to_string()));
    }

    let c = CssColor::from_str(&v).map_err(|_| ColorError::Invalid(value.to_string()))?;
    let channel = |x: f64| (x * 255.0).round().clamp(0.0, 255.0) as u8;
    Ok(Rgba {
        r: channel(c.r),
        g: channel(c.g),
        b: channel(c.b),
        a: c.a.clamp(0.0, 1.0) as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_of_correct_length_passes_through() {
        assert_eq!(to_hex("#1a2b3c"), "#1a2b3c");
        assert_eq!(to_hex(&to_hex("#abcdef")), "#abcdef");
    }

    #[test]
    fn malformed_hex_falls_back_to_black() {
        assert_eq!(to_hex("#fff"), "#000000");
        assert_eq!(to_hex("#ff00ff80"), "#000000");
    }

    #[test]
    fn rgb_and_rgba_are_converted() {
        assert_eq!(to_hex("rgb(255, 0, 0)"), "#ff0000");
        assert_eq!(to_hex("rgba(16, 32, 48, 0.5)"), "#102030");
        assert_eq!(to_hex("RGB( 1 ,2,  3 )"), "#010203");
        assert_eq!(to_hex("rgb(999, 0, 300)"), "#ff00ff");
    }

    #[test]
    fn unsupported_syntax_falls_back_to_black() {
        assert_eq!(to_hex("oklch(0.7 0.1 200)"), "#000000");
        assert_eq!(to_hex("lab(50% 40 59.5)"), "#000000");
        assert_eq!(to_hex("rgb(10 20 30)"), "#000000");
        assert_eq!(to_hex("white"), "#000000");
        assert_eq!(to_hex(""), "#000000");
    }

    #[test]
    fn strict_parser_reads_legacy_syntax() {
        assert_eq!(parse_css_color("#f00").unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(parse_css_color("#00ff0080").unwrap().g, 255);
        assert_eq!(parse_css_color("rgb(1, 2, 3)").unwrap(), Rgba::rgb(1, 2, 3));
        assert_eq!(parse_css_color("rgb(100% 0% 0% / 50%)").unwrap().a, 0.5);
        assert_eq!(parse_css_color("Navy").unwrap(), Rgba::rgb(0, 0, 128));
        assert!(parse_css_color("transparent").unwrap().is_transparent());
    }

    #[test]
    fn strict_parser_knows_every_named_colour_and_hsl() {
        assert_eq!(parse_css_color("darkslateblue").unwrap(), Rgba::rgb(72, 61, 139));
        assert_eq!(parse_css_color("LightSlateGray").unwrap(), Rgba::rgb(119, 136, 153));
        assert_eq!(parse_css_color("rebeccapurple").unwrap(), Rgba::rgb(102, 51, 153));
        assert_eq!(parse_css_color("hsl(0, 100%, 50%)").unwrap(), Rgba::rgb(255, 0, 0));
        assert_eq!(parse_css_color("hsla(120, 100%, 25%, 0.5)").unwrap().g, 128);
        assert!(matches!(parse_css_color("beef"), Err(ColorError::Invalid(_))));
    }

    #[test]
    fn strict_parser_rejects_color_functions() {
        assert_eq!(
            parse_css_color("oklch(0.62 0.19 259)"),
            Err(ColorError::UnsupportedFunction("oklch".into()))
        );
        assert_eq!(
            parse_css_color("lab(50% 40 59.5)"),
            Err(ColorError::UnsupportedFunction("lab".into()))
        );
        assert!(matches!(parse_css_color("notacolor"), Err(ColorError::Invalid(_))));
    }

    #[test]
    fn css_serialisation_matches_browser_form() {
        assert_eq!(Rgba::rgb(255, 255, 255).to_css(), "rgb(255, 255, 255)");
        assert_eq!(Rgba::TRANSPARENT.to_css(), "rgba(0, 0, 0, 0)");
        assert_eq!(Rgba { a: 0.5, ..Rgba::BLACK }.to_css(), "rgba(0, 0, 0, 0.5)");
    }
}
