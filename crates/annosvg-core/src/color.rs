//! CSS colour parsing and formatting.
//!
//! Colours in annotation documents are either CSS strings, kept verbatim,
//! or `{r, g, b, a}` objects.  SVG attributes may also carry any CSS colour
//! syntax.  [`parse_color`] normalises both directions to [`Rgba`].

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// An sRGB colour with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    /// Alpha in `[0, 1]`.
    #[serde(default = "opaque")]
    pub a: f64,
}

const fn opaque() -> f64 {
    1.0
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0.0);

    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 1.0);

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// The same colour with alpha set to 1.
    #[must_use]
    pub const fn opaque(self) -> Self {
        Self::new(self.r, self.g, self.b, 1.0)
    }

    /// Returns `true` if alpha is below 1.
    #[must_use]
    pub fn is_translucent(&self) -> bool {
        self.a < 1.0
    }

    /// Scale alpha by `factor`, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_alpha_scaled(self, factor: f64) -> Self {
        Self::new(self.r, self.g, self.b, (self.a * factor).clamp(0.0, 1.0))
    }
}

/// Parse a CSS colour.
///
/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`
/// (integer or percentage channels), `hsl()`, `hsla()`, the CSS named
/// colours, `currentColor`
/// (treated as black) and `transparent`.  Returns `None` for `none` and
/// for anything unrecognised.
///
/// ```
/// use annosvg_core::color::{Rgba, parse_color};
///
/// assert_eq!(parse_color("#f00"), Some(Rgba::new(255, 0, 0, 1.0)));
/// assert_eq!(parse_color("rgba(0, 0, 255, 0.5)"), Some(Rgba::new(0, 0, 255, 0.5)));
/// assert_eq!(parse_color("none"), None);
/// ```
#[must_use]
pub fn parse_color(value: &str) -> Option<Rgba> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    if value.eq_ignore_ascii_case("transparent") {
        return Some(Rgba::TRANSPARENT);
    }
    if value.eq_ignore_ascii_case("currentColor") {
        return Some(Rgba::BLACK);
    }
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = value.to_ascii_lowercase();
    if let Some(args) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_function(args);
    }
    if let Some(args) = lower
        .strip_prefix("hsla(")
        .or_else(|| lower.strip_prefix("hsl("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_hsl_function(args);
    }
    named_color(&lower).map(|(r, g, b)| Rgba::new(r, g, b, 1.0))
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.is_ascii() {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::new(nibble(0)?, nibble(1)?, nibble(2)?, 1.0)),
        4 => Some(Rgba::new(
            nibble(0)?,
            nibble(1)?,
            nibble(2)?,
            f64::from(nibble(3)?) / 255.0,
        )),
        6 => Some(Rgba::new(byte(0)?, byte(2)?, byte(4)?, 1.0)),
        8 => Some(Rgba::new(
            byte(0)?,
            byte(2)?,
            byte(4)?,
            f64::from(byte(6)?) / 255.0,
        )),
        _ => None,
    }
}

/// Comma, slash or space separated function arguments.
fn function_args(args: &str) -> Vec<&str> {
    args.split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_rgb_function(args: &str) -> Option<Rgba> {
    let parts = function_args(args);
    let (channels, alpha) = match parts.as_slice() {
        [r, g, b] => ([*r, *g, *b], None),
        [r, g, b, a] => ([*r, *g, *b], Some(*a)),
        _ => return None,
    };
    let [r, g, b] = channels;
    let a = match alpha {
        Some(a) => parse_alpha(a)?,
        None => 1.0,
    };
    Some(Rgba::new(channel(r)?, channel(g)?, channel(b)?, a))
}

/// `hsl()`/`hsla()`: hue in degrees (optional `deg`), saturation and
/// lightness as percentages.
fn parse_hsl_function(args: &str) -> Option<Rgba> {
    let parts = function_args(args);
    let (h, s, l, alpha) = match parts.as_slice() {
        [h, s, l] => (*h, *s, *l, None),
        [h, s, l, a] => (*h, *s, *l, Some(*a)),
        _ => return None,
    };
    let hue = h.strip_suffix("deg").unwrap_or(h).parse::<f64>().ok()?;
    let fraction = |token: &str| {
        let value = token.strip_suffix('%').unwrap_or(token).parse::<f64>().ok()?;
        Some((value / 100.0).clamp(0.0, 1.0))
    };
    let (s, l) = (fraction(s)?, fraction(l)?);
    let a = match alpha {
        Some(a) => parse_alpha(a)?,
        None => 1.0,
    };

    let h = hue.rem_euclid(360.0) / 360.0;
    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l.mul_add(-s, l + s)
    };
    let p = 2.0f64.mul_add(l, -q);
    let channel = |t: f64| unit_to_byte(hue_to_rgb(p, q, t));
    Some(Rgba::new(
        channel(h + 1.0 / 3.0),
        channel(h),
        channel(h - 1.0 / 3.0),
        a,
    ))
}

fn hue_to_rgb(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        ((q - p) * 6.0).mul_add(t, p)
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        ((q - p) * 6.0).mul_add(2.0 / 3.0 - t, p)
    } else {
        p
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn unit_to_byte(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(token: &str) -> Option<u8> {
    let value = if let Some(pct) = token.strip_suffix('%') {
        pct.parse::<f64>().ok()? * 255.0 / 100.0
    } else {
        token.parse::<f64>().ok()?
    };
    Some(value.round().clamp(0.0, 255.0) as u8)
}

fn parse_alpha(token: &str) -> Option<f64> {
    let value = if let Some(pct) = token.strip_suffix('%') {
        pct.parse::<f64>().ok()? / 100.0
    } else {
        token.parse::<f64>().ok()?
    };
    Some(value.clamp(0.0, 1.0))
}

/// Format a colour for an SVG paint attribute.
///
/// Emits `rgb(r, g, b)`, or `rgba(r, g, b, a)` when alpha is below 1.
#[must_use]
pub fn to_svg_color(color: Rgba) -> String {
    if color.is_translucent() {
        format!(
            "rgba({}, {}, {}, {})",
            color.r,
            color.g,
            color.b,
            crate::round_to(color.a, 4)
        )
    } else {
        format!("rgb({}, {}, {})", color.r, color.g, color.b)
    }
}

/// Format the opaque part of a colour as `#rrggbb`.
#[must_use]
pub fn to_hex(color: Rgba) -> String {
    let mut out = String::with_capacity(7);
    out.push('#');
    for channel in [color.r, color.g, color.b] {
        let _ = write!(out, "{channel:02x}");
    }
    out
}

/// CSS named colours.
fn named_color(name: &str) -> Option<(u8, u8, u8)> {
    let rgb = match name {
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "lime" => (0, 255, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "cyan" | "aqua" => (0, 255, 255),
        "magenta" | "fuchsia" => (255, 0, 255),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        "silver" => (192, 192, 192),
        "maroon" => (128, 0, 0),
        "olive" => (128, 128, 0),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        "pink" => (255, 192, 203),
        "brown" => (165, 42, 42),
        "gold" => (255, 215, 0),
        "indigo" => (75, 0, 130),
        "violet" => (238, 130, 238),
        "coral" => (255, 127, 80),
        "salmon" => (250, 128, 114),
        "tomato" => (255, 99, 71),
        "crimson" => (220, 20, 60),
        "orchid" => (218, 112, 214),
        "khaki" => (240, 230, 140),
        "beige" => (245, 245, 220),
        "ivory" => (255, 255, 240),
        "lavender" => (230, 230, 250),
        "turquoise" => (64, 224, 208),
        "tan" => (210, 180, 140),
        "chocolate" => (210, 105, 30),
        "darkgray" | "darkgrey" => (169, 169, 169),
        "lightgray" | "lightgrey" => (211, 211, 211),
        "dimgray" | "dimgrey" => (105, 105, 105),
        "darkred" => (139, 0, 0),
        "darkgreen" => (0, 100, 0),
        "darkblue" => (0, 0, 139),
        "darkorange" => (255, 140, 0),
        "lightblue" => (173, 216, 230),
        "lightgreen" => (144, 238, 144),
        "lightyellow" => (255, 255, 224),
        "skyblue" => (135, 206, 235),
        "steelblue" => (70, 130, 180),
        "royalblue" => (65, 105, 225),
        "hotpink" => (255, 105, 180),
        "deeppink" => (255, 20, 147),
        "limegreen" => (50, 205, 50),
        "forestgreen" => (34, 139, 34),
        "seagreen" => (46, 139, 87),
        "slategray" | "slategrey" => (112, 128, 144),
        "whitesmoke" => (245, 245, 245),
        "gainsboro" => (220, 220, 220),
        _ => return None,
    };
    Some(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_hex() {
        assert_eq!(parse_color("#0f8"), Some(Rgba::new(0, 255, 136, 1.0)));
        assert_eq!(parse_color("#00ff88"), Some(Rgba::new(0, 255, 136, 1.0)));
    }

    #[test]
    fn hex_with_alpha() {
        let c = parse_color("#ff000080").unwrap_or(Rgba::BLACK);
        assert_eq!((c.r, c.g, c.b), (255, 0, 0));
        assert!((c.a - 128.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn rgb_and_rgba_functions() {
        assert_eq!(parse_color("rgb(1, 2, 3)"), Some(Rgba::new(1, 2, 3, 1.0)));
        assert_eq!(parse_color("RGBA(1,2,3,0.25)"), Some(Rgba::new(1, 2, 3, 0.25)));
        assert_eq!(parse_color("rgb(100%, 0%, 50%)"), Some(Rgba::new(255, 0, 128, 1.0)));
        assert_eq!(parse_color("rgb(0 0 0 / 50%)"), Some(Rgba::new(0, 0, 0, 0.5)));
    }

    #[test]
    fn hsl_and_hsla_functions() {
        assert_eq!(parse_color("hsl(0, 100%, 50%)"), Some(Rgba::new(255, 0, 0, 1.0)));
        assert_eq!(parse_color("hsl(120deg 100% 25%)"), Some(Rgba::new(0, 128, 0, 1.0)));
        assert_eq!(
            parse_color("HSLA(240, 100%, 50%, 0.5)"),
            Some(Rgba::new(0, 0, 255, 0.5))
        );
        assert_eq!(parse_color("hsl(-120, 100%, 50%)"), Some(Rgba::new(0, 0, 255, 1.0)));
        assert_eq!(parse_color("hsl(0, 0%, 100%)"), Some(Rgba::new(255, 255, 255, 1.0)));
        assert_eq!(parse_color("hsl(0, 100%)"), None);
    }

    #[test]
    fn named_and_keywords() {
        assert_eq!(parse_color("Orange"), Some(Rgba::new(255, 165, 0, 1.0)));
        assert_eq!(parse_color("currentColor"), Some(Rgba::BLACK));
        assert_eq!(parse_color("transparent"), Some(Rgba::TRANSPARENT));
        assert_eq!(parse_color("none"), None);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(parse_color("#12"), None);
        assert_eq!(parse_color("#zzzzzz"), None);
        assert_eq!(parse_color("url(#grad)"), None);
        assert_eq!(parse_color("rgb(1, 2)"), None);
    }

    #[test]
    fn svg_formatting_switches_on_alpha() {
        assert_eq!(to_svg_color(Rgba::new(10, 20, 30, 1.0)), "rgb(10, 20, 30)");
        assert_eq!(to_svg_color(Rgba::new(10, 20, 30, 0.5)), "rgba(10, 20, 30, 0.5)");
    }

    #[test]
    fn formatting_inverts_parsing() {
        for c in [Rgba::new(12, 34, 56, 1.0), Rgba::new(200, 0, 7, 0.3)] {
            assert_eq!(parse_color(&to_svg_color(c)), Some(c));
        }
    }

    #[test]
    fn hex_formatting_drops_alpha() {
        assert_eq!(to_hex(Rgba::new(255, 0, 136, 0.2)), "#ff0088");
    }
}
