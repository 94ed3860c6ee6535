//! Presentation properties.
//!
//! Each element's [`Style`] is its parent's style with the element's own
//! presentation attributes applied, then its `style` declarations.  Values
//! stay as text until a converter asks for them, so a property that never
//! matters is never parsed.

use annosvg_core::color::{Rgba, parse_color, to_hex};
use annosvg_core::document::{BorderType, Color};
use roxmltree::Node;

/// Default `stroke-width` when neither the element nor an ancestor sets one.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

/// Colour used for paints that name something other than a colour, such as
/// `url(#gradient)`.
pub const FALLBACK_COLOR: &str = "#000000";

/// Cascaded presentation properties of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Style {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<String>,
    pub fill_opacity: Option<String>,
    pub stroke_opacity: Option<String>,
    pub stroke_dasharray: Option<String>,
    pub stroke_linecap: Option<String>,
    pub stroke_linejoin: Option<String>,
    pub font_size: Option<String>,
    pub font_family: Option<String>,
    /// The element's own `opacity`.  Not inherited: group opacity is
    /// multiplied in by the walker instead.
    pub opacity: Option<String>,
    pub mask_type: Option<String>,
}

impl Style {
    /// The style of `node`, inheriting from `self`.
    #[must_use]
    pub fn cascade(&self, node: Node<'_, '_>) -> Self {
        let mut style = Self {
            opacity: None,
            mask_type: None,
            ..self.clone()
        };
        for attr in node.attributes().filter(|a| a.namespace().is_none()) {
            style.set(attr.name(), attr.value());
        }
        if let Some(declarations) = node.attribute("style") {
            for (name, value) in parse_declarations(declarations) {
                style.set(name, value);
            }
        }
        style
    }

    fn set(&mut self, name: &str, value: &str) {
        let slot = match name {
            "fill" => &mut self.fill,
            "stroke" => &mut self.stroke,
            "stroke-width" => &mut self.stroke_width,
            "fill-opacity" => &mut self.fill_opacity,
            "stroke-opacity" => &mut self.stroke_opacity,
            "stroke-dasharray" => &mut self.stroke_dasharray,
            "stroke-linecap" => &mut self.stroke_linecap,
            "stroke-linejoin" => &mut self.stroke_linejoin,
            "font-size" => &mut self.font_size,
            "font-family" => &mut self.font_family,
            "opacity" => &mut self.opacity,
            "mask-type" => &mut self.mask_type,
            _ => return,
        };
        let value = value.trim();
        if value.is_empty() || value == "inherit" {
            return;
        }
        *slot = Some(value.to_owned());
    }

    /// Resolved fill paint.
    #[must_use]
    pub fn fill_paint(&self) -> Paint {
        Paint::parse(self.fill.as_deref())
    }

    /// Resolved stroke paint.
    #[must_use]
    pub fn stroke_paint(&self) -> Paint {
        Paint::parse(self.stroke.as_deref())
    }

    /// `stroke-width` in local units, defaulting to
    /// [`DEFAULT_STROKE_WIDTH`].
    #[must_use]
    pub fn stroke_width(&self) -> f64 {
        self.stroke_width
            .as_deref()
            .and_then(parse_length)
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_STROKE_WIDTH)
    }

    /// Effective fill alpha: paint alpha times `fill-opacity`.
    #[must_use]
    pub fn fill_alpha(&self) -> f64 {
        self.fill_paint().alpha() * parse_opacity(self.fill_opacity.as_deref())
    }

    /// Effective stroke alpha: paint alpha times `stroke-opacity`.
    #[must_use]
    pub fn stroke_alpha(&self) -> f64 {
        self.stroke_paint().alpha() * parse_opacity(self.stroke_opacity.as_deref())
    }

    #[must_use]
    pub fn own_opacity(&self) -> f64 {
        parse_opacity(self.opacity.as_deref())
    }

    #[must_use]
    pub fn border_type(&self) -> Option<BorderType> {
        border_type(self.stroke_dasharray.as_deref())
    }
}

/// `name: value; …` pairs of a `style` attribute, `!important` stripped.
pub fn parse_declarations(input: &str) -> impl Iterator<Item = (&str, &str)> {
    input.split(';').filter_map(|declaration| {
        let (name, value) = declaration.split_once(':')?;
        let value = value.trim();
        let value = value.strip_suffix("!important").map_or(value, str::trim_end);
        Some((name.trim(), value))
    })
}

/// A resolved `fill` or `stroke`.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    /// Unset, `none`, or fully transparent.
    Absent,
    /// A visible paint.  Translucent colours are split into an opaque
    /// colour and `alpha`.
    Solid { color: Color, alpha: f64 },
}

impl Paint {
    /// Resolve a paint value.
    ///
    /// Opaque colours keep their CSS text.  `currentColor` and paint
    /// servers such as `url(#g)` resolve to [`FALLBACK_COLOR`].
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim) else {
            return Self::Absent;
        };
        if value.is_empty() || value.eq_ignore_ascii_case("none") {
            return Self::Absent;
        }
        if value.eq_ignore_ascii_case("currentcolor") {
            return Self::solid(FALLBACK_COLOR, 1.0);
        }
        match parse_color(value) {
            Some(rgba) if rgba.a <= 0.0 => Self::Absent,
            Some(rgba) if rgba.is_translucent() => Self::Solid {
                color: Color::Css(to_hex(rgba)),
                alpha: rgba.a,
            },
            Some(_) => Self::solid(value, 1.0),
            None => Self::solid(FALLBACK_COLOR, 1.0),
        }
    }

    fn solid(css: &str, alpha: f64) -> Self {
        Self::Solid {
            color: Color::from(css),
            alpha,
        }
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        matches!(self, Self::Solid { .. })
    }

    /// Alpha of the paint; `0` for no paint.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        match self {
            Self::Absent => 0.0,
            Self::Solid { alpha, .. } => *alpha,
        }
    }

    #[must_use]
    pub fn color(&self) -> Option<Color> {
        match self {
            Self::Absent => None,
            Self::Solid { color, .. } => Some(color.clone()),
        }
    }

    /// The paint as a single colour, a translucent one as channels with
    /// its alpha.
    #[must_use]
    pub fn color_with_alpha(&self) -> Option<Color> {
        match self {
            Self::Absent => None,
            Self::Solid { color, alpha } if *alpha < 1.0 => Some(
                color
                    .to_rgba()
                    .map_or_else(|| color.clone(), |c| Color::Rgba(Rgba::new(c.r, c.g, c.b, *alpha))),
            ),
            Self::Solid { color, .. } => Some(color.clone()),
        }
    }
}

/// Parse an opacity: a number or percentage clamped to `[0, 1]`, `1` when
/// absent or malformed.
#[must_use]
pub fn parse_opacity(value: Option<&str>) -> f64 {
    let Some(value) = value.map(str::trim) else {
        return 1.0;
    };
    let parsed = match value.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().ok().map(|p| p / 100.0),
        None => value.parse::<f64>().ok(),
    };
    parsed
        .filter(|o| o.is_finite())
        .map_or(1.0, |o| o.clamp(0.0, 1.0))
}

/// Parse a length, ignoring any unit suffix (`12px`, `3.5pt`, `50%`).
#[must_use]
pub fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let end = value
        .find(|c: char| (c.is_ascii_alphabetic() && c != 'e' && c != 'E') || c == '%')
        .unwrap_or(value.len());
    let number = value[..end].trim();
    // "1em": the `e` belongs to the unit.
    let number = number.strip_suffix(['e', 'E']).unwrap_or(number);
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Every number in a list such as `points` or `stroke-dasharray`.
///
/// Separators may be whitespace, commas, or nothing at all before a sign
/// (`10-5` is two numbers).
#[must_use]
pub fn parse_numbers(input: &str) -> Vec<f64> {
    let bytes = input.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        let digits_start = i;
        let mut seen_dot = false;
        while i < bytes.len() && (bytes[i].is_ascii_digit() || (bytes[i] == b'.' && !seen_dot)) {
            seen_dot |= bytes[i] == b'.';
            i += 1;
        }
        if i == digits_start || &input[digits_start..i] == "." {
            i = start + 1;
            continue;
        }
        if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
            let mut j = i + 1;
            if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
                j += 1;
            }
            if j < bytes.len() && bytes[j].is_ascii_digit() {
                while j < bytes.len() && bytes[j].is_ascii_digit() {
                    j += 1;
                }
                i = j;
            }
        }
        if let Ok(n) = input[start..i].parse::<f64>() {
            out.push(n);
        }
    }
    out
}

/// Border style implied by a `stroke-dasharray`.
///
/// A gap longer than the dash reads as dotted, anything else as dashed.
/// `none` and all-zero arrays are solid (`None`).
#[must_use]
pub fn border_type(dasharray: Option<&str>) -> Option<BorderType> {
    let value = dasharray?.trim();
    if value.eq_ignore_ascii_case("none") {
        return None;
    }
    let parts = parse_numbers(value);
    if parts.iter().all(|p| *p <= 0.0) {
        return None;
    }
    match parts.as_slice() {
        [dash, gap, ..] if *dash > 0.0 && gap / dash > 1.0 => Some(BorderType::Dotted),
        _ => Some(BorderType::Dashed),
    }
}

/// Id inside `url(#id)`.
#[must_use]
pub fn url_id(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix("url(")?.strip_suffix(')')?;
    let inner = inner.trim().trim_matches(['"', '\'']);
    inner.strip_prefix('#').filter(|id| !id.is_empty())
}
