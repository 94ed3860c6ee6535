//! Low-level SVG text helpers: escaping, number formatting, the document
//! preamble and a small start-tag builder.

use std::fmt::Write;

use annosvg_core::document::{DEFAULT_TITLE, Metadata};
use annosvg_core::round_to;

pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Text of the `<desc>` element written into every export.
pub const DESCRIPTION: &str = "Exported by annosvg";

/// Escape element text content: `&`, `<` and `>`.
#[must_use]
pub fn escape_text(input: &str) -> String {
    escape(input, false)
}

/// Escape a double-quoted attribute value.
///
/// Besides `&`, `<` and `"`, line breaks and tabs become character
/// references so attribute-value normalisation cannot turn them into
/// spaces.
#[must_use]
pub fn escape_attr(input: &str) -> String {
    escape(input, true)
}

fn escape(input: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\r' if attribute => out.push_str("&#13;"),
            '\t' if attribute => out.push_str("&#9;"),
            other => out.push(other),
        }
    }
    out
}

/// Format a coordinate or length in its shortest form, to 4 decimals.
///
/// `100.0` prints as `100`, `0.1 + 0.2` as `0.3`.
#[must_use]
pub fn num(value: f64) -> String {
    let rounded = round_to(value, 4);
    // Avoid "-0".
    if rounded == 0.0 {
        return "0".to_owned();
    }
    format!("{rounded}")
}

/// Format an opacity: clamped to `[0, 1]`, 4 decimals, shortest form.
#[must_use]
pub fn opacity(value: f64) -> String {
    num(value.clamp(0.0, 1.0))
}

/// `x,y` pairs with two decimals, space separated, for `points`.
#[must_use]
pub fn points_attr(points: &[annosvg_core::Point]) -> String {
    let mut out = String::with_capacity(points.len() * 14);
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:.2},{:.2}", p.x, p.y);
    }
    out
}

/// An element start tag under construction.
///
/// Attribute values are escaped on insertion.
#[derive(Debug)]
pub struct Tag {
    buf: String,
}

impl Tag {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            buf: format!("<{name}"),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: impl AsRef<str>) -> Self {
        let _ = write!(self.buf, r#" {name}="{}""#, escape_attr(value.as_ref()));
        self
    }

    #[must_use]
    pub fn attr_opt(self, name: &str, value: Option<impl AsRef<str>>) -> Self {
        match value {
            Some(v) => self.attr(name, v),
            None => self,
        }
    }

    /// `<name …/>`
    #[must_use]
    pub fn empty(self) -> String {
        format!("{}/>", self.buf)
    }

    /// `<name …>`
    #[must_use]
    pub fn open(self) -> String {
        format!("{}>", self.buf)
    }

    /// `<name …>content</name>`, with `content` inserted verbatim.
    #[must_use]
    pub fn wrap(self, name: &str, content: &str) -> String {
        format!("{}>{content}</{name}>", self.buf)
    }
}

/// Write the XML declaration, the opening `<svg>` tag, `<title>` and
/// `<desc>`.
pub fn write_svg_preamble(out: &mut String, metadata: &Metadata) {
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);

    let (w, h) = (num(metadata.width), num(metadata.height));
    let _ = writeln!(
        out,
        r#"<svg xmlns="{SVG_NS}" xmlns:xlink="{XLINK_NS}" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
    );

    let title = metadata.title.as_deref().unwrap_or(DEFAULT_TITLE);
    let _ = writeln!(out, "  <title>{}</title>", escape_text(title));
    let _ = writeln!(out, "  <desc>{DESCRIPTION}</desc>");
}

#[cfg(test)]
mod tests {
    use annosvg_core::Point;

    use super::*;

    #[test]
    fn escaping_depends_on_context() {
        assert_eq!(escape_text(r#"<a & "b" 'c'>"#), r#"&lt;a &amp; "b" 'c'&gt;"#);
        assert_eq!(
            escape_attr("<a & \"b\" 'c'>\nd"),
            "&lt;a &amp; &quot;b&quot; 'c'>&#10;d"
        );
    }

    #[test]
    fn numbers_are_short() {
        assert_eq!(num(100.0), "100");
        assert_eq!(num(0.1 + 0.2), "0.3");
        assert_eq!(num(-0.000_01), "0");
        assert_eq!(num(12.5), "12.5");
    }

    #[test]
    fn opacity_rounds_and_clamps() {
        assert_eq!(opacity(0.4), "0.4");
        assert_eq!(opacity(0.123_456), "0.1235");
        assert_eq!(opacity(-1.0), "0");
    }

    #[test]
    fn points_attribute_uses_two_decimals() {
        let pts = [Point::new(1.0, 2.5), Point::new(3.333, 4.0)];
        assert_eq!(points_attr(&pts), "1.00,2.50 3.33,4.00");
    }

    #[test]
    fn tag_builder_escapes_values() {
        let tag = Tag::new("image").attr("href", "a&b").attr_opt("opacity", None::<&str>);
        assert_eq!(tag.empty(), r#"<image href="a&amp;b"/>"#);
    }

    #[test]
    fn preamble_has_title_and_desc() {
        let mut out = String::new();
        write_svg_preamble(&mut out, &Metadata::default());
        assert!(out.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(out.contains(r#"width="1920" height="1080" viewBox="0 0 1920 1080""#));
        assert!(out.contains("<title>Annotation Export</title>"));
        assert!(out.contains("<desc>Exported by annosvg</desc>"));
    }
}
