//! Per-tool element renderers.
//!
//! Each function renders one item as a single SVG element string (no
//! indentation, no trailing newline).  Item composition, masks and groups
//! are handled by [`crate::encode`].

use std::fmt::Write;

use annosvg_core::color::to_svg_color;
use annosvg_core::document::{
    BorderType, Color, DEFAULT_HIGHLIGHTER_OPACITY, Image, ItemCommon, Shape, ShapeType, Stroke,
    TEXT_LINE_HEIGHT, Text,
};
use annosvg_core::geometry::{Point, Rect};
use annosvg_core::shapes::{arrow_outline, named_vertices};

use crate::markup::{Tag, escape_text, num, opacity, points_attr};

pub const DEFAULT_PEN_SIZE: f64 = 2.0;
pub const DEFAULT_HIGHLIGHTER_SIZE: f64 = 20.0;
pub const DEFAULT_STROKE_COLOR: &str = "#000000";
pub const DEFAULT_SHAPE_SIDE: f64 = 100.0;
pub const DEFAULT_BORDER_COLOR: &str = "#000000";
pub const DEFAULT_BORDER_SIZE: f64 = 2.0;
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";
pub const DEFAULT_IMAGE_SIDE: f64 = 100.0;

/// Corner radius of a `roundedRect` as a fraction of its shorter side.
pub const ROUNDED_RECT_RADIUS: f64 = 0.125;

/// `opacity` attribute value, omitted at full opacity.
fn opacity_attr(common: &ItemCommon) -> Option<String> {
    common.opacity.filter(|o| *o < 1.0).map(opacity)
}

/// `rotate(r cx cy)` about `center`, omitted when there is no rotation.
pub fn rotation_attr(common: &ItemCommon, center: Point) -> Option<String> {
    (common.rotation != 0.0).then(|| {
        format!(
            "rotate({} {} {})",
            num(common.rotation),
            num(center.x),
            num(center.y)
        )
    })
}

/// `M x y L x y …` with two decimals per coordinate.
fn stroke_path_data(points: &[Point]) -> String {
    let mut d = String::with_capacity(points.len() * 16);
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        let _ = write!(d, "{cmd} {:.2} {:.2}", p.x, p.y);
    }
    // A dot still needs a segment to paint its caps.
    if let [only] = points {
        let _ = write!(d, " L {:.2} {:.2}", only.x, only.y);
    }
    d
}

/// Render a pen or highlighter stroke as `<path>`.
///
/// Returns `None` for a stroke without points.  Highlighters always carry
/// an `opacity` attribute, defaulting to 0.4.
#[must_use]
pub fn stroke(stroke: &Stroke, highlighter: bool) -> Option<String> {
    if stroke.pts.is_empty() {
        return None;
    }
    let default_size = if highlighter {
        DEFAULT_HIGHLIGHTER_SIZE
    } else {
        DEFAULT_PEN_SIZE
    };
    let color = stroke
        .color
        .as_ref()
        .map_or_else(|| DEFAULT_STROKE_COLOR.to_owned(), Color::to_svg);
    let item_opacity = if highlighter {
        let o = stroke.common.opacity.unwrap_or(DEFAULT_HIGHLIGHTER_OPACITY);
        (o < 1.0).then(|| opacity(o))
    } else {
        opacity_attr(&stroke.common)
    };
    let center = stroke.bounds().map(|b| b.center()).unwrap_or_default();

    Some(
        Tag::new("path")
            .attr("d", stroke_path_data(&stroke.pts))
            .attr("stroke", color)
            .attr("stroke-width", num(stroke.size.unwrap_or(default_size)))
            .attr("fill", "none")
            .attr(
                "stroke-linecap",
                stroke.line_cap.map_or("round", |c| c.as_str()),
            )
            .attr(
                "stroke-linejoin",
                stroke.line_join.map_or("round", |j| j.as_str()),
            )
            .attr_opt("opacity", item_opacity)
            .attr_opt("transform", rotation_attr(&stroke.common, center))
            .empty(),
    )
}

/// A paint value with an item-level opacity folded in.
///
/// Colours the codec can parse get the opacity multiplied into their
/// alpha channel.  Unparseable CSS is passed through and the opacity is
/// returned separately for a `*-opacity` attribute.
fn fold_paint(color: &Color, paint_opacity: Option<f64>) -> (String, Option<String>) {
    match paint_opacity.filter(|o| *o < 1.0) {
        None => (color.to_svg(), None),
        Some(o) => match color.to_rgba() {
            Some(rgba) => (to_svg_color(rgba.with_alpha_scaled(o)), None),
            None => (color.to_svg(), Some(opacity(o))),
        },
    }
}

fn is_no_paint(color: &Color) -> bool {
    matches!(color, Color::Css(css) if css.trim().eq_ignore_ascii_case("none")
        || css.trim().eq_ignore_ascii_case("transparent"))
}

/// Resolved bounding box of a shape, defaulting missing sides.
#[must_use]
pub fn shape_bounds(shape: &Shape) -> Rect {
    Rect::new(
        shape.x,
        shape.y,
        shape.width.unwrap_or(DEFAULT_SHAPE_SIDE),
        shape.height.unwrap_or(DEFAULT_SHAPE_SIDE),
    )
}

/// Render a shape.
#[must_use]
pub fn shape(shape: &Shape) -> String {
    let rect = shape_bounds(shape);
    let center = rect.center();
    let border_size = shape.border_size.unwrap_or(DEFAULT_BORDER_SIZE);

    let (fill, fill_opacity) = match shape.fill_color.as_ref().filter(|c| !is_no_paint(c)) {
        Some(color) => fold_paint(color, shape.fill_opacity),
        None => ("none".to_owned(), None),
    };
    let default_border = Color::from(DEFAULT_BORDER_COLOR);
    let (border, border_opacity) = fold_paint(
        shape.border_color.as_ref().unwrap_or(&default_border),
        shape.border_opacity,
    );
    let dash = match shape.border_type {
        Some(BorderType::Dashed) => Some(format!(
            "{},{}",
            num(border_size * 4.0),
            num(border_size * 2.0)
        )),
        Some(BorderType::Dotted) => Some(format!(
            "{},{}",
            num(border_size),
            num(border_size * 2.0)
        )),
        Some(BorderType::Solid) | None => None,
    };

    let body = shape_body(shape, &rect);
    let mut tag = body.tag().attr("stroke", &border);
    // Lines have no interior.
    if !matches!(body, ShapeBody::Line(_)) {
        tag = tag
            .attr("fill", &fill)
            .attr_opt("fill-opacity", fill_opacity);
    }

    tag.attr("stroke-width", num(border_size))
        .attr_opt("stroke-opacity", border_opacity)
        .attr_opt("stroke-dasharray", dash)
        .attr_opt("opacity", opacity_attr(&shape.common))
        .attr_opt("transform", rotation_attr(&shape.common, center))
        .empty()
}

/// Geometry part of a shape element, before paint attributes.
enum ShapeBody {
    Rect { rect: Rect, corner: Option<f64> },
    Ellipse(Rect),
    Circle(Rect),
    Polygon(Vec<Point>),
    Polyline(Vec<Point>),
    Path { d: String, even_odd: bool },
    Line(Rect),
}

impl ShapeBody {
    fn tag(&self) -> Tag {
        match self {
            Self::Rect { rect, corner } => Tag::new("rect")
                .attr("x", num(rect.x))
                .attr("y", num(rect.y))
                .attr("width", num(rect.width))
                .attr("height", num(rect.height))
                .attr_opt("rx", corner.map(num)),
            Self::Ellipse(rect) => {
                let c = rect.center();
                Tag::new("ellipse")
                    .attr("cx", num(c.x))
                    .attr("cy", num(c.y))
                    .attr("rx", num(rect.width / 2.0))
                    .attr("ry", num(rect.height / 2.0))
            }
            Self::Circle(rect) => {
                let c = rect.center();
                Tag::new("circle")
                    .attr("cx", num(c.x))
                    .attr("cy", num(c.y))
                    .attr("r", num(rect.width / 2.0))
            }
            Self::Polygon(points) => Tag::new("polygon").attr("points", points_attr(points)),
            Self::Polyline(points) => Tag::new("polyline").attr("points", points_attr(points)),
            Self::Path { d, even_odd } => {
                let tag = Tag::new("path").attr("d", d);
                if *even_odd {
                    tag.attr("fill-rule", "evenodd")
                } else {
                    tag
                }
            }
            Self::Line(rect) => Tag::new("line")
                .attr("x1", num(rect.x))
                .attr("y1", num(rect.y))
                .attr("x2", num(rect.x + rect.width))
                .attr("y2", num(rect.y + rect.height)),
        }
    }
}

fn shape_body(shape: &Shape, rect: &Rect) -> ShapeBody {
    let plain_rect = ShapeBody::Rect {
        rect: *rect,
        corner: None,
    };
    match shape.shape_type {
        ShapeType::Rectangle | ShapeType::Unknown => plain_rect,
        ShapeType::RoundedRect => ShapeBody::Rect {
            rect: *rect,
            corner: Some(rect.width.min(rect.height) * ROUNDED_RECT_RADIUS),
        },
        ShapeType::Ellipse => ShapeBody::Ellipse(*rect),
        ShapeType::Circle if rect.width == rect.height => ShapeBody::Circle(*rect),
        ShapeType::Circle => ShapeBody::Ellipse(*rect),
        ShapeType::Arrow => ShapeBody::Path {
            d: closed_ring_data(&arrow_outline(rect)),
            even_odd: false,
        },
        ShapeType::Line => ShapeBody::Line(*rect),
        ShapeType::Polygon => {
            let outer = denormalized(rect, shape.pts.as_deref().unwrap_or_default());
            if outer.len() < 3 {
                return plain_rect;
            }
            match shape.contours.as_deref() {
                Some(contours) if !contours.is_empty() => {
                    let mut d = closed_ring_data(&outer);
                    for contour in contours.iter().filter(|c| c.len() >= 3) {
                        d.push(' ');
                        d.push_str(&closed_ring_data(&denormalized(rect, contour)));
                    }
                    ShapeBody::Path { d, even_odd: true }
                }
                _ => ShapeBody::Polygon(outer),
            }
        }
        ShapeType::Polyline => {
            let points = denormalized(rect, shape.pts.as_deref().unwrap_or_default());
            if points.len() < 2 {
                return plain_rect;
            }
            ShapeBody::Polyline(points)
        }
        named => named_vertices(named, rect).map_or(plain_rect, ShapeBody::Polygon),
    }
}

fn denormalized(rect: &Rect, points: &[Point]) -> Vec<Point> {
    points.iter().map(|p| rect.denormalize(*p)).collect()
}

/// `M x y L … Z` for a closed ring.
fn closed_ring_data(points: &[Point]) -> String {
    let mut d = String::new();
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { "M" } else { " L" };
        let _ = write!(d, "{cmd} {} {}", num(p.x), num(p.y));
    }
    d.push_str(" Z");
    d
}

/// Render a text item.
///
/// Imported text with `svgData` is reproduced verbatim; otherwise each
/// line becomes a `<tspan>` advancing by 1.2 × the font size.  Returns
/// `None` for text with neither content nor passthrough.
#[must_use]
pub fn text(text: &Text) -> Option<String> {
    let center = text.bounds().center();
    if let Some(data) = &text.svg_data {
        let transform = match (rotation_attr(&text.common, center), &data.transform) {
            (Some(rotation), Some(own)) => Some(format!("{rotation} {own}")),
            (rotation, own) => rotation.or_else(|| own.clone()),
        };
        return Some(
            Tag::new("text")
                .attr_opt("xml:space", data.xml_space.as_deref())
                .attr_opt("x", data.x.as_deref())
                .attr_opt("y", data.y.as_deref())
                .attr_opt("transform", transform)
                .attr_opt("font-size", data.font_size.as_deref())
                .attr_opt("font-family", data.font_family.as_deref())
                .attr_opt("fill", data.fill.as_deref())
                .attr_opt("opacity", opacity_attr(&text.common))
                .wrap("text", &data.inner_content),
        );
    }

    if text.text.is_empty() {
        return None;
    }
    let size = text.font_size();
    let color = text
        .color
        .as_ref()
        .map_or_else(|| DEFAULT_STROKE_COLOR.to_owned(), Color::to_svg);

    let lines: Vec<&str> = text.text.split('\n').collect();
    let content = if let [only] = lines.as_slice() {
        escape_text(only)
    } else {
        let mut content = String::new();
        for (i, line) in lines.iter().enumerate() {
            if i == 0 {
                let _ = write!(content, "<tspan>{}</tspan>", escape_text(line));
            } else {
                let _ = write!(
                    content,
                    r#"<tspan x="{}" dy="{}">{}</tspan>"#,
                    num(text.x),
                    num(size * TEXT_LINE_HEIGHT),
                    escape_text(line)
                );
            }
        }
        content
    };

    Some(
        Tag::new("text")
            .attr("x", num(text.x))
            .attr("y", num(text.y + size))
            .attr("font-size", num(size))
            .attr(
                "font-family",
                text.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY),
            )
            .attr("fill", color)
            .attr_opt("opacity", opacity_attr(&text.common))
            .attr_opt("transform", rotation_attr(&text.common, center))
            .wrap("text", &content),
    )
}

/// Resolved placement of an image, defaulting missing sides.
#[must_use]
pub fn image_bounds(image: &Image) -> Rect {
    Rect::new(
        image.x,
        image.y,
        image.w.unwrap_or(DEFAULT_IMAGE_SIDE),
        image.h.unwrap_or(DEFAULT_IMAGE_SIDE),
    )
}

/// Render an image as `<image>` (without any mask wrapper).
#[must_use]
pub fn image(image: &Image) -> String {
    let rect = image_bounds(image);
    Tag::new("image")
        .attr("x", num(rect.x))
        .attr("y", num(rect.y))
        .attr("width", num(rect.width))
        .attr("height", num(rect.height))
        .attr("href", &image.src)
        .attr_opt("opacity", opacity_attr(&image.common))
        .attr_opt("transform", rotation_attr(&image.common, rect.center()))
        .empty()
}

/// The `<image>` placed inside a `<mask>` definition for `image`.
#[must_use]
pub fn mask_image(image: &Image, mask_src: &str) -> String {
    let rect = image_bounds(image);
    Tag::new("image")
        .attr("x", num(rect.x))
        .attr("y", num(rect.y))
        .attr("width", num(rect.width))
        .attr("height", num(rect.height))
        .attr("href", mask_src)
        .attr_opt("transform", rotation_attr(&image.common, rect.center()))
        .empty()
}
