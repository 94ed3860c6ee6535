//! Drawable element → document item.
//!
//! Geometry is baked into absolute document coordinates.  A failure on one
//! element becomes a [`ConversionWarning`] and conversion carries on.

use std::collections::HashMap;

use annosvg_core::document::{
    Color, DEFAULT_FONT_SIZE, Image, ImageMask, ItemCommon, LineCap, LineJoin, Shape, ShapeType,
    Stroke, TEXT_CHAR_ADVANCE, TEXT_LINE_HEIGHT, Text, TextSvgData,
};
use annosvg_core::path::{PathError, Subpath, parse_path_d};
use annosvg_core::shapes::{match_outline, open_ring};
use annosvg_core::simplify::simplify_path;
use annosvg_core::{CodecConfig, ConversionWarning, Item, Matrix, Point, Rect, round_to};
use roxmltree::Node;
use tracing::debug;

use crate::pair::Unit;
use crate::place::{Placement, place, place_outline};
use crate::style::{FALLBACK_COLOR, Style, parse_length, parse_numbers, parse_opacity};
use crate::walk::{Drawable, Kind, MaskDef, href};
use crate::warning;

/// Fill alpha below which a paired fill counts as invisible.
const VISIBLE_FILL_ALPHA: f64 = 0.01;

/// Stroke alpha from which a paired border counts as solid.
const SOLID_STROKE_ALPHA: f64 = 0.99;

/// Images within this fraction of the canvas origin and size are
/// backgrounds.
const BACKGROUND_TOLERANCE: f64 = 0.05;

#[derive(Debug, thiserror::Error)]
enum ElementError {
    #[error(transparent)]
    Path(PathError),

    #[error("missing or empty `{0}` attribute")]
    MissingAttribute(&'static str),

    #[error("zero-size image skipped")]
    ZeroSizeImage,

    #[error("needs at least {0} points")]
    TooFewPoints(usize),
}

type Converted = Result<Vec<Item>, ElementError>;

/// Colour, opacity and width for stroke items.
struct StrokePaint {
    color: Option<Color>,
    opacity: f64,
    width: f64,
}

/// Converts units in document order, numbering items as they are emitted.
pub struct Converter<'c> {
    config: &'c CodecConfig,
    masks: &'c HashMap<String, MaskDef>,
    items: Vec<Item>,
    warnings: Vec<ConversionWarning>,
}

impl<'c> Converter<'c> {
    #[must_use]
    pub const fn new(config: &'c CodecConfig, masks: &'c HashMap<String, MaskDef>) -> Self {
        Self {
            config,
            masks,
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// The converted items and the warnings raised along the way.
    #[must_use]
    pub fn finish(self) -> (Vec<Item>, Vec<ConversionWarning>) {
        (self.items, self.warnings)
    }

    pub fn unit(&mut self, unit: &Unit<'_, '_>) {
        let (drawable, result) = match unit {
            Unit::Single(d) => (d, self.single(d)),
            Unit::Pair { fill, stroke } => (fill, self.pair(fill, stroke)),
        };
        match result {
            Ok(items) if items.is_empty() => {
                debug!(tag = drawable.tag(), "element produced no item");
            }
            Ok(items) => {
                for item in items {
                    self.push(item);
                }
            }
            Err(e) => self.warnings.push(warning(drawable.tag(), e.to_string())),
        }
    }

    fn push(&mut self, mut item: Item) {
        let id = format!("svg-{}", self.items.len() + 1);
        debug!(%id, tool = item.tool(), "decoded item");
        if let Some(common) = item.common_mut() {
            common.id = id;
        }
        self.items.push(item);
    }

    fn single(&mut self, d: &Drawable<'_, '_>) -> Converted {
        match d.kind {
            Kind::Path => self.path(d),
            Kind::Rect => Ok(rect(d)),
            Kind::Circle => Ok(circle(d)),
            Kind::Ellipse => Ok(ellipse(d)),
            Kind::Line => Ok(line(d)),
            Kind::Polyline => polyline(d),
            Kind::Polygon => polygon(d),
            Kind::Text => Ok(text(d)),
            Kind::Image => self.image(d),
        }
    }

    fn subpaths(&self, d: &Drawable<'_, '_>) -> Result<Vec<Subpath>, ElementError> {
        let data = d
            .node
            .attribute("d")
            .filter(|data| !data.trim().is_empty())
            .ok_or(ElementError::MissingAttribute("d"))?;
        parse_path_d(data, self.config.curve_flatten_segments).map_err(ElementError::Path)
    }

    /// A lone `<path>`.
    ///
    /// Closed outlines with both fill and stroke, and dashed stroke-only
    /// outlines, become shapes.  Everything else is one stroke per subpath.
    fn path(&self, d: &Drawable<'_, '_>) -> Converted {
        let subpaths = self.subpaths(d)?;
        if subpaths.is_empty() {
            return Ok(Vec::new());
        }
        let style = &d.style;
        let fill = style.fill_paint();
        let stroke = style.stroke_paint();

        let filled_outline =
            fill.is_visible() && stroke.is_visible() && subpaths.first().is_some_and(|s| s.closed);
        let dashed_outline =
            !fill.is_visible() && stroke.is_visible() && style.border_type().is_some();
        if filled_outline || dashed_outline {
            if let Some(shape) = outline_shape(d, style, style, &subpaths) {
                return Ok(vec![Item::Shape(shape)]);
            }
        }

        // Colour alpha stays in the colour; only the `*-opacity` attribute
        // of the painting channel joins the item opacity.
        let (color, paint_opacity) = if stroke.is_visible() {
            (stroke.color_with_alpha(), style.stroke_opacity.as_deref())
        } else {
            (fill.color_with_alpha(), style.fill_opacity.as_deref())
        };
        let opacity = d.opacity() * parse_opacity(paint_opacity);
        Ok(self.strokes(
            d,
            &subpaths,
            &StrokePaint {
                color,
                opacity,
                width: style.stroke_width(),
            },
        ))
    }

    /// A merged fill/stroke pair.
    fn pair(&self, fill: &Drawable<'_, '_>, stroke: &Drawable<'_, '_>) -> Converted {
        let subpaths = self.subpaths(fill)?;
        if subpaths.is_empty() {
            return Ok(Vec::new());
        }
        let fill_alpha = fill.style.fill_alpha();
        let stroke_alpha = stroke.style.stroke_alpha();

        if fill_alpha >= VISIBLE_FILL_ALPHA && stroke_alpha >= SOLID_STROKE_ALPHA {
            if let Some(shape) = outline_shape(fill, &fill.style, &stroke.style, &subpaths) {
                return Ok(vec![Item::Shape(shape)]);
            }
        }

        let width = stroke.style.stroke_width();
        let paint = if fill_alpha < VISIBLE_FILL_ALPHA {
            StrokePaint {
                color: stroke.style.stroke_paint().color_with_alpha(),
                opacity: parse_opacity(stroke.style.stroke_opacity.as_deref()) * stroke.opacity(),
                width,
            }
        } else {
            StrokePaint {
                color: fill.style.fill_paint().color_with_alpha(),
                opacity: parse_opacity(fill.style.fill_opacity.as_deref()) * fill.opacity(),
                width,
            }
        };
        Ok(self.strokes(fill, &subpaths, &paint))
    }

    /// One pen or highlighter per subpath.
    fn strokes(&self, d: &Drawable<'_, '_>, subpaths: &[Subpath], paint: &StrokePaint) -> Vec<Item> {
        let size = paint.width * d.matrix.scale_factor();
        let highlighter = paint.opacity < self.config.highlighter_opacity_threshold
            && size >= self.config.highlighter_min_stroke_width;
        let opacity = if highlighter {
            Some(paint.opacity)
        } else {
            below_one(paint.opacity)
        };
        let color = paint
            .color
            .clone()
            .unwrap_or_else(|| Color::from(FALLBACK_COLOR));
        let line_cap = d
            .style
            .stroke_linecap
            .as_deref()
            .and_then(LineCap::parse)
            .unwrap_or(LineCap::Round);
        let line_join = d
            .style
            .stroke_linejoin
            .as_deref()
            .and_then(LineJoin::parse)
            .unwrap_or(LineJoin::Round);

        subpaths
            .iter()
            .filter_map(|subpath| {
                let mut pts: Vec<Point> =
                    subpath.points.iter().map(|p| d.matrix.apply(*p)).collect();
                if self.config.simplify_tolerance > 0.0 {
                    pts = simplify_path(&pts, self.config.simplify_tolerance);
                }
                if pts.is_empty() {
                    return None;
                }
                let stroke = Stroke {
                    common: ItemCommon {
                        opacity,
                        ..ItemCommon::default()
                    },
                    pts,
                    color: Some(color.clone()),
                    size: Some(size),
                    line_cap: Some(line_cap),
                    line_join: Some(line_join),
                };
                Some(if highlighter {
                    Item::Highlighter(stroke)
                } else {
                    Item::Pen(stroke)
                })
            })
            .collect()
    }

    fn image(&mut self, d: &Drawable<'_, '_>) -> Converted {
        let node = d.node;
        let src = href(node).ok_or(ElementError::MissingAttribute("href"))?;
        let (w, h) = (length(node, "width"), length(node, "height"));
        if w <= 0.0 || h <= 0.0 {
            return Err(ElementError::ZeroSizeImage);
        }
        if src.starts_with("data:") && src.len() > self.config.large_image_warn_bytes {
            let kib = src.len() / 1024;
            self.warnings
                .push(warning(d.tag(), format!("large embedded image ({kib} KiB)")));
        }

        let mask = match d.mask.as_deref() {
            None => None,
            Some(id) => {
                if let Some(def) = self.masks.get(id) {
                    Some(ImageMask {
                        id: Some(id.to_owned()),
                        kind: Some(def.kind.clone()),
                        src: def.src.clone(),
                    })
                } else {
                    self.warnings.push(warning(
                        d.tag(),
                        format!("mask `{id}` has no image; image kept unmasked"),
                    ));
                    None
                }
            }
        };

        let placement = place(&Rect::new(length(node, "x"), length(node, "y"), w, h), &d.matrix);
        Ok(vec![Item::Image(Image {
            common: common(d.opacity(), placement.rotation),
            x: placement.rect.x,
            y: placement.rect.y,
            w: Some(placement.rect.width),
            h: Some(placement.rect.height),
            src: src.to_owned(),
            mask,
            is_background: false,
        })])
    }
}

/// Flag images that cover the canvas as backgrounds.
pub fn mark_backgrounds(items: &mut [Item], width: f64, height: f64) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    let near = |ratio: f64| (ratio - 1.0).abs() < BACKGROUND_TOLERANCE;
    for item in items {
        let Item::Image(image) = item else {
            continue;
        };
        let (w, h) = (image.w.unwrap_or(0.0), image.h.unwrap_or(0.0));
        if image.x.abs() < width * BACKGROUND_TOLERANCE
            && image.y.abs() < height * BACKGROUND_TOLERANCE
            && near(w / width)
            && near(h / height)
        {
            debug!(id = %image.common.id, "image covers the canvas; marking as background");
            image.is_background = true;
        }
    }
}

fn below_one(value: f64) -> Option<f64> {
    (value < 1.0).then_some(value)
}

fn common(opacity: f64, rotation: f64) -> ItemCommon {
    ItemCommon {
        opacity: below_one(opacity),
        rotation,
        ..ItemCommon::default()
    }
}

/// A length attribute, `0` when absent or malformed.
fn length(node: Node<'_, '_>, name: &str) -> f64 {
    node.attribute(name).and_then(parse_length).unwrap_or(0.0)
}

/// Shape painted with `fill`'s fill and `stroke`'s stroke.
fn painted_shape(
    d: &Drawable<'_, '_>,
    shape_type: ShapeType,
    placement: Placement,
    fill: &Style,
    stroke: &Style,
) -> Shape {
    let fill_paint = fill.fill_paint();
    let stroke_paint = stroke.stroke_paint();
    Shape {
        common: common(d.opacity(), placement.rotation),
        shape_type,
        x: placement.rect.x,
        y: placement.rect.y,
        width: Some(placement.rect.width),
        height: Some(placement.rect.height),
        fill_opacity: fill_paint
            .is_visible()
            .then(|| fill.fill_alpha())
            .and_then(below_one),
        fill_color: fill_paint.color(),
        border_opacity: stroke_paint
            .is_visible()
            .then(|| stroke.stroke_alpha())
            .and_then(below_one),
        border_color: Some(stroke_paint.color().unwrap_or_else(|| Color::from("none"))),
        border_size: Some(stroke.stroke_width() * d.matrix.scale_factor()),
        border_type: stroke.border_type(),
        pts: None,
        contours: None,
    }
}

fn plain_shape(d: &Drawable<'_, '_>, shape_type: ShapeType, placement: Placement) -> Shape {
    painted_shape(d, shape_type, placement, &d.style, &d.style)
}

/// Shape from closed outlines: a rectangle or named shape when the single
/// outline matches one, otherwise a polygon.  `None` when the outer ring
/// has fewer than three vertices.
fn outline_shape(
    d: &Drawable<'_, '_>,
    fill: &Style,
    stroke: &Style,
    subpaths: &[Subpath],
) -> Option<Shape> {
    let rings: Vec<&[Point]> = subpaths
        .iter()
        .map(|s| open_ring(&s.points))
        .filter(|ring| ring.len() >= 3)
        .collect();
    let outer = subpaths.first().map(|s| open_ring(&s.points))?;
    if outer.len() < 3 {
        return None;
    }

    if rings.len() == 1 {
        if let Some((shape_type, local)) = match_outline(outer) {
            return Some(painted_shape(
                d,
                shape_type,
                place(&local, &d.matrix),
                fill,
                stroke,
            ));
        }
    }

    let (placement, mut normalized) = place_outline(&rings, &d.matrix)?;
    let contours = normalized.split_off(1);
    let mut shape = painted_shape(d, ShapeType::Polygon, placement, fill, stroke);
    shape.pts = normalized.pop();
    shape.contours = (!contours.is_empty()).then_some(contours);
    Some(shape)
}

fn rect(d: &Drawable<'_, '_>) -> Vec<Item> {
    let node = d.node;
    let (w, h) = (length(node, "width"), length(node, "height"));
    if w <= 0.0 || h <= 0.0 {
        return Vec::new();
    }
    let local = Rect::new(length(node, "x"), length(node, "y"), w, h);
    let shape_type = if length(node, "rx") > 0.0 || length(node, "ry") > 0.0 {
        ShapeType::RoundedRect
    } else {
        ShapeType::Rectangle
    };
    vec![Item::Shape(plain_shape(d, shape_type, place(&local, &d.matrix)))]
}

fn circle(d: &Drawable<'_, '_>) -> Vec<Item> {
    let node = d.node;
    let r = length(node, "r");
    if r <= 0.0 {
        return Vec::new();
    }
    let local = Rect::new(length(node, "cx") - r, length(node, "cy") - r, 2.0 * r, 2.0 * r);
    let placement = place(&local, &d.matrix);
    // Unequal axis scales turn a circle into an ellipse.
    let shape_type = if (placement.rect.width - placement.rect.height).abs() < 1e-6 {
        ShapeType::Circle
    } else {
        ShapeType::Ellipse
    };
    vec![Item::Shape(plain_shape(d, shape_type, placement))]
}

fn ellipse(d: &Drawable<'_, '_>) -> Vec<Item> {
    let node = d.node;
    let (rx, ry) = (length(node, "rx"), length(node, "ry"));
    if rx <= 0.0 || ry <= 0.0 {
        return Vec::new();
    }
    let local = Rect::new(
        length(node, "cx") - rx,
        length(node, "cy") - ry,
        2.0 * rx,
        2.0 * ry,
    );
    vec![Item::Shape(plain_shape(
        d,
        ShapeType::Ellipse,
        place(&local, &d.matrix),
    ))]
}

/// `<line>` becomes a line shape whose box runs from the first endpoint to
/// the second; width and height may be negative.
fn line(d: &Drawable<'_, '_>) -> Vec<Item> {
    let node = d.node;
    let start = d.matrix.apply(Point::new(length(node, "x1"), length(node, "y1")));
    let end = d.matrix.apply(Point::new(length(node, "x2"), length(node, "y2")));
    let placement = Placement {
        rect: Rect::new(start.x, start.y, end.x - start.x, end.y - start.y),
        rotation: 0.0,
    };
    let mut shape = plain_shape(d, ShapeType::Line, placement);
    shape.fill_color = None;
    shape.fill_opacity = None;
    vec![Item::Shape(shape)]
}

fn point_list(node: Node<'_, '_>) -> Vec<Point> {
    parse_numbers(node.attribute("points").unwrap_or_default())
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect()
}

fn polyline(d: &Drawable<'_, '_>) -> Converted {
    let points = point_list(d.node);
    if points.len() < 2 {
        return Err(ElementError::TooFewPoints(2));
    }
    let Some((placement, mut normalized)) = place_outline(&[points.as_slice()], &d.matrix) else {
        return Ok(Vec::new());
    };
    let mut shape = plain_shape(d, ShapeType::Polyline, placement);
    shape.pts = normalized.pop();
    Ok(vec![Item::Shape(shape)])
}

fn polygon(d: &Drawable<'_, '_>) -> Converted {
    let points = point_list(d.node);
    if points.len() < 3 {
        return Err(ElementError::TooFewPoints(3));
    }
    let outline = Subpath {
        points,
        closed: true,
    };
    Ok(outline_shape(d, &d.style, &d.style, &[outline])
        .map(Item::Shape)
        .into_iter()
        .collect())
}

/// Concatenated character data below `node`.
fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect()
}

/// Raw markup between an element's start and end tags.
fn inner_markup<'input>(node: Node<'_, 'input>) -> &'input str {
    let (Some(first), Some(last)) = (node.first_child(), node.last_child()) else {
        return "";
    };
    node.document()
        .input_text()
        .get(first.range().start..last.range().end)
        .unwrap_or_default()
}

fn first_number(value: &str) -> Option<f64> {
    parse_numbers(value).first().copied()
}

fn matrix_attr(m: &Matrix) -> String {
    let n = |v: f64| round_to(v, 6);
    format!(
        "matrix({} {} {} {} {} {})",
        n(m.a),
        n(m.b),
        n(m.c),
        n(m.d),
        n(m.e),
        n(m.f)
    )
}

/// `<text>`: synthesized position, size and content, plus a verbatim
/// copy of the element when it has `<tspan>`s or its own transform.
fn text(d: &Drawable<'_, '_>) -> Vec<Item> {
    let node = d.node;
    let tspans: Vec<Node<'_, '_>> = node
        .children()
        .filter(|c| c.has_tag_name("tspan"))
        .collect();
    let content = if tspans.is_empty() {
        text_content(node)
    } else {
        tspans
            .iter()
            .map(|t| text_content(*t))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let content = content.trim();
    if content.is_empty() {
        return Vec::new();
    }

    // The first tspan positioned on both axes wins; x may list one value
    // per glyph.
    let (x, y) = tspans
        .iter()
        .find_map(|t| Some((first_number(t.attribute("x")?)?, first_number(t.attribute("y")?)?)))
        .unwrap_or_else(|| {
            let coordinate =
                |name: &str| node.attribute(name).and_then(first_number).unwrap_or(0.0);
            (coordinate("x"), coordinate("y"))
        });
    let anchor = d.matrix.apply(Point::new(x, y));
    let size = d
        .style
        .font_size
        .as_deref()
        .and_then(parse_length)
        .filter(|s| *s > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE)
        * d.matrix.scale_factor();

    let own_transform = node.attribute("transform");
    let svg_data = (own_transform.is_some() || !tspans.is_empty()).then(|| {
        let transform = if d.parent_matrix.is_identity() {
            own_transform.map(str::to_owned)
        } else {
            let ancestors = matrix_attr(&d.parent_matrix);
            Some(own_transform.map_or_else(|| ancestors.clone(), |own| format!("{ancestors} {own}")))
        };
        TextSvgData {
            xml_space: node
                .attribute((roxmltree::NS_XML_URI, "space"))
                .map(str::to_owned),
            x: node.attribute("x").map(str::to_owned),
            y: node.attribute("y").map(str::to_owned),
            transform,
            font_size: d.style.font_size.clone(),
            font_family: d.style.font_family.clone(),
            fill: d.style.fill.clone(),
            inner_content: inner_markup(node).to_owned(),
        }
    });

    let longest = content.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let line_count = content.lines().count().max(1);
    #[allow(clippy::cast_precision_loss)]
    let (w, h) = (
        longest as f64 * size * TEXT_CHAR_ADVANCE,
        line_count as f64 * size * TEXT_LINE_HEIGHT,
    );

    vec![Item::Text(Text {
        common: common(d.opacity(), 0.0),
        x: anchor.x,
        // Stored y is the top of the first line; SVG y is its baseline.
        y: anchor.y - size,
        w: Some(w),
        h: Some(h),
        size: Some(size),
        color: Some(
            d.style
                .fill_paint()
                .color_with_alpha()
                .unwrap_or_else(|| Color::from(FALLBACK_COLOR)),
        ),
        text: content.to_owned(),
        font_family: d.style.font_family.clone(),
        svg_data,
    })]
}
