//! The annotation document model.
//!
//! A [`Document`] is canvas metadata plus `history`, the ordered list of
//! drawn [`Item`]s.  History order is z-order: later items paint over
//! earlier ones.  JSON field names are camelCase to match the documents
//! produced by the annotation editor.

use std::collections::{BTreeMap, HashSet};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::color::{Rgba, parse_color, to_svg_color};
use crate::geometry::{Point, Rect};

/// Default canvas width when a document omits it.
pub const DEFAULT_WIDTH: f64 = 1920.0;

/// Default canvas height when a document omits it.
pub const DEFAULT_HEIGHT: f64 = 1080.0;

/// Title written to exported SVGs for untitled documents.
pub const DEFAULT_TITLE: &str = "Annotation Export";

/// Highlighter opacity when an item does not set one.
pub const DEFAULT_HIGHLIGHTER_OPACITY: f64 = 0.4;

/// Font size for text items without one.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Line advance as a multiple of the font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.2;

/// Average glyph advance as a multiple of the font size, used to estimate
/// text extents.
pub const TEXT_CHAR_ADVANCE: f64 = 0.6;

/// An annotation document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub history: Vec<Item>,
}

/// Canvas description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The `viewBox` of the SVG this document was decoded from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_box: Option<ViewBox>,
    /// Set to `"svg"` by the decoder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            title: None,
            view_box: None,
            source_type: None,
        }
    }
}

const fn default_width() -> f64 {
    DEFAULT_WIDTH
}

const fn default_height() -> f64 {
    DEFAULT_HEIGHT
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Fields shared by every known item kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCommon {
    /// Item identifier.  Numeric ids in input JSON are read as strings.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    /// Deleted items stay in history but are never rendered.
    #[serde(default)]
    pub deleted: bool,
    /// Whole-item opacity in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    /// Degrees, about the item's own bounding-box centre.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub rotation: f64,
}

impl ItemCommon {
    /// Common fields for a freshly decoded item.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// A colour as stored in a document: CSS text or channel object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Css(String),
    Rgba(Rgba),
}

impl Color {
    /// Text for an SVG paint attribute.  CSS strings pass through as-is.
    #[must_use]
    pub fn to_svg(&self) -> String {
        match self {
            Self::Css(css) => css.clone(),
            Self::Rgba(rgba) => to_svg_color(*rgba),
        }
    }

    /// Parsed channels, if the colour is understood.
    #[must_use]
    pub fn to_rgba(&self) -> Option<Rgba> {
        match self {
            Self::Css(css) => parse_color(css),
            Self::Rgba(rgba) => Some(*rgba),
        }
    }
}

impl From<&str> for Color {
    fn from(css: &str) -> Self {
        Self::Css(css.to_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl LineCap {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Butt => "butt",
            Self::Round => "round",
            Self::Square => "square",
        }
    }

    /// Parse an SVG `stroke-linecap` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "butt" => Some(Self::Butt),
            "round" => Some(Self::Round),
            "square" => Some(Self::Square),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miter => "miter",
            Self::Round => "round",
            Self::Bevel => "bevel",
        }
    }

    /// Parse an SVG `stroke-linejoin` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "miter" | "miter-clip" | "arcs" => Some(Self::Miter),
            "round" => Some(Self::Round),
            "bevel" => Some(Self::Bevel),
            _ => None,
        }
    }
}

/// A freehand stroke (`pen` or `highlighter`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    #[serde(flatten)]
    pub common: ItemCommon,
    #[serde(default)]
    pub pts: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_cap: Option<LineCap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_join: Option<LineJoin>,
}

impl Stroke {
    /// Bounding box of the stroke's points.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::from_points(&self.pts)
    }
}

/// Geometric shape kinds.  Unrecognised names read as [`ShapeType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShapeType {
    #[default]
    Rectangle,
    RoundedRect,
    Ellipse,
    Circle,
    Triangle,
    Diamond,
    Star,
    Hexagon,
    Pentagon,
    Octagon,
    Polygon,
    Polyline,
    Arrow,
    Line,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderType {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// A geometric shape with a bounding box, fill and border.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ShapeRepr")]
pub struct Shape {
    #[serde(flatten)]
    pub common: ItemCommon,
    pub shape_type: ShapeType,
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_type: Option<BorderType>,
    /// Outline in bbox-normalized `[0, 1]` coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pts: Option<Vec<Point>>,
    /// Extra normalized outlines (holes or islands) for even-odd polygons.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contours: Option<Vec<Vec<Point>>>,
}

/// Wire form of [`Shape`], accepting the legacy `w`/`h` layout where
/// `width` meant the border size.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeRepr {
    #[serde(flatten)]
    common: ItemCommon,
    #[serde(default)]
    shape_type: ShapeType,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    w: Option<f64>,
    h: Option<f64>,
    #[serde(alias = "fill")]
    fill_color: Option<Color>,
    fill_opacity: Option<f64>,
    #[serde(alias = "border")]
    border_color: Option<Color>,
    border_opacity: Option<f64>,
    border_size: Option<f64>,
    border_type: Option<BorderType>,
    pts: Option<Vec<Point>>,
    contours: Option<Vec<Vec<Point>>>,
}

impl From<ShapeRepr> for Shape {
    fn from(repr: ShapeRepr) -> Self {
        let (width, height, border_size) = if repr.w.is_some() {
            (repr.w, repr.h, repr.border_size.or(repr.width))
        } else {
            (repr.width, repr.height, repr.border_size)
        };
        Self {
            common: repr.common,
            shape_type: repr.shape_type,
            x: repr.x,
            y: repr.y,
            width,
            height,
            fill_color: repr.fill_color,
            fill_opacity: repr.fill_opacity,
            border_color: repr.border_color,
            border_opacity: repr.border_opacity,
            border_size,
            border_type: repr.border_type,
            pts: repr.pts,
            contours: repr.contours,
        }
    }
}

/// Passthrough of an imported `<text>` element.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSvgData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xml_space: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    /// Raw markup between `<text>` and `</text>`.
    #[serde(default)]
    pub inner_content: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Text {
    #[serde(flatten)]
    pub common: ItemCommon,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub svg_data: Option<TextSvgData>,
}

impl Text {
    /// Font size, falling back to [`DEFAULT_FONT_SIZE`].
    #[must_use]
    pub fn font_size(&self) -> f64 {
        self.size.unwrap_or(DEFAULT_FONT_SIZE)
    }

    /// Layout box: the stored `w`/`h`, or an estimate from the text.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bounds(&self) -> Rect {
        let size = self.font_size();
        let lines = self.text.split('\n');
        let longest = lines.clone().map(|l| l.chars().count()).max().unwrap_or(0);
        let line_count = lines.count().max(1);
        let w = self
            .w
            .unwrap_or(longest as f64 * size * TEXT_CHAR_ADVANCE);
        let h = self
            .h
            .unwrap_or(line_count as f64 * size * TEXT_LINE_HEIGHT);
        Rect::new(self.x, self.y, w, h)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageMask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub src: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(flatten)]
    pub common: ItemCommon,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
    #[serde(default)]
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<ImageMask>,
    /// Set by the decoder when the image covers the whole canvas.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_background: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(flatten)]
    pub common: ItemCommon,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub w: f64,
    #[serde(default)]
    pub h: f64,
    #[serde(default)]
    pub children: Vec<GroupChild>,
}

/// A group member: either a reference to a history item or an inline item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GroupChild {
    Ref(String),
    Inline(Box<Item>),
}

impl<'de> Deserialize<'de> for GroupChild {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(id) => Ok(Self::Ref(id)),
            Value::Number(n) => Ok(Self::Ref(n.to_string())),
            value => serde_json::from_value(value)
                .map(|item| Self::Inline(Box::new(item)))
                .map_err(D::Error::custom),
        }
    }
}

/// An item with a `tool` this crate does not model and no points.
///
/// Kept verbatim so documents survive a decode/re-serialize cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownItem {
    pub id: String,
    pub tool: String,
    pub raw: Value,
}

/// One entry in a document's history.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Pen(Stroke),
    Highlighter(Stroke),
    Shape(Shape),
    Text(Text),
    Image(Image),
    Group(Group),
    /// Unrecognised tool carrying `pts`; rendered as a pen stroke.
    UnknownWithPoints { tool: String, stroke: Stroke },
    /// Unrecognised tool without points; never rendered.
    Unknown(UnknownItem),
}

/// Known variants, dispatched on `tool`.
#[derive(Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase")]
enum KnownItem {
    Pen(Stroke),
    Highlighter(Stroke),
    Shape(Shape),
    Text(Text),
    Image(Image),
    Group(Group),
}

const KNOWN_TOOLS: [&str; 6] = ["pen", "highlighter", "shape", "text", "image", "group"];

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let tool = value
            .get("tool")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        if KNOWN_TOOLS.contains(&tool.as_str()) {
            let known: KnownItem = serde_json::from_value(value).map_err(D::Error::custom)?;
            return Ok(match known {
                KnownItem::Pen(s) => Self::Pen(s),
                KnownItem::Highlighter(s) => Self::Highlighter(s),
                KnownItem::Shape(s) => Self::Shape(s),
                KnownItem::Text(t) => Self::Text(t),
                KnownItem::Image(i) => Self::Image(i),
                KnownItem::Group(g) => Self::Group(g),
            });
        }

        if value.get("pts").is_some_and(Value::is_array) {
            let stroke: Stroke = serde_json::from_value(value).map_err(D::Error::custom)?;
            return Ok(Self::UnknownWithPoints { tool, stroke });
        }

        let id = match value.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        Ok(Self::Unknown(UnknownItem {
            id,
            tool,
            raw: value,
        }))
    }
}

/// Serialization proxy: a borrowed item body with its `tool` tag.
#[derive(Serialize)]
struct Tagged<'a, T> {
    tool: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tool = self.tool();
        match self {
            Self::Pen(s) | Self::Highlighter(s) | Self::UnknownWithPoints { stroke: s, .. } => {
                Tagged { tool, body: s }.serialize(serializer)
            }
            Self::Shape(s) => Tagged { tool, body: s }.serialize(serializer),
            Self::Text(t) => Tagged { tool, body: t }.serialize(serializer),
            Self::Image(i) => Tagged { tool, body: i }.serialize(serializer),
            Self::Group(g) => Tagged { tool, body: g }.serialize(serializer),
            Self::Unknown(u) => u.raw.serialize(serializer),
        }
    }
}

impl Item {
    /// The `tool` name as written in JSON.
    #[must_use]
    pub fn tool(&self) -> &str {
        match self {
            Self::Pen(_) => "pen",
            Self::Highlighter(_) => "highlighter",
            Self::Shape(_) => "shape",
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Group(_) => "group",
            Self::UnknownWithPoints { tool, .. } => tool,
            Self::Unknown(u) => &u.tool,
        }
    }

    /// Shared fields, absent for [`Item::Unknown`].
    #[must_use]
    pub const fn common(&self) -> Option<&ItemCommon> {
        match self {
            Self::Pen(s) | Self::Highlighter(s) | Self::UnknownWithPoints { stroke: s, .. } => {
                Some(&s.common)
            }
            Self::Shape(s) => Some(&s.common),
            Self::Text(t) => Some(&t.common),
            Self::Image(i) => Some(&i.common),
            Self::Group(g) => Some(&g.common),
            Self::Unknown(_) => None,
        }
    }

    pub const fn common_mut(&mut self) -> Option<&mut ItemCommon> {
        match self {
            Self::Pen(s) | Self::Highlighter(s) | Self::UnknownWithPoints { stroke: s, .. } => {
                Some(&mut s.common)
            }
            Self::Shape(s) => Some(&mut s.common),
            Self::Text(t) => Some(&mut t.common),
            Self::Image(i) => Some(&mut i.common),
            Self::Group(g) => Some(&mut g.common),
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Unknown(u) => &u.id,
            _ => self.common().map_or("", |c| c.id.as_str()),
        }
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        match self {
            Self::Unknown(u) => u.raw.get("deleted").and_then(Value::as_bool) == Some(true),
            _ => self.common().is_some_and(|c| c.deleted),
        }
    }
}

impl Document {
    /// First item in history with the given id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Item> {
        self.history.iter().find(|item| item.id() == id)
    }

    /// Ids referenced by group `children`, at any nesting depth.
    ///
    /// These items render only inside their group.
    #[must_use]
    pub fn group_member_ids(&self) -> HashSet<&str> {
        fn collect<'a>(item: &'a Item, out: &mut HashSet<&'a str>) {
            if let Item::Group(group) = item {
                for child in &group.children {
                    match child {
                        GroupChild::Ref(id) => {
                            out.insert(id.as_str());
                        }
                        GroupChild::Inline(inner) => collect(inner, out),
                    }
                }
            }
        }
        let mut out = HashSet::new();
        for item in &self.history {
            collect(item, &mut out);
        }
        out
    }

    /// Number of items per tool, deleted items excluded.
    #[must_use]
    pub fn tool_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for item in self.history.iter().filter(|i| !i.is_deleted()) {
            *counts.entry(item.tool().to_owned()).or_insert(0) += 1;
        }
        counts
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }
    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Text(s)) => s,
        Some(RawId::Int(n)) => n.to_string(),
        Some(RawId::Float(f)) => f.to_string(),
        None => String::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;

    fn item(value: Value) -> Item {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn metadata_defaults() {
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert!((doc.metadata.width - 1920.0).abs() < f64::EPSILON);
        assert!((doc.metadata.height - 1080.0).abs() < f64::EPSILON);
        assert!(doc.history.is_empty());
    }

    #[test]
    fn pen_reads_camel_case_fields() {
        let Item::Pen(stroke) = item(json!({
            "tool": "pen", "id": "a", "pts": [{"x": 1, "y": 2}],
            "color": "#ff0000", "size": 4, "lineCap": "square", "lineJoin": "bevel"
        })) else {
            panic!("expected pen");
        };
        assert_eq!(stroke.common.id, "a");
        assert_eq!(stroke.pts, vec![Point::new(1.0, 2.0)]);
        assert_eq!(stroke.color, Some(Color::from("#ff0000")));
        assert_eq!(stroke.line_cap, Some(LineCap::Square));
        assert_eq!(stroke.line_join, Some(LineJoin::Bevel));
    }

    #[test]
    fn numeric_ids_become_strings() {
        let pen = item(json!({"tool": "pen", "id": 1_700_000_000_123_i64, "pts": []}));
        assert_eq!(pen.id(), "1700000000123");
    }

    #[test]
    fn rgba_object_colors() {
        let Item::Pen(stroke) = item(json!({
            "tool": "pen", "pts": [], "color": {"r": 1, "g": 2, "b": 3, "a": 0.5}
        })) else {
            panic!("expected pen");
        };
        assert_eq!(stroke.color, Some(Color::Rgba(Rgba::new(1, 2, 3, 0.5))));
    }

    #[test]
    fn shape_aliases_and_unknown_type() {
        let Item::Shape(shape) = item(json!({
            "tool": "shape", "shapeType": "blob", "x": 1, "y": 2, "width": 30, "height": 40,
            "fill": "#00f", "border": "#000"
        })) else {
            panic!("expected shape");
        };
        assert_eq!(shape.shape_type, ShapeType::Unknown);
        assert_eq!(shape.width, Some(30.0));
        assert_eq!(shape.fill_color, Some(Color::from("#00f")));
        assert_eq!(shape.border_color, Some(Color::from("#000")));
    }

    #[test]
    fn legacy_shape_width_is_border_size() {
        let Item::Shape(shape) = item(json!({
            "tool": "shape", "shapeType": "ellipse", "w": 80, "h": 60, "width": 3
        })) else {
            panic!("expected shape");
        };
        assert_eq!(shape.width, Some(80.0));
        assert_eq!(shape.height, Some(60.0));
        assert_eq!(shape.border_size, Some(3.0));
    }

    #[test]
    fn unknown_tool_with_points_is_kept_as_stroke() {
        let parsed = item(json!({"tool": "marker", "id": "m", "pts": [{"x": 0, "y": 0}]}));
        let Item::UnknownWithPoints { tool, stroke } = &parsed else {
            panic!("expected unknown-with-points");
        };
        assert_eq!(tool, "marker");
        assert_eq!(stroke.pts.len(), 1);
        let back = serde_json::to_value(&parsed).unwrap();
        assert_eq!(back["tool"], "marker");
    }

    #[test]
    fn unknown_tool_is_preserved_verbatim() {
        let raw = json!({"tool": "sticky", "id": 7, "note": "hi", "deleted": true});
        let parsed = item(raw.clone());
        assert_eq!(parsed.id(), "7");
        assert!(parsed.is_deleted());
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn serialization_carries_tool_tag() {
        let pen = Item::Pen(Stroke {
            common: ItemCommon::with_id("p1"),
            pts: vec![Point::new(0.0, 0.0)],
            ..Stroke::default()
        });
        let value = serde_json::to_value(&pen).unwrap();
        assert_eq!(value["tool"], "pen");
        assert_eq!(value["id"], "p1");
        assert_eq!(value["deleted"], false);
        assert!(value.get("opacity").is_none());
        assert!(value.get("rotation").is_none());
    }

    #[test]
    fn group_children_by_reference_and_inline() {
        let Item::Group(group) = item(json!({
            "tool": "group", "id": "g",
            "children": ["a", 5, {"tool": "pen", "id": "c", "pts": []}]
        })) else {
            panic!("expected group");
        };
        assert_eq!(group.children[0], GroupChild::Ref("a".to_owned()));
        assert_eq!(group.children[1], GroupChild::Ref("5".to_owned()));
        assert!(matches!(&group.children[2], GroupChild::Inline(inner) if inner.id() == "c"));
    }

    #[test]
    fn group_member_ids_include_nested_groups() {
        let doc: Document = serde_json::from_value(json!({
            "history": [
                {"tool": "pen", "id": "a", "pts": []},
                {"tool": "group", "id": "g", "children": [
                    "a",
                    {"tool": "group", "id": "inner", "children": ["b"]}
                ]}
            ]
        }))
        .unwrap();
        let ids = doc.group_member_ids();
        assert!(ids.contains("a"));
        assert!(ids.contains("b"));
        assert!(!ids.contains("g"));
    }

    #[test]
    fn tool_counts_skip_deleted() {
        let doc: Document = serde_json::from_value(json!({
            "history": [
                {"tool": "pen", "pts": []},
                {"tool": "pen", "pts": [], "deleted": true},
                {"tool": "text", "text": "hi"}
            ]
        }))
        .unwrap();
        let counts = doc.tool_counts();
        assert_eq!(counts.get("pen"), Some(&1));
        assert_eq!(counts.get("text"), Some(&1));
    }

    #[test]
    fn document_json_round_trip() {
        let json = json!({
            "metadata": {"width": 800.0, "height": 600.0, "title": "t"},
            "history": [
                {"tool": "shape", "id": "s", "deleted": false, "shapeType": "star",
                 "x": 0.0, "y": 0.0, "width": 10.0, "height": 10.0, "borderType": "dotted"},
                {"tool": "image", "id": "i", "deleted": false, "x": 0.0, "y": 0.0,
                 "src": "data:x", "mask": {"id": "m", "src": "data:y"}}
            ]
        });
        let doc: Document = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), json);
    }
}
