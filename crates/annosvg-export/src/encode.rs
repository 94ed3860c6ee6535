//! Document → SVG assembly.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use annosvg_core::document::{Group, GroupChild, Image, Item};
use annosvg_core::{CodecConfig, ConversionWarning, Document};
use tracing::{debug, warn};

use crate::markup::{Tag, opacity, write_svg_preamble};
use crate::render;

/// Result of [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// The complete SVG document.
    pub svg: String,
    /// Items that were skipped or could not be fully represented.
    pub warnings: Vec<ConversionWarning>,
}

/// Encode a document as an SVG string.
///
/// Items are written in history order.  Deleted items and items that a
/// group references by id are not written at the top level; referenced
/// items appear inside their group instead.  Image masks from anywhere in
/// the document are collected into a single `<defs>` block.
#[must_use]
pub fn encode(document: &Document, config: &CodecConfig) -> Encoded {
    let mut encoder = Encoder::new(document, config);
    let body = encoder.body();

    let mut svg = String::new();
    write_svg_preamble(&mut svg, &document.metadata);
    if !encoder.masks.is_empty() {
        let _ = writeln!(svg, "  <defs>");
        for def in &encoder.masks {
            svg.push_str(def);
        }
        let _ = writeln!(svg, "  </defs>");
    }
    svg.push_str(&body);
    let _ = writeln!(svg, "</svg>");

    debug!(
        items = document.history.len(),
        masks = encoder.masks.len(),
        warnings = encoder.warnings.len(),
        "encoded document"
    );
    Encoded {
        svg,
        warnings: encoder.warnings,
    }
}

/// Encode with the default configuration, discarding warnings.
#[must_use]
pub fn to_svg(document: &Document) -> String {
    encode(document, &CodecConfig::default()).svg
}

/// Per-call encoding state.
struct Encoder<'a> {
    document: &'a Document,
    config: &'a CodecConfig,
    by_id: HashMap<&'a str, &'a Item>,
    masks: Vec<String>,
    mask_ids: HashSet<String>,
    warnings: Vec<ConversionWarning>,
    /// Ids of the groups currently being written, for cycle detection.
    open_groups: Vec<&'a str>,
}

impl<'a> Encoder<'a> {
    fn new(document: &'a Document, config: &'a CodecConfig) -> Self {
        let mut by_id = HashMap::new();
        for item in &document.history {
            let id = item.id();
            if !id.is_empty() {
                by_id.entry(id).or_insert(item);
            }
        }
        Self {
            document,
            config,
            by_id,
            masks: Vec::new(),
            mask_ids: HashSet::new(),
            warnings: Vec::new(),
            open_groups: Vec::new(),
        }
    }

    fn body(&mut self) -> String {
        let document = self.document;
        let members = document.group_member_ids();
        let mut out = String::new();
        for item in &document.history {
            let id = item.id();
            if item.is_deleted() || (!id.is_empty() && members.contains(id)) {
                continue;
            }
            self.item(item, 1, &mut out);
        }
        out
    }

    fn warn(&mut self, item: &Item, message: impl Into<String>) {
        let warning = ConversionWarning::new(format!("{}:{}", item.tool(), item.id()), message);
        warn!(element = %warning.element, "{}", warning.message);
        self.warnings.push(warning);
    }

    fn item(&mut self, item: &'a Item, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        let line = match item {
            Item::Pen(s) => render::stroke(s, false),
            Item::Highlighter(s) => render::stroke(s, true),
            Item::UnknownWithPoints { tool, stroke } => {
                debug!(tool = %tool, "rendering unknown tool as pen");
                render::stroke(stroke, false)
            }
            Item::Shape(s) => Some(render::shape(s)),
            Item::Text(t) => render::text(t),
            Item::Image(image) => {
                self.image(item, image, depth, out);
                return;
            }
            Item::Group(group) => {
                self.group(item, group, depth, out);
                return;
            }
            Item::Unknown(unknown) => {
                let message = format!("unsupported tool `{}` without points skipped", unknown.tool);
                self.warn(item, message);
                return;
            }
        };
        match line {
            Some(line) => {
                let _ = writeln!(out, "{indent}{line}");
            }
            None => self.warn(item, "item has no drawable content"),
        }
    }

    fn image(&mut self, item: &Item, image: &Image, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        if image.src.is_empty() {
            self.warn(item, "image without source skipped");
            return;
        }
        if image.src.starts_with("data:") && image.src.len() > self.config.large_image_warn_bytes {
            let kib = image.src.len() / 1024;
            self.warn(item, format!("large embedded image ({kib} KiB)"));
        }

        let element = render::image(image);
        let Some(mask) = image.mask.as_ref().filter(|m| !m.src.is_empty()) else {
            let _ = writeln!(out, "{indent}{element}");
            return;
        };

        let mask_id = mask
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("mask_{}", image.common.id));
        if self.mask_ids.insert(mask_id.clone()) {
            let mut def = String::new();
            let _ = writeln!(
                def,
                "    {}",
                Tag::new("mask")
                    .attr("id", &mask_id)
                    .attr("mask-type", mask.kind.as_deref().unwrap_or("luminance"))
                    .open()
            );
            let _ = writeln!(def, "      {}", render::mask_image(image, &mask.src));
            let _ = writeln!(def, "    </mask>");
            self.masks.push(def);
        }

        let _ = writeln!(
            out,
            "{indent}{}",
            Tag::new("g").attr("mask", format!("url(#{mask_id})")).open()
        );
        let _ = writeln!(out, "{indent}  {element}");
        let _ = writeln!(out, "{indent}</g>");
    }

    fn group(&mut self, item: &'a Item, group: &'a Group, depth: usize, out: &mut String) {
        let id = group.common.id.as_str();
        if group.children.is_empty() {
            debug!(id, "skipping empty group");
            return;
        }
        if !id.is_empty() && self.open_groups.contains(&id) {
            self.warn(item, "group contains itself; cycle broken");
            return;
        }

        let indent = "  ".repeat(depth);
        let center = annosvg_core::Rect::new(group.x, group.y, group.w, group.h).center();
        let tag = Tag::new("g")
            .attr("id", id)
            .attr_opt("opacity", group.common.opacity.filter(|o| *o < 1.0).map(opacity))
            .attr_opt("transform", render::rotation_attr(&group.common, center));
        let _ = writeln!(out, "{indent}{}", tag.open());

        self.open_groups.push(id);
        for child in &group.children {
            let child_item = match child {
                GroupChild::Inline(inner) => Some(inner.as_ref()),
                GroupChild::Ref(child_id) => {
                    let found = self.by_id.get(child_id.as_str()).copied();
                    if found.is_none() {
                        self.warn(item, format!("child `{child_id}` not found"));
                    }
                    found
                }
            };
            if let Some(child_item) = child_item.filter(|c| !c.is_deleted()) {
                self.item(child_item, depth + 1, out);
            }
        }
        self.open_groups.pop();

        let _ = writeln!(out, "{indent}</g>");
    }
}
